//! Laziness, caching, cancellation and cost estimation: the engine
//! must never force a cell the query does not read, never scan before
//! the stream is polled, and produce identical results through the
//! memoizing source wrapper.

mod helpers;

use async_trait::async_trait;
use futures::StreamExt;
use helpers::*;
use quillsql::{
	cached, collect, estimate_cost, execute, Catalog, Cell, Error, ExecuteOptions, MemTable,
	Row, Scan, ScanOptions, Schema, Statistics, Value,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A two-column source which counts scans and per-cell evaluations.
struct Instrumented {
	scans: Arc<AtomicUsize>,
	cheap_evals: Arc<AtomicUsize>,
	expensive_evals: Arc<AtomicUsize>,
}

impl Instrumented {
	fn new() -> (Instrumented, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
		let scans = Arc::new(AtomicUsize::new(0));
		let cheap = Arc::new(AtomicUsize::new(0));
		let expensive = Arc::new(AtomicUsize::new(0));
		let source = Instrumented {
			scans: scans.clone(),
			cheap_evals: cheap.clone(),
			expensive_evals: expensive.clone(),
		};
		(source, scans, cheap, expensive)
	}
}

fn counting_cell(counter: &Arc<AtomicUsize>, value: Value) -> Cell {
	let counter = counter.clone();
	Cell::new(Box::new(move || {
		let counter = counter.clone();
		let value = value.clone();
		Box::pin(async move {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok(value)
		})
	}))
}

#[async_trait]
impl quillsql::DataSource for Instrumented {
	async fn scan(&self, _options: ScanOptions) -> Result<Scan, Error> {
		self.scans.fetch_add(1, Ordering::SeqCst);
		let schema = Schema::new(vec!["cheap".to_owned(), "expensive".to_owned()]);
		let cheap = self.cheap_evals.clone();
		let expensive = self.expensive_evals.clone();
		let rows = futures::stream::iter(0..3)
			.map(move |i| {
				let cells = vec![
					counting_cell(&cheap, Value::from(i as i64)),
					counting_cell(&expensive, Value::from(i as i64 * 100)),
				];
				Ok(Row::new(schema.clone(), cells).numbered(i + 1))
			})
			.boxed();
		Ok(Scan::raw(rows))
	}
}

#[test_log::test(tokio::test)]
async fn unreferenced_cells_are_never_forced() {
	let (source, _, cheap, expensive) = Instrumented::new();
	let catalog = Catalog::new().with("t", Arc::new(source));
	let rows = collect(
		execute("SELECT cheap FROM t WHERE cheap >= 0", ExecuteOptions::new(catalog)).unwrap(),
	)
	.await
	.unwrap();
	assert_eq!(rows.len(), 3);
	assert!(cheap.load(Ordering::SeqCst) >= 3);
	assert_eq!(expensive.load(Ordering::SeqCst), 0);
}

#[test_log::test(tokio::test)]
async fn cancelling_before_polling_means_zero_scans() {
	let (source, scans, _, _) = Instrumented::new();
	let catalog = Catalog::new().with("t", Arc::new(source));
	let ctx = quillsql::Context::background();
	let canceller = ctx.add_cancel();
	let mut stream = execute(
		"SELECT cheap FROM t",
		ExecuteOptions::new(catalog).with_context(ctx),
	)
	.unwrap();
	canceller.cancel();
	assert!(stream.next().await.is_none());
	assert_eq!(scans.load(Ordering::SeqCst), 0);
}

#[test_log::test(tokio::test)]
async fn cancellation_mid_stream_ends_cleanly() {
	let catalog = users();
	let ctx = quillsql::Context::background();
	let canceller = ctx.add_cancel();
	let mut stream = execute(
		"SELECT name FROM users",
		ExecuteOptions::new(catalog).with_context(ctx),
	)
	.unwrap();
	assert!(stream.next().await.is_some());
	canceller.cancel();
	// No error surfaces; the stream just stops
	assert!(stream.next().await.is_none());
}

#[test_log::test(tokio::test)]
async fn cached_sources_return_identical_results() {
	let queries = [
		"SELECT * FROM users",
		"SELECT name FROM users WHERE age > 26 ORDER BY name",
		"SELECT city, COUNT(*) AS c FROM users GROUP BY city ORDER BY c DESC",
		"SELECT DISTINCT city FROM users ORDER BY city",
		"SELECT name FROM users ORDER BY id LIMIT 2 OFFSET 1",
	];
	for sql in queries {
		let plain = run(&users(), sql).await.unwrap();
		let base: Arc<dyn quillsql::DataSource> = {
			let helpers_catalog = users();
			helpers_catalog.get("users").unwrap()
		};
		let cached_catalog = Catalog::new().with("users", cached(base));
		let through_cache = run(&cached_catalog, sql).await.unwrap();
		assert_eq!(as_json(&plain), as_json(&through_cache), "query: {sql}");
	}
}

#[test_log::test(tokio::test)]
async fn cached_sources_evaluate_each_cell_once() {
	let (source, _, cheap, _) = Instrumented::new();
	let wrapped = cached(Arc::new(source));
	let catalog = Catalog::new().with("t", wrapped);
	for _ in 0..3 {
		let rows = run(&catalog, "SELECT cheap FROM t").await.unwrap();
		assert_eq!(rows.len(), 3);
	}
	assert_eq!(cheap.load(Ordering::SeqCst), 3);
}

#[test_log::test(tokio::test)]
async fn cost_estimates_combine_rows_and_weights() {
	let table = MemTable::from_objects(objects(json!([
		{ "a": 1, "b": 10 }, { "a": 2, "b": 20 },
	])))
	.with_statistics(
		Statistics::new(2).with_column_weight("a", 1.0).with_column_weight("b", 5.0),
	);
	let catalog = Catalog::new().with("t", Arc::new(table));
	let options = ExecuteOptions::new(catalog);
	// Only column a is touched: 2 rows x weight 1
	let cost = estimate_cost("SELECT a FROM t", &options).unwrap().unwrap();
	assert_eq!(cost, 2.0);
	// Touching b raises the estimate: 2 rows x (1 + 5)
	let cost = estimate_cost("SELECT a, b FROM t", &options).unwrap().unwrap();
	assert_eq!(cost, 12.0);
	// A star projection counts every known column
	let cost = estimate_cost("SELECT * FROM t", &options).unwrap().unwrap();
	assert_eq!(cost, 12.0);
}

#[test_log::test(tokio::test)]
async fn cost_is_unknown_without_statistics() {
	let (source, _, _, _) = Instrumented::new();
	let catalog = Catalog::new().with("t", Arc::new(source));
	let options = ExecuteOptions::new(catalog);
	assert_eq!(estimate_cost("SELECT cheap FROM t", &options).unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn protocol_violations_are_rejected() {
	struct Lying;

	#[async_trait]
	impl quillsql::DataSource for Lying {
		async fn scan(&self, _options: ScanOptions) -> Result<Scan, Error> {
			let schema = Schema::new(vec!["a".to_owned()]);
			let rows = futures::stream::iter(vec![Ok(Row::new(
				schema,
				vec![Cell::resolved(Value::from(1))],
			))])
			.boxed();
			// Claims the window without claiming the predicate
			Ok(Scan {
				rows,
				applied_predicate: false,
				applied_limit_offset: true,
			})
		}
	}

	let catalog = Catalog::new().with("t", Arc::new(Lying));
	let err = run(&catalog, "SELECT a FROM t WHERE a > 0 LIMIT 1").await.unwrap_err();
	assert!(matches!(err, Error::DataSourceProtocol(_)), "{err}");
}
