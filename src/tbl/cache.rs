use crate::err::Error;
use crate::tbl::cell::Cell;
use crate::tbl::row::Row;
use crate::tbl::source::{DataSource, Scan, ScanHints, ScanOptions};
use crate::tbl::statistics::Statistics;
use ahash::HashMap;
use ahash::HashMapExt;
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::{Arc, Mutex};

/// A data source wrapper which memoizes cell results per
/// `(row index, column name)` across every scan of the wrapped source.
///
/// The first cell stored for a key wins and nothing is evicted; the
/// cache lives as long as the wrapper. So that row indices identify the
/// same underlying row on every scan, the wrapper withholds the
/// predicate and limit hints from the inner source and lets the
/// executor reconstruct them above the scan. The column hint passes
/// through, since a column subset does not renumber rows.
pub struct CachedSource {
	inner: Arc<dyn DataSource>,
	cells: Arc<Mutex<HashMap<(usize, String), Cell>>>,
}

impl CachedSource {
	pub fn new(inner: Arc<dyn DataSource>) -> CachedSource {
		CachedSource {
			inner,
			cells: Arc::new(Mutex::new(HashMap::new())),
		}
	}
}

#[async_trait]
impl DataSource for CachedSource {
	async fn scan(&self, options: ScanOptions) -> Result<Scan, Error> {
		let inner_options = ScanOptions::new(
			options.ctx,
			ScanHints {
				columns: options.hints.columns.clone(),
				..Default::default()
			},
		);
		let scan = self.inner.scan(inner_options).await?;
		if scan.applied_predicate || scan.applied_limit_offset {
			return Err(Error::DataSourceProtocol(
				"the wrapped source applied hints it was not given".to_owned(),
			));
		}
		let cells = self.cells.clone();
		let rows = scan
			.rows
			.enumerate()
			.map(move |(index, row)| {
				let row = row?;
				let mut memoized = Vec::with_capacity(row.cells().len());
				{
					let mut cells = cells.lock().expect("cell cache poisoned");
					for (c, name) in row.columns().iter().enumerate() {
						let cell = cells
							.entry((index, name.clone()))
							.or_insert_with(|| {
								row.cell_at(c)
									.expect("schema columns resolve against their own row")
									.clone()
							})
							.clone();
						memoized.push(cell);
					}
				}
				let num = row.num().unwrap_or(index + 1);
				Ok(Row::new(row.schema().clone(), memoized).numbered(num))
			})
			.boxed();
		Ok(Scan::raw(rows))
	}

	fn statistics(&self) -> Option<Statistics> {
		self.inner.statistics()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::value::Value;
	use crate::tbl::row::Schema;
	use futures::stream;
	use futures::TryStreamExt;
	use std::sync::atomic::{AtomicUsize, Ordering};

	/// A source whose cells count how often they are computed.
	struct Counting {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl DataSource for Counting {
		async fn scan(&self, _options: ScanOptions) -> Result<Scan, Error> {
			let schema = Schema::new(vec!["n".to_owned()]);
			let calls = self.calls.clone();
			let rows = stream::iter(0..3)
				.map(move |i| {
					let calls = calls.clone();
					let cell = Cell::new(Box::new(move || {
						let calls = calls.clone();
						Box::pin(async move {
							calls.fetch_add(1, Ordering::SeqCst);
							Ok(Value::from(i as i64))
						})
					}));
					Ok(Row::new(schema.clone(), vec![cell]).numbered(i + 1))
				})
				.boxed();
			Ok(Scan::raw(rows))
		}
	}

	#[tokio::test]
	async fn cells_compute_once_across_scans() {
		let calls = Arc::new(AtomicUsize::new(0));
		let cached = CachedSource::new(Arc::new(Counting {
			calls: calls.clone(),
		}));
		for _ in 0..2 {
			let scan = cached.scan(ScanOptions::default()).await.unwrap();
			let rows: Vec<Row> = scan.rows.try_collect().await.unwrap();
			for row in &rows {
				row.value("n").await.unwrap();
			}
		}
		// Three rows, one cell each, computed exactly once in total
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}
}
