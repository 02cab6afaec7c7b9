use crate::err::Error;
use crate::sql::object::Object;
use crate::sql::value::Value;
use crate::tbl::cell::Cell;
use crate::tbl::row::{Row, Schema};
use crate::tbl::source::{DataSource, Scan, ScanOptions};
use crate::tbl::statistics::Statistics;
use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An in-memory table backed by plain rows of values.
///
/// The source applies no pushdown hints itself; the executor
/// reconstructs filtering and limiting above the scan. A requested
/// column the table does not carry appears as a null cell, per the
/// scan contract.
pub struct MemTable {
	columns: Vec<String>,
	rows: Arc<Vec<Vec<Value>>>,
	statistics: Option<Statistics>,
}

impl MemTable {
	pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> MemTable {
		debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
		MemTable {
			columns,
			rows: Arc::new(rows),
			statistics: None,
		}
	}

	/// Build a table from keyed objects. The column set is the union of
	/// every key; absent keys become nulls.
	pub fn from_objects(objects: Vec<Object>) -> MemTable {
		let names: BTreeSet<String> =
			objects.iter().flat_map(|o| o.keys().cloned()).collect();
		let columns: Vec<String> = names.into_iter().collect();
		let rows = objects
			.into_iter()
			.map(|mut o| {
				columns.iter().map(|c| o.remove(c).unwrap_or(Value::Null)).collect()
			})
			.collect();
		MemTable::new(columns, rows)
	}

	pub fn with_statistics(mut self, statistics: Statistics) -> MemTable {
		self.statistics = Some(statistics);
		self
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}
}

#[async_trait]
impl DataSource for MemTable {
	async fn scan(&self, options: ScanOptions) -> Result<Scan, Error> {
		// Requested columns the table does not carry surface as nulls
		let mut columns = self.columns.clone();
		if let Some(requested) = &options.hints.columns {
			for name in requested {
				if !columns.iter().any(|c| crate::sql::ident::same(c, name)) {
					columns.push(name.clone());
				}
			}
		}
		let schema = Schema::new(columns.clone());
		let width = self.columns.len();
		let rows = self.rows.clone();
		let ctx = options.ctx;
		let stream = stream::iter(0..rows.len())
			.map(move |i| {
				let cells = columns
					.iter()
					.enumerate()
					.map(|(c, _)| match c < width {
						true => Cell::resolved(rows[i][c].clone()),
						false => Cell::null(),
					})
					.collect();
				Ok(Row::new(schema.clone(), cells).numbered(i + 1))
			})
			.take_while(move |_| {
				let live = ctx.is_ok();
				async move { live }
			});
		Ok(Scan::raw(stream.boxed()))
	}

	fn statistics(&self) -> Option<Statistics> {
		self.statistics.clone().or_else(|| Some(Statistics::new(self.rows.len())))
	}
}
