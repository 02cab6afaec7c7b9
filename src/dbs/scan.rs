//! Table scans: hint handoff to the source, protocol validation, and
//! reconstruction of whatever hints the source declined.

use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::tbl::row::{Row, Schema};
use crate::tbl::source::{RowStream, ScanHints, ScanOptions};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct Scan {
	table: String,
	label: String,
	hints: ScanHints,
	state: State,
}

enum State {
	Init,
	Streaming(Streaming),
	Done,
}

struct Streaming {
	rows: RowStream,
	/// The predicate to re-apply when the source declined the hint
	filter: Option<Expr>,
	/// Filtered rows still to drop when the source declined the offset
	skip: usize,
	/// Rows still to emit when the source declined the limit
	remaining: Option<usize>,
	/// The ordinal for rows the source left unnumbered
	next_num: usize,
	qualify: QualifyCache,
}

impl Scan {
	pub(crate) fn new(table: String, label: String, hints: ScanHints) -> Scan {
		Scan {
			table,
			label,
			hints,
			state: State::Init,
		}
	}

	async fn start(
		table: String,
		label: String,
		hints: ScanHints,
		env: &QueryEnv,
	) -> Result<Streaming, Error> {
		let source = env
			.catalog
			.get(&table)
			.ok_or_else(|| Error::UnknownTable(table.clone()))?;
		let options = ScanOptions::new(env.ctx.clone(), hints.clone());
		let scan = source.scan(options).await?;
		debug!(
			table = %table,
			applied_predicate = scan.applied_predicate,
			applied_limit_offset = scan.applied_limit_offset,
			"scan started"
		);
		if scan.applied_limit_offset && !scan.applied_predicate && hints.predicate.is_some() {
			return Err(Error::DataSourceProtocol(format!(
				"source for table {} applied the limit without applying the predicate",
				table
			)));
		}
		let filter = if scan.applied_predicate {
			None
		} else {
			hints.predicate.clone()
		};
		let (skip, remaining) = if scan.applied_limit_offset {
			(0, None)
		} else {
			(hints.offset.unwrap_or(0), hints.limit)
		};
		// When the source applied the offset, numbering starts there
		let next_num = if scan.applied_limit_offset {
			hints.offset.unwrap_or(0)
		} else {
			0
		};
		Ok(Streaming {
			rows: scan.rows,
			filter,
			skip,
			remaining,
			next_num,
			qualify: QualifyCache::new(label),
		})
	}
}

#[async_trait]
impl Operator for Scan {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, State::Init) {
			match Scan::start(self.table.clone(), self.label.clone(), self.hints.clone(), env).await {
				Ok(streaming) => self.state = State::Streaming(streaming),
				Err(e) => {
					self.state = State::Done;
					return Err(e);
				}
			}
		}
		let State::Streaming(streaming) = &mut self.state else {
			return Ok(None);
		};
		loop {
			if env.ctx.is_done() {
				self.state = State::Done;
				return Ok(None);
			}
			if streaming.remaining == Some(0) {
				self.state = State::Done;
				return Ok(None);
			}
			let row = match streaming.rows.next().await {
				Some(Ok(row)) => row,
				Some(Err(e)) => {
					self.state = State::Done;
					return Err(e);
				}
				None => {
					self.state = State::Done;
					return Ok(None);
				}
			};
			streaming.next_num += 1;
			let row = match row.num() {
				Some(_) => row,
				None => row.numbered(streaming.next_num),
			};
			if let Some(filter) = &streaming.filter {
				let keep = match filter.compute(env, Some(&row)).await {
					Ok(value) => value.is_truthy(),
					Err(e) => {
						let e = row.decorate(e);
						self.state = State::Done;
						return Err(e);
					}
				};
				if env.ctx.is_done() {
					self.state = State::Done;
					return Ok(None);
				}
				if !keep {
					continue;
				}
			}
			if streaming.skip > 0 {
				streaming.skip -= 1;
				continue;
			}
			if let Some(remaining) = &mut streaming.remaining {
				*remaining -= 1;
			}
			return Ok(Some(streaming.qualify.apply(row)));
		}
	}
}

/// Adds `label.column` names alongside the bare columns of a stream, so
/// qualified references resolve against scan, derived-table and CTE
/// outputs. The rebuilt schema is cached per input schema identity.
pub(crate) struct QualifyCache {
	label: String,
	cached: Option<(usize, Arc<Schema>)>,
}

impl QualifyCache {
	pub(crate) fn new(label: String) -> QualifyCache {
		QualifyCache {
			label,
			cached: None,
		}
	}

	pub(crate) fn apply(&mut self, row: Row) -> Row {
		if self.label.is_empty() {
			return row;
		}
		let input = row.schema();
		let key = Arc::as_ptr(input) as usize;
		let schema = match &self.cached {
			Some((cached_key, schema)) if *cached_key == key => schema.clone(),
			_ => {
				let mut columns = input.columns().to_vec();
				let bare: Vec<usize> = input
					.columns()
					.iter()
					.enumerate()
					.filter(|(_, name)| !name.contains('.'))
					.map(|(i, _)| i)
					.collect();
				for &i in &bare {
					columns.push(format!("{}.{}", self.label, input.columns()[i]));
				}
				let schema = Schema::new(columns);
				self.cached = Some((key, schema.clone()));
				schema
			}
		};
		let mut cells = row.cells().to_vec();
		let extra: Vec<_> = row
			.columns()
			.iter()
			.zip(row.cells())
			.filter(|(name, _)| !name.contains('.'))
			.map(|(_, cell)| cell.clone())
			.collect();
		cells.extend(extra);
		let num = row.num();
		let out = Row::new(schema, cells);
		match num {
			Some(num) => out.numbered(num),
			None => out,
		}
	}
}

/// Wraps a derived table's subplan, qualifying its output under the
/// table alias.
pub(crate) struct Qualify {
	child: BoxOperator,
	cache: QualifyCache,
}

impl Qualify {
	pub(crate) fn new(child: BoxOperator, label: String) -> Qualify {
		Qualify {
			child,
			cache: QualifyCache::new(label),
		}
	}
}

#[async_trait]
impl Operator for Qualify {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		match self.child.next(env).await? {
			Some(row) => Ok(Some(self.cache.apply(row))),
			None => Ok(None),
		}
	}
}
