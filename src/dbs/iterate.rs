//! The operator driver: every plan node becomes a pull-based producer
//! of rows, driven one `next` call at a time. Suspension happens at
//! cell awaits and between yielded rows; cancellation is checked before
//! every yield, and a cancelled context ends a stream cleanly.

use crate::dbs::env::QueryEnv;
use crate::err::Error;
use crate::plan::node::PlanNode;
use crate::tbl::cell::Cell;
use crate::tbl::row::{Row, Schema};
use async_trait::async_trait;
use std::sync::Arc;

/// A single streaming operator.
#[async_trait]
pub(crate) trait Operator: Send {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error>;
}

pub(crate) type BoxOperator = Box<dyn Operator>;

/// Build the operator tree for a plan. Name resolution against the
/// catalog and the CTE scope happens lazily, on the first `next` call.
pub(crate) fn build(plan: &PlanNode) -> BoxOperator {
	match plan {
		PlanNode::Scan {
			table,
			label,
			hints,
		} => Box::new(crate::dbs::scan::Scan::new(table.clone(), label.clone(), hints.clone())),
		PlanNode::CteRef {
			name,
			label,
		} => Box::new(crate::dbs::subquery::CteRef::new(name.clone(), label.clone())),
		PlanNode::Derived {
			input,
			label,
		} => Box::new(crate::dbs::scan::Qualify::new(build(input), label.clone())),
		PlanNode::SingleRow => Box::new(SingleRow {
			done: false,
		}),
		PlanNode::WithScope {
			ctes,
			input,
		} => Box::new(crate::dbs::subquery::ScopeFrame::new(build(input), ctes.clone())),
		PlanNode::Filter {
			input,
			predicate,
		} => Box::new(crate::dbs::filter::Filter::new(build(input), predicate.clone())),
		PlanNode::Project {
			input,
			fields,
		} => Box::new(crate::dbs::project::Project::new(build(input), fields.clone())),
		PlanNode::Aggregate {
			input,
			fields,
			group,
			having,
		} => Box::new(crate::dbs::aggregate::Aggregate::new(
			build(input),
			fields.clone(),
			group.clone(),
			having.clone(),
		)),
		PlanNode::Sort {
			input,
			order,
		} => Box::new(crate::dbs::sort::Sort::new(build(input), order.clone())),
		PlanNode::RandomShuffle {
			input,
		} => Box::new(crate::dbs::sort::RandomShuffle::new(build(input))),
		PlanNode::Distinct {
			input,
		} => Box::new(crate::dbs::distinct::Distinct::new(build(input))),
		PlanNode::LimitOffset {
			input,
			limit,
			offset,
		} => Box::new(crate::dbs::limit::LimitOffset::new(build(input), *limit, *offset)),
		PlanNode::HashJoin {
			left,
			right,
			kind,
			left_keys,
			right_keys,
		} => Box::new(crate::dbs::join::HashJoin::new(
			build(left),
			build(right),
			*kind,
			left_keys.clone(),
			right_keys.clone(),
		)),
		PlanNode::NestedLoopJoin {
			left,
			right,
			kind,
			on,
		} => Box::new(crate::dbs::join::NestedLoopJoin::new(
			build(left),
			build(right),
			*kind,
			on.clone(),
		)),
		PlanNode::PositionalJoin {
			left,
			right,
		} => Box::new(crate::dbs::join::PositionalJoin::new(build(left), build(right))),
	}
}

/// The one synthetic empty row behind a query without FROM.
struct SingleRow {
	done: bool,
}

#[async_trait]
impl Operator for SingleRow {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if self.done || env.ctx.is_done() {
			return Ok(None);
		}
		self.done = true;
		Ok(Some(Row::new(Schema::new(Vec::new()), Vec::new()).numbered(1)))
	}
}

/// A schema-combination cache for join outputs, keyed by the input
/// schema identities so the combined schema is built once per stream.
#[derive(Default)]
pub(crate) struct MergeCache {
	cached: Option<(usize, usize, Arc<Schema>)>,
}

impl MergeCache {
	fn merged_schema(&mut self, left: &Arc<Schema>, right: &Arc<Schema>) -> Arc<Schema> {
		let key = (Arc::as_ptr(left) as usize, Arc::as_ptr(right) as usize);
		if let Some((l, r, schema)) = &self.cached {
			if (*l, *r) == key {
				return schema.clone();
			}
		}
		let mut columns = left.columns().to_vec();
		columns.extend_from_slice(right.columns());
		let schema = Schema::new(columns);
		self.cached = Some((key.0, key.1, schema.clone()));
		schema
	}

	/// Combine a matched pair of rows. The ordinal of the probe-side
	/// row decorates errors raised from the joined row.
	pub(crate) fn merge(&mut self, left: &Row, right: &Row) -> Row {
		let schema = self.merged_schema(left.schema(), right.schema());
		let mut cells = left.cells().to_vec();
		cells.extend_from_slice(right.cells());
		let row = Row::new(schema, cells);
		match left.num() {
			Some(num) => row.numbered(num),
			None => row,
		}
	}

	/// Combine a row with a null padding for the other side.
	pub(crate) fn merge_padded(
		&mut self,
		left: Option<&Row>,
		right: Option<&Row>,
		left_schema: Option<&Arc<Schema>>,
		right_schema: Option<&Arc<Schema>>,
	) -> Row {
		let empty = Schema::new(Vec::new());
		let left_schema = left.map(Row::schema).or(left_schema).unwrap_or(&empty).clone();
		let right_schema = right.map(Row::schema).or(right_schema).unwrap_or(&empty).clone();
		let schema = self.merged_schema(&left_schema, &right_schema);
		let mut cells = match left {
			Some(row) => row.cells().to_vec(),
			None => vec![Cell::null(); left_schema.len()],
		};
		match right {
			Some(row) => cells.extend_from_slice(row.cells()),
			None => cells.extend(std::iter::repeat_with(Cell::null).take(right_schema.len())),
		}
		let row = Row::new(schema, cells);
		match left.or(right).and_then(Row::num) {
			Some(num) => row.numbered(num),
			None => row,
		}
	}
}
