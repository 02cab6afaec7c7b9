//! Worst-case cost estimation over table statistics.

use crate::dbs::env::QueryEnv;
use crate::plan::node::PlanNode;
use crate::plan::planner;

/// Estimate the worst-case cost of a plan: the number of rows each scan
/// may produce multiplied by the weight of the columns it touches, with
/// join inputs multiplied together. Returns `None` as soon as any
/// touched table lacks row-count statistics.
pub(crate) fn estimate(plan: &PlanNode, env: &QueryEnv) -> Option<f64> {
	match plan {
		PlanNode::Scan {
			table,
			hints,
			..
		} => {
			let source = env.catalog.get(table)?;
			let statistics = source.statistics()?;
			let rows = statistics.num_rows? as f64;
			let weight = match &hints.columns {
				Some(columns) => {
					columns.iter().map(|c| statistics.column_weight(c)).sum::<f64>().max(1.0)
				}
				// Without an enumerable column set, every known column
				// may be touched
				None => statistics
					.column_weights
					.values()
					.sum::<f64>()
					.max(1.0),
			};
			Some(rows * weight)
		}
		PlanNode::CteRef {
			name,
			..
		} => {
			let (statement, visible) = env.ctes.lookup(name)?;
			let sub_env = env.with_ctes(visible.clone());
			let sub_plan = planner::plan_statement(&statement, &visible).ok()?;
			estimate(&sub_plan, &sub_env)
		}
		PlanNode::SingleRow => Some(1.0),
		PlanNode::WithScope {
			ctes,
			input,
		} => {
			let env = env.with_ctes(env.ctes.extended(ctes));
			estimate(input, &env)
		}
		PlanNode::Derived {
			input,
			..
		}
		| PlanNode::Filter {
			input,
			..
		}
		| PlanNode::Project {
			input,
			..
		}
		| PlanNode::Aggregate {
			input,
			..
		}
		| PlanNode::Sort {
			input,
			..
		}
		| PlanNode::RandomShuffle {
			input,
		}
		| PlanNode::Distinct {
			input,
		}
		| PlanNode::LimitOffset {
			input,
			..
		} => estimate(input, env),
		PlanNode::HashJoin {
			left,
			right,
			..
		}
		| PlanNode::NestedLoopJoin {
			left,
			right,
			..
		}
		| PlanNode::PositionalJoin {
			left,
			right,
		} => {
			let left = estimate(left, env)?;
			let right = estimate(right, env)?;
			Some(left * right.max(1.0))
		}
	}
}
