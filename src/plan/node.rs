use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::sql::join::JoinKind;
use crate::sql::order::OrderItem;
use crate::sql::with::Cte;
use crate::tbl::source::ScanHints;
use std::fmt::Write;

/// A node of the physical plan. The planner builds the tree once per
/// query; the executor traverses it once per invocation. Ownership is
/// strictly downward, and CTE references resolve by name at execution
/// time rather than by pointer.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum PlanNode {
	/// Scan a catalog table, with the pushdown hint envelope the
	/// planner computed
	Scan {
		table: String,
		/// The name rows of this scan are qualified under
		label: String,
		hints: ScanHints,
	},
	/// Re-plan and re-execute a CTE definition
	CteRef {
		name: String,
		label: String,
	},
	/// A derived table planned once at its syntactic position
	Derived {
		input: Box<PlanNode>,
		label: String,
	},
	/// A single synthetic empty row, for queries without FROM
	SingleRow,
	/// Extends the CTE scope for the subtree of a statement with a WITH
	/// clause; references resolve by name at execution time
	WithScope {
		ctes: Vec<Cte>,
		input: Box<PlanNode>,
	},
	Filter {
		input: Box<PlanNode>,
		predicate: Expr,
	},
	Project {
		input: Box<PlanNode>,
		fields: Vec<Field>,
	},
	/// Grouped or single-group aggregation, including the HAVING filter
	Aggregate {
		input: Box<PlanNode>,
		fields: Vec<Field>,
		group: Vec<Expr>,
		having: Option<Expr>,
	},
	Sort {
		input: Box<PlanNode>,
		order: Vec<OrderItem>,
	},
	/// ORDER BY RANDOM()
	RandomShuffle {
		input: Box<PlanNode>,
	},
	Distinct {
		input: Box<PlanNode>,
	},
	LimitOffset {
		input: Box<PlanNode>,
		limit: Option<usize>,
		offset: Option<usize>,
	},
	/// Equi-join: build the right input into a hash table, stream the
	/// left input through it
	HashJoin {
		left: Box<PlanNode>,
		right: Box<PlanNode>,
		kind: JoinKind,
		left_keys: Vec<Expr>,
		right_keys: Vec<Expr>,
	},
	/// The fallback join: both inputs buffered, the ON condition
	/// evaluated over the Cartesian product
	NestedLoopJoin {
		left: Box<PlanNode>,
		right: Box<PlanNode>,
		kind: JoinKind,
		on: Expr,
	},
	/// Pair rows by ordinal, padding the shorter side with nulls
	PositionalJoin {
		left: Box<PlanNode>,
		right: Box<PlanNode>,
	},
}

impl PlanNode {
	/// Render an indented description of the plan tree.
	pub fn describe(&self) -> String {
		let mut out = String::new();
		self.describe_into(&mut out, 0);
		out
	}

	fn describe_into(&self, out: &mut String, depth: usize) {
		for _ in 0..depth {
			out.push_str("  ");
		}
		match self {
			PlanNode::Scan {
				table,
				hints,
				..
			} => {
				let _ = write!(out, "Scan {table}");
				if let Some(columns) = &hints.columns {
					let _ = write!(out, " columns=[{}]", columns.join(", "));
				}
				if let Some(predicate) = &hints.predicate {
					let _ = write!(out, " where={predicate}");
				}
				if let Some(limit) = hints.limit {
					let _ = write!(out, " limit={limit}");
				}
				if let Some(offset) = hints.offset {
					let _ = write!(out, " offset={offset}");
				}
				out.push('\n');
			}
			PlanNode::CteRef {
				name,
				..
			} => {
				let _ = writeln!(out, "CteRef {name}");
			}
			PlanNode::Derived {
				input,
				label,
			} => {
				let _ = writeln!(out, "Derived {label}");
				input.describe_into(out, depth + 1);
			}
			PlanNode::SingleRow => {
				out.push_str("SingleRow\n");
			}
			PlanNode::WithScope {
				ctes,
				input,
			} => {
				let names: Vec<&str> = ctes.iter().map(|c| c.name.as_str()).collect();
				let _ = writeln!(out, "WithScope [{}]", names.join(", "));
				input.describe_into(out, depth + 1);
			}
			PlanNode::Filter {
				input,
				predicate,
			} => {
				let _ = writeln!(out, "Filter {predicate}");
				input.describe_into(out, depth + 1);
			}
			PlanNode::Project {
				input,
				fields,
			} => {
				let names: Vec<String> = fields
					.iter()
					.map(|f| f.output_name().unwrap_or_else(|| "*".to_owned()))
					.collect();
				let _ = writeln!(out, "Project [{}]", names.join(", "));
				input.describe_into(out, depth + 1);
			}
			PlanNode::Aggregate {
				input,
				group,
				..
			} => {
				if group.is_empty() {
					out.push_str("Aggregate (single group)\n");
				} else {
					let keys: Vec<String> = group.iter().map(|g| g.to_string()).collect();
					let _ = writeln!(out, "Aggregate by [{}]", keys.join(", "));
				}
				input.describe_into(out, depth + 1);
			}
			PlanNode::Sort {
				input,
				order,
			} => {
				let terms: Vec<String> = order.iter().map(|o| o.to_string()).collect();
				let _ = writeln!(out, "Sort [{}]", terms.join(", "));
				input.describe_into(out, depth + 1);
			}
			PlanNode::RandomShuffle {
				input,
			} => {
				out.push_str("RandomShuffle\n");
				input.describe_into(out, depth + 1);
			}
			PlanNode::Distinct {
				input,
			} => {
				out.push_str("Distinct\n");
				input.describe_into(out, depth + 1);
			}
			PlanNode::LimitOffset {
				input,
				limit,
				offset,
			} => {
				let _ = writeln!(
					out,
					"LimitOffset limit={} offset={}",
					limit.map(|l| l.to_string()).unwrap_or_else(|| "none".to_owned()),
					offset.unwrap_or(0),
				);
				input.describe_into(out, depth + 1);
			}
			PlanNode::HashJoin {
				left,
				right,
				kind,
				left_keys,
				right_keys,
			} => {
				let pairs: Vec<String> = left_keys
					.iter()
					.zip(right_keys)
					.map(|(l, r)| format!("{l} = {r}"))
					.collect();
				let _ = writeln!(out, "HashJoin {kind} on {}", pairs.join(" AND "));
				left.describe_into(out, depth + 1);
				right.describe_into(out, depth + 1);
			}
			PlanNode::NestedLoopJoin {
				left,
				right,
				kind,
				on,
			} => {
				let _ = writeln!(out, "NestedLoopJoin {kind} on {on}");
				left.describe_into(out, depth + 1);
				right.describe_into(out, depth + 1);
			}
			PlanNode::PositionalJoin {
				left,
				right,
			} => {
				out.push_str("PositionalJoin\n");
				left.describe_into(out, depth + 1);
				right.describe_into(out, depth + 1);
			}
		}
	}
}
