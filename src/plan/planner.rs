//! Lowering of the AST into the physical plan.

use crate::dbs::env::CteScope;
use crate::err::Error;
use crate::plan::node::PlanNode;
use crate::plan::pushdown;
use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::sql::ident;
use crate::sql::join::JoinKind;
use crate::sql::order::OrderItem;
use crate::sql::statement::SelectStatement;
use crate::sql::table::TableRef;
use crate::tbl::source::ScanHints;
use tracing::debug;

/// Lower a statement into its physical plan. `scope` carries the CTEs
/// visible from enclosing statements; the statement's own WITH clause
/// extends it.
pub(crate) fn plan_statement(
	statement: &SelectStatement,
	scope: &CteScope,
) -> Result<PlanNode, Error> {
	validate(statement)?;
	let scope = scope.extended(&statement.with);
	let aggregate_query = statement.is_aggregate_query();
	let single_table = statement.joins.is_empty();

	// The FROM tree: the base table and its joins, leaves first
	let refs = pushdown::referenced_columns(statement);
	let (mut node, mut labels) = match &statement.from {
		None => (PlanNode::SingleRow, Vec::new()),
		Some(table) => {
			let (node, label) = lower_table_ref(table, statement, single_table, &refs, &scope)?;
			(node, vec![label])
		}
	};
	let mut predicate_in_scan = false;
	if single_table {
		if let (PlanNode::Scan {
			hints,
			..
		}, Some(cond)) = (&mut node, &statement.cond)
		{
			// A single-table predicate always travels to the source; the
			// scan re-applies it when the source declines
			hints.predicate = Some(cond.clone());
			predicate_in_scan = true;
		}
	}
	for join in &statement.joins {
		let (right, right_label) =
			lower_table_ref(&join.table, statement, false, &refs, &scope)?;
		node = lower_join(node, &labels, right, &right_label, join.kind, join.on.as_ref())?;
		labels.push(right_label);
	}

	// WHERE, unless the scan hint envelope already carries it
	if let Some(cond) = &statement.cond {
		if cond.contains_aggregate() {
			return Err(Error::Unsupported(
				"aggregate functions are not allowed in WHERE".to_owned(),
			));
		}
		if !predicate_in_scan {
			node = PlanNode::Filter {
				input: Box::new(node),
				predicate: cond.clone(),
			};
		}
	}

	// Grouping and projection
	if aggregate_query {
		node = PlanNode::Aggregate {
			input: Box::new(node),
			fields: statement.fields.clone(),
			group: statement.group.clone(),
			having: statement.having.clone(),
		};
		node = lower_order(node, &statement.order, &statement.fields, true)?;
	} else {
		node = lower_order(node, &statement.order, &statement.fields, false)?;
		node = PlanNode::Project {
			input: Box::new(node),
			fields: statement.fields.clone(),
		};
	}
	if statement.distinct {
		node = PlanNode::Distinct {
			input: Box::new(node),
		};
	}

	// LIMIT and OFFSET, unless they were pushed into the scan
	let pushed_limit = matches!(
		&node,
		PlanNode::Project { input, .. }
			if matches!(&**input, PlanNode::Scan { hints, .. }
				if hints.limit.is_some() || hints.offset.is_some())
	);
	if (statement.limit.is_some() || statement.offset.is_some()) && !pushed_limit {
		node = PlanNode::LimitOffset {
			input: Box::new(node),
			limit: statement.limit,
			offset: statement.offset,
		};
	}

	// A WITH clause extends the CTE scope for the whole subtree at
	// execution time, mirroring the scope used while planning
	if !statement.with.is_empty() {
		node = PlanNode::WithScope {
			ctes: statement.with.clone(),
			input: Box::new(node),
		};
	}
	debug!(plan = %node.describe(), "planned statement");
	Ok(node)
}

fn validate(statement: &SelectStatement) -> Result<(), Error> {
	if statement.is_aggregate_query() && statement.fields.iter().any(|f| matches!(f, Field::All))
	{
		return Err(Error::Unsupported(
			"cannot mix * with GROUP BY or aggregate functions".to_owned(),
		));
	}
	for group in &statement.group {
		if group.contains_aggregate() {
			return Err(Error::Unsupported(
				"aggregate functions are not allowed in GROUP BY".to_owned(),
			));
		}
	}
	if statement.having.is_some() && !statement.is_aggregate_query() {
		return Err(Error::Unsupported(
			"HAVING requires GROUP BY or an aggregate in the projection".to_owned(),
		));
	}
	if !statement.is_aggregate_query() {
		for order in &statement.order {
			if order.expr.contains_aggregate() {
				return Err(Error::Unsupported(
					"aggregate functions in ORDER BY require an aggregate query".to_owned(),
				));
			}
		}
	}
	Ok(())
}

fn lower_table_ref(
	table: &TableRef,
	statement: &SelectStatement,
	single_table: bool,
	refs: &Option<Vec<pushdown::ColumnRef>>,
	scope: &CteScope,
) -> Result<(PlanNode, String), Error> {
	match table {
		TableRef::Derived {
			select,
			alias,
		} => {
			let input = plan_statement(select, scope)?;
			Ok((
				PlanNode::Derived {
					input: Box::new(input),
					label: alias.clone(),
				},
				alias.clone(),
			))
		}
		TableRef::Table {
			name,
			alias,
		} => {
			let label = alias.clone().unwrap_or_else(|| name.clone());
			if scope.contains(name) {
				return Ok((
					PlanNode::CteRef {
						name: name.clone(),
						label: label.clone(),
					},
					label,
				));
			}
			let columns = if single_table {
				pushdown::single_table_columns(statement)
			} else {
				pushdown::join_side_columns(refs, &label)
			};
			let mut hints = ScanHints {
				columns,
				..Default::default()
			};
			if single_table && pushdown::limit_offset_pushable(statement) {
				hints.limit = statement.limit;
				hints.offset = statement.offset;
			}
			Ok((
				PlanNode::Scan {
					table: name.clone(),
					label: label.clone(),
					hints,
				},
				label,
			))
		}
	}
}

fn lower_join(
	left: PlanNode,
	left_labels: &[String],
	right: PlanNode,
	right_label: &str,
	kind: JoinKind,
	on: Option<&Expr>,
) -> Result<PlanNode, Error> {
	match kind {
		JoinKind::Positional => Ok(PlanNode::PositionalJoin {
			left: Box::new(left),
			right: Box::new(right),
		}),
		kind => {
			let on = on.ok_or_else(|| {
				Error::Internal(format!("{kind} reached the planner without an ON condition"))
			})?;
			if let Some((left_keys, right_keys)) =
				pushdown::split_equi_join(on, left_labels, right_label)
			{
				Ok(PlanNode::HashJoin {
					left: Box::new(left),
					right: Box::new(right),
					kind,
					left_keys,
					right_keys,
				})
			} else {
				Ok(PlanNode::NestedLoopJoin {
					left: Box::new(left),
					right: Box::new(right),
					kind,
					on: on.clone(),
				})
			}
		}
	}
}

/// Lower ORDER BY. For non-aggregate queries the sort runs below the
/// projection, so order terms naming an output column substitute that
/// column's expression. Aggregate queries sort above the aggregation,
/// where output columns are real columns; an order term spelling out a
/// projected aggregate expression is rewritten to reference its output
/// column instead.
fn lower_order(
	input: PlanNode,
	order: &[OrderItem],
	fields: &[Field],
	above_aggregate: bool,
) -> Result<PlanNode, Error> {
	if order.is_empty() {
		return Ok(input);
	}
	if let [only] = order {
		if is_random_call(&only.expr) {
			return Ok(PlanNode::RandomShuffle {
				input: Box::new(input),
			});
		}
	}
	let order: Vec<OrderItem> = order
		.iter()
		.map(|item| {
			let expr = if above_aggregate {
				substitute_output_column(&item.expr, fields)
			} else {
				substitute_alias(&item.expr, fields)
			};
			OrderItem {
				expr,
				ascending: item.ascending,
				nulls: item.nulls,
			}
		})
		.collect();
	Ok(PlanNode::Sort {
		input: Box::new(input),
		order,
	})
}

/// Above an aggregation, an order term repeating a projected expression
/// stands for that expression's output column.
fn substitute_output_column(expr: &Expr, fields: &[Field]) -> Expr {
	for field in fields {
		if let Field::Single {
			expr: field_expr,
			..
		} = field
		{
			if field_expr == expr {
				if let Some(output) = field.output_name() {
					return Expr::Ident {
						table: None,
						name: output,
					};
				}
			}
		}
	}
	expr.clone()
}

fn is_random_call(expr: &Expr) -> bool {
	match expr {
		Expr::Function(call) => {
			call.args.is_empty()
				&& (ident::same(&call.name, "random") || ident::same(&call.name, "rand"))
		}
		_ => false,
	}
}

/// Replace an order term naming an output column with the projected
/// expression it stands for.
fn substitute_alias(expr: &Expr, fields: &[Field]) -> Expr {
	let Expr::Ident {
		table: None,
		name,
	} = expr
	else {
		return expr.clone();
	};
	for field in fields {
		if let Field::Single {
			expr: field_expr,
			..
		} = field
		{
			if field.output_name().is_some_and(|output| ident::same(&output, name)) {
				return field_expr.clone();
			}
		}
	}
	expr.clone()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::syn;

	fn plan(sql: &str) -> PlanNode {
		plan_statement(&syn::parse(sql).unwrap(), &CteScope::default()).unwrap()
	}

	#[test]
	fn single_table_pushdown_envelope() {
		let node = plan("SELECT name FROM users WHERE age > 25 LIMIT 2 OFFSET 1");
		let PlanNode::Project {
			input,
			..
		} = node
		else {
			panic!("expected a projection at the top");
		};
		let PlanNode::Scan {
			hints,
			..
		} = *input
		else {
			panic!("expected the scan directly under the projection");
		};
		let mut columns = hints.columns.unwrap();
		columns.sort();
		assert_eq!(columns, vec!["age", "name"]);
		assert!(hints.predicate.is_some());
		assert_eq!(hints.limit, Some(2));
		assert_eq!(hints.offset, Some(1));
	}

	#[test]
	fn order_by_blocks_limit_pushdown() {
		let node = plan("SELECT name FROM users ORDER BY name LIMIT 2");
		let PlanNode::LimitOffset {
			input,
			limit,
			..
		} = node
		else {
			panic!("expected an explicit limit node");
		};
		assert_eq!(limit, Some(2));
		assert!(matches!(*input, PlanNode::Project { .. }));
	}

	#[test]
	fn equi_joins_lower_to_hash_joins() {
		let node = plan("SELECT u.name, o.total FROM u JOIN o ON u.id = o.uid");
		let PlanNode::Project {
			input,
			..
		} = node
		else {
			panic!("expected a projection");
		};
		assert!(matches!(*input, PlanNode::HashJoin { .. }));
	}

	#[test]
	fn non_equi_joins_fall_back_to_nested_loops() {
		let node = plan("SELECT * FROM u JOIN o ON u.id < o.uid");
		let PlanNode::Project {
			input,
			..
		} = node
		else {
			panic!("expected a projection");
		};
		assert!(matches!(*input, PlanNode::NestedLoopJoin { .. }));
	}

	#[test]
	fn ctes_resolve_before_tables() {
		let node = plan("WITH users AS (SELECT * FROM raw) SELECT * FROM Users");
		let PlanNode::WithScope {
			input,
			..
		} = node
		else {
			panic!("expected the scope frame at the top");
		};
		let PlanNode::Project {
			input,
			..
		} = *input
		else {
			panic!("expected a projection");
		};
		assert!(matches!(*input, PlanNode::CteRef { ref name, .. } if name == "Users"));
	}

	#[test]
	fn aggregates_plan_an_aggregate_node() {
		let node = plan("SELECT city, COUNT(*) AS c FROM u GROUP BY city ORDER BY c DESC");
		let PlanNode::Sort {
			input,
			..
		} = node
		else {
			panic!("expected the sort above the aggregation");
		};
		assert!(matches!(*input, PlanNode::Aggregate { .. }));
	}

	#[test]
	fn random_order_plans_a_shuffle() {
		let node = plan("SELECT a FROM t ORDER BY RANDOM()");
		let PlanNode::Project {
			input,
			..
		} = node
		else {
			panic!("expected a projection");
		};
		assert!(matches!(*input, PlanNode::RandomShuffle { .. }));
	}

	#[test]
	fn star_with_aggregates_is_rejected() {
		let statement = syn::parse("SELECT *, COUNT(*) FROM t").unwrap();
		assert!(matches!(
			plan_statement(&statement, &CteScope::default()),
			Err(Error::Unsupported(_))
		));
	}

	#[test]
	fn aggregates_in_where_are_rejected() {
		let statement = syn::parse("SELECT a FROM t WHERE COUNT(*) > 1").unwrap();
		assert!(matches!(
			plan_statement(&statement, &CteScope::default()),
			Err(Error::Unsupported(_))
		));
	}

	#[test]
	fn having_requires_aggregation() {
		let statement = syn::parse("SELECT a FROM t HAVING a > 1").unwrap();
		assert!(matches!(
			plan_statement(&statement, &CteScope::default()),
			Err(Error::Unsupported(_))
		));
	}
}
