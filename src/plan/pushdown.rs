//! Computation of the pushdown hint envelope handed to table scans.

use crate::sql::expression::{self, Expr};
use crate::sql::field::Field;
use crate::sql::ident;
use crate::sql::statement::SelectStatement;

/// A column reference somewhere in the statement: its optional
/// qualifier and its name.
#[derive(Clone, Debug)]
pub(crate) struct ColumnRef {
	pub qualifier: Option<String>,
	pub name: String,
}

/// Collect every column referenced across the projection, join
/// conditions, filter, group-by, having and order-by clauses. Returns
/// `None` when a `*` projection makes the touched set unenumerable.
pub(crate) fn referenced_columns(statement: &SelectStatement) -> Option<Vec<ColumnRef>> {
	if statement.fields.iter().any(|f| matches!(f, Field::All)) {
		return None;
	}
	let mut refs = Vec::new();
	let mut push = |qualifier: Option<&str>, name: &str| {
		refs.push(ColumnRef {
			qualifier: qualifier.map(str::to_owned),
			name: name.to_owned(),
		});
	};
	for field in &statement.fields {
		if let Field::Single {
			expr,
			..
		} = field
		{
			expression::each_ident(expr, &mut push);
		}
	}
	for join in &statement.joins {
		if let Some(on) = &join.on {
			expression::each_ident(on, &mut push);
		}
	}
	if let Some(cond) = &statement.cond {
		expression::each_ident(cond, &mut push);
	}
	for group in &statement.group {
		expression::each_ident(group, &mut push);
	}
	if let Some(having) = &statement.having {
		expression::each_ident(having, &mut push);
	}
	for order in &statement.order {
		expression::each_ident(&order.expr, &mut push);
	}
	Some(refs)
}

/// The column hint for a single-table query: the deduplicated set of
/// referenced names. Qualified references keep only their column part;
/// the single source answers for every qualifier.
pub(crate) fn single_table_columns(statement: &SelectStatement) -> Option<Vec<String>> {
	let refs = referenced_columns(statement)?;
	Some(dedup_names(refs.into_iter().map(|r| r.name)))
}

/// The column hint for one side of a join. Only when every reference in
/// the statement is qualified can a side's touched columns be
/// enumerated; any unqualified reference suppresses the hint for every
/// side, since the engine must not claim an enumeration it cannot
/// guarantee.
pub(crate) fn join_side_columns(
	refs: &Option<Vec<ColumnRef>>,
	label: &str,
) -> Option<Vec<String>> {
	let refs = refs.as_ref()?;
	if refs.iter().any(|r| r.qualifier.is_none()) {
		return None;
	}
	Some(dedup_names(
		refs.iter()
			.filter(|r| r.qualifier.as_deref().is_some_and(|q| ident::same(q, label)))
			.map(|r| r.name.clone()),
	))
}

fn dedup_names(names: impl Iterator<Item = String>) -> Vec<String> {
	let mut seen = Vec::new();
	for name in names {
		if !seen.iter().any(|s: &String| ident::same(s, &name)) {
			seen.push(name);
		}
	}
	seen
}

/// Whether LIMIT and OFFSET may be pushed into the scan: nothing above
/// the scan may change which rows fall inside the window. Joins,
/// DISTINCT, grouping and HAVING change the cardinality; ORDER BY
/// changes which rows come first.
pub(crate) fn limit_offset_pushable(statement: &SelectStatement) -> bool {
	statement.joins.is_empty()
		&& !statement.distinct
		&& statement.group.is_empty()
		&& !statement.is_aggregate_query()
		&& statement.having.is_none()
		&& statement.order.is_empty()
}

/// Split an equi-join condition into per-side key expressions. Accepts
/// a conjunction of `a = b` terms whose sides are qualified column
/// references resolving to opposite sides of the join, reordering each
/// pair so the first key always belongs to the left input. Returns
/// `None` when any term falls outside that shape, which sends the join
/// to the nested-loop fallback.
pub(crate) fn split_equi_join(
	on: &Expr,
	left_labels: &[String],
	right_label: &str,
) -> Option<(Vec<Expr>, Vec<Expr>)> {
	let mut conjuncts = Vec::new();
	flatten_and(on, &mut conjuncts);
	let mut left_keys = Vec::with_capacity(conjuncts.len());
	let mut right_keys = Vec::with_capacity(conjuncts.len());
	for term in conjuncts {
		let Expr::Binary {
			l,
			o: crate::sql::operator::BinaryOperator::Equal,
			r,
		} = term
		else {
			return None;
		};
		let l_side = ident_side(l, left_labels, right_label)?;
		let r_side = ident_side(r, left_labels, right_label)?;
		match (l_side, r_side) {
			(Side::Left, Side::Right) => {
				left_keys.push((**l).clone());
				right_keys.push((**r).clone());
			}
			(Side::Right, Side::Left) => {
				left_keys.push((**r).clone());
				right_keys.push((**l).clone());
			}
			// Both keys on one side is not an equi-join over the pair
			_ => return None,
		}
	}
	Some((left_keys, right_keys))
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum Side {
	Left,
	Right,
}

fn ident_side(expr: &Expr, left_labels: &[String], right_label: &str) -> Option<Side> {
	let Expr::Ident {
		table: Some(qualifier),
		..
	} = expr
	else {
		// Unqualified keys would need schema knowledge to assign a side
		return None;
	};
	if ident::same(qualifier, right_label) {
		return Some(Side::Right);
	}
	if left_labels.iter().any(|l| ident::same(l, qualifier)) {
		return Some(Side::Left);
	}
	None
}

fn flatten_and<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
	match expr {
		Expr::Binary {
			l,
			o: crate::sql::operator::BinaryOperator::And,
			r,
		} => {
			flatten_and(l, out);
			flatten_and(r, out);
		}
		other => out.push(other),
	}
}
