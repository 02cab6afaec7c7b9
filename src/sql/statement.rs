use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::sql::fmt::Fmt;
use crate::sql::join::Join;
use crate::sql::order::OrderItem;
use crate::sql::table::TableRef;
use crate::sql::with::Cte;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A parsed SELECT statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct SelectStatement {
	/// The ordered CTE definitions of a WITH clause
	pub with: Vec<Cte>,
	/// SELECT DISTINCT
	pub distinct: bool,
	/// The projection list
	pub fields: Vec<Field>,
	/// The FROM target; a query without FROM projects over a single
	/// empty row
	pub from: Option<TableRef>,
	/// The JOIN clauses in source order
	pub joins: Vec<Join>,
	/// The WHERE condition
	pub cond: Option<Expr>,
	/// The GROUP BY expressions
	pub group: Vec<Expr>,
	/// The HAVING condition
	pub having: Option<Expr>,
	/// The ORDER BY terms
	pub order: Vec<OrderItem>,
	pub limit: Option<usize>,
	pub offset: Option<usize>,
}

impl SelectStatement {
	/// Whether the projection contains any aggregate function call.
	pub fn has_aggregates(&self) -> bool {
		self.fields.iter().any(|field| match field {
			Field::Single {
				expr,
				..
			} => expr.contains_aggregate(),
			Field::All => false,
		})
	}

	/// Whether the query aggregates its input: either through GROUP BY
	/// or through an aggregate in the projection.
	pub fn is_aggregate_query(&self) -> bool {
		!self.group.is_empty() || self.has_aggregates()
	}
}

impl Display for SelectStatement {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		if !self.with.is_empty() {
			write!(f, "WITH {} ", Fmt::comma_separated(self.with.iter()))?;
		}
		f.write_str("SELECT ")?;
		if self.distinct {
			f.write_str("DISTINCT ")?;
		}
		write!(f, "{}", Fmt::comma_separated(self.fields.iter()))?;
		if let Some(from) = &self.from {
			write!(f, " FROM {from}")?;
		}
		for join in &self.joins {
			write!(f, " {join}")?;
		}
		if let Some(cond) = &self.cond {
			write!(f, " WHERE {cond}")?;
		}
		if !self.group.is_empty() {
			write!(f, " GROUP BY {}", Fmt::comma_separated(self.group.iter()))?;
		}
		if let Some(having) = &self.having {
			write!(f, " HAVING {having}")?;
		}
		if !self.order.is_empty() {
			write!(f, " ORDER BY {}", Fmt::comma_separated(self.order.iter()))?;
		}
		if let Some(limit) = self.limit {
			write!(f, " LIMIT {limit}")?;
		}
		if let Some(offset) = self.offset {
			write!(f, " OFFSET {offset}")?;
		}
		Ok(())
	}
}
