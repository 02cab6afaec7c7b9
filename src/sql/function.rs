use crate::fnc;
use crate::sql::expression::Expr;
use crate::sql::fmt::Fmt;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A function call in an expression, covering both scalar functions and
/// aggregates. `DISTINCT` and `FILTER (WHERE ...)` are only accepted on
/// aggregate calls; the parser enforces this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct FunctionCall {
	/// The function name as written
	pub name: String,
	/// The arguments, `*` only for COUNT(*)
	pub args: Vec<FunctionArg>,
	/// COUNT(DISTINCT ...) / JSON_ARRAYAGG(DISTINCT ...)
	pub distinct: bool,
	/// FILTER (WHERE ...) on an aggregate
	pub filter: Option<Expr>,
}

/// A single function argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FunctionArg {
	/// The `*` in COUNT(*)
	Star,
	Expr(Expr),
}

impl FunctionCall {
	/// Whether this call refers to an aggregate function
	pub fn is_aggregate(&self) -> bool {
		fnc::is_aggregate(&self.name)
	}

	/// Whether this call is exactly COUNT(*)
	pub fn is_count_star(&self) -> bool {
		crate::sql::ident::same(&self.name, "count")
			&& matches!(self.args.as_slice(), [FunctionArg::Star])
	}

	/// The argument expressions, ignoring a `*`
	pub fn arg_exprs(&self) -> impl Iterator<Item = &Expr> {
		self.args.iter().filter_map(|a| match a {
			FunctionArg::Expr(e) => Some(e),
			FunctionArg::Star => None,
		})
	}
}

impl Display for FunctionArg {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			FunctionArg::Star => f.write_str("*"),
			FunctionArg::Expr(e) => Display::fmt(e, f),
		}
	}
}

impl Display for FunctionCall {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{}(", self.name)?;
		if self.distinct {
			f.write_str("DISTINCT ")?;
		}
		write!(f, "{})", Fmt::comma_separated(self.args.iter()))?;
		if let Some(filter) = &self.filter {
			write!(f, " FILTER (WHERE {filter})")?;
		}
		Ok(())
	}
}
