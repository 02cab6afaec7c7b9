use crate::sql::expression::Expr;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A single ORDER BY term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct OrderItem {
	pub expr: Expr,
	/// ASC when true, DESC when false
	pub ascending: bool,
	/// An explicit NULLS FIRST / NULLS LAST override
	pub nulls: Option<NullsOrder>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum NullsOrder {
	First,
	Last,
}

impl OrderItem {
	/// Whether nulls sort before non-nulls for this term. The default
	/// places nulls lowest, so they come first ascending and last
	/// descending.
	pub fn nulls_first(&self) -> bool {
		match self.nulls {
			Some(NullsOrder::First) => true,
			Some(NullsOrder::Last) => false,
			None => self.ascending,
		}
	}
}

impl Display for OrderItem {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{}", self.expr)?;
		if !self.ascending {
			write!(f, " DESC")?;
		}
		match self.nulls {
			Some(NullsOrder::First) => write!(f, " NULLS FIRST"),
			Some(NullsOrder::Last) => write!(f, " NULLS LAST"),
			None => Ok(()),
		}
	}
}
