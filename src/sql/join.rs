use crate::sql::expression::Expr;
use crate::sql::table::TableRef;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A join clause in the FROM list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Join {
	pub kind: JoinKind,
	pub table: TableRef,
	/// The ON condition; absent only for POSITIONAL joins
	pub on: Option<Expr>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum JoinKind {
	Inner,
	Left,
	Right,
	Full,
	/// Pairs rows by ordinal, padding the shorter side with nulls
	Positional,
}

impl Display for JoinKind {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Self::Inner => f.write_str("INNER JOIN"),
			Self::Left => f.write_str("LEFT JOIN"),
			Self::Right => f.write_str("RIGHT JOIN"),
			Self::Full => f.write_str("FULL JOIN"),
			Self::Positional => f.write_str("POSITIONAL JOIN"),
		}
	}
}

impl Display for Join {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{} {}", self.kind, self.table)?;
		if let Some(on) = &self.on {
			write!(f, " ON {on}")?;
		}
		Ok(())
	}
}
