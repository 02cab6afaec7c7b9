use crate::sql::escape::escape_ident;
use crate::sql::statement::SelectStatement;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A single common table expression in a WITH clause.
///
/// A CTE may reference only CTEs which appear before it in the same
/// clause: no self-reference and no mutual recursion. Names resolve
/// case-insensitively and shadow table names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Cte {
	pub name: String,
	pub select: SelectStatement,
}

impl Display for Cte {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		write!(f, "{} AS ({})", escape_ident(&self.name), self.select)
	}
}
