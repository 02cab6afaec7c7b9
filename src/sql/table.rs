use crate::sql::escape::escape_ident;
use crate::sql::statement::SelectStatement;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A table reference in FROM or JOIN position: a base table or CTE by
/// name, or a parenthesized derived table, which must carry an alias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum TableRef {
	Table {
		name: String,
		alias: Option<String>,
	},
	Derived {
		select: Box<SelectStatement>,
		alias: String,
	},
}

impl TableRef {
	/// The name this reference is known by in the rest of the query.
	pub fn label(&self) -> &str {
		match self {
			TableRef::Table {
				name,
				alias,
			} => alias.as_deref().unwrap_or(name),
			TableRef::Derived {
				alias,
				..
			} => alias,
		}
	}
}

impl Display for TableRef {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			TableRef::Table {
				name,
				alias,
			} => {
				f.write_str(&escape_ident(name))?;
				if let Some(alias) = alias {
					write!(f, " AS {}", escape_ident(alias))?;
				}
				Ok(())
			}
			TableRef::Derived {
				select,
				alias,
			} => {
				write!(f, "({select}) AS {}", escape_ident(alias))
			}
		}
	}
}
