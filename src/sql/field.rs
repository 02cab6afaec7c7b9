use crate::sql::expression::{self, Expr};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A single projected field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Field {
	/// The `*` projection
	All,
	/// An expression with an optional alias
	Single {
		expr: Expr,
		alias: Option<String>,
	},
}

impl Field {
	/// The column name this field produces in the output row.
	pub fn output_name(&self) -> Option<String> {
		match self {
			Field::All => None,
			Field::Single {
				expr,
				alias,
			} => Some(match alias {
				Some(alias) => alias.clone(),
				None => expression::default_alias(expr),
			}),
		}
	}
}

impl Display for Field {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Field::All => f.write_str("*"),
			Field::Single {
				expr,
				alias,
			} => match alias {
				Some(alias) => write!(f, "{expr} AS {alias}"),
				None => Display::fmt(expr, f),
			},
		}
	}
}
