use crate::err::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// The target types accepted by CAST.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum CastKind {
	/// TEXT or VARCHAR
	Text,
	/// INTEGER, INT or BIGINT
	Integer,
	/// FLOAT, REAL or DOUBLE
	Float,
	/// BOOLEAN
	Boolean,
}

impl CastKind {
	/// Resolve a type name as written in a CAST target.
	pub fn from_name(name: &str) -> Result<CastKind, Error> {
		match crate::sql::ident::normal(name).as_str() {
			"text" | "varchar" => Ok(Self::Text),
			"integer" | "int" | "bigint" => Ok(Self::Integer),
			"float" | "real" | "double" => Ok(Self::Float),
			"boolean" => Ok(Self::Boolean),
			_ => Err(Error::Cast {
				from: "value".to_owned(),
				into: name.to_owned(),
			}),
		}
	}
}

impl Display for CastKind {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Self::Text => f.write_str("TEXT"),
			Self::Integer => f.write_str("INTEGER"),
			Self::Float => f.write_str("FLOAT"),
			Self::Boolean => f.write_str("BOOLEAN"),
		}
	}
}
