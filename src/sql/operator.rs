use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Write};

/// Binary operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum BinaryOperator {
	Or,
	And,
	//
	Equal,           // =
	NotEqual,        // != or <>
	LessThan,        // <
	LessThanOrEqual, // <=
	MoreThan,        // >
	MoreThanOrEqual, // >=
	//
	Add, // +
	Sub, // -
	Mul, // *
	Div, // /
	Rem, // %
}

impl BinaryOperator {
	/// Whether this operator compares its operands
	pub fn is_comparison(&self) -> bool {
		matches!(
			self,
			Self::Equal
				| Self::NotEqual
				| Self::LessThan
				| Self::LessThanOrEqual
				| Self::MoreThan
				| Self::MoreThanOrEqual
		)
	}
}

impl Display for BinaryOperator {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Self::Or => f.write_str("OR"),
			Self::And => f.write_str("AND"),
			Self::Equal => f.write_char('='),
			Self::NotEqual => f.write_str("!="),
			Self::LessThan => f.write_char('<'),
			Self::LessThanOrEqual => f.write_str("<="),
			Self::MoreThan => f.write_char('>'),
			Self::MoreThanOrEqual => f.write_str(">="),
			Self::Add => f.write_char('+'),
			Self::Sub => f.write_char('-'),
			Self::Mul => f.write_char('*'),
			Self::Div => f.write_char('/'),
			Self::Rem => f.write_char('%'),
		}
	}
}

/// Unary operators.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum UnaryOperator {
	Neg, // -
	Not, // NOT
}

impl Display for UnaryOperator {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Self::Neg => f.write_char('-'),
			Self::Not => f.write_str("NOT"),
		}
	}
}
