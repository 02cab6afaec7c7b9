use crate::sql::array::Array;
use crate::sql::datetime::Datetime;
use crate::sql::geometry::Geometry;
use crate::sql::number::Number;
use crate::sql::object::Object;
use crate::sql::strand::Strand;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};

/// A single SQL value.
///
/// Rows, cells, expression results and function arguments all carry this
/// type. Nested JSON appears as [`Object`] and [`Array`]; geometries are
/// opaque [`Geometry`] values.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(Number),
	Strand(Strand),
	Datetime(Datetime),
	Object(Object),
	Array(Array),
	Geometry(Geometry),
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Number(Number::Int(v))
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Number(Number::Int(v as i64))
	}
}

impl From<usize> for Value {
	fn from(v: usize) -> Self {
		Value::Number(Number::Int(v as i64))
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Number(Number::Float(v))
	}
}

impl From<Number> for Value {
	fn from(v: Number) -> Self {
		Value::Number(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Strand(v.into())
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Strand(v.into())
	}
}

impl From<Strand> for Value {
	fn from(v: Strand) -> Self {
		Value::Strand(v)
	}
}

impl From<Datetime> for Value {
	fn from(v: Datetime) -> Self {
		Value::Datetime(v)
	}
}

impl From<Object> for Value {
	fn from(v: Object) -> Self {
		Value::Object(v)
	}
}

impl From<Array> for Value {
	fn from(v: Array) -> Self {
		Value::Array(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Value::Array(v.into())
	}
}

impl From<Geometry> for Value {
	fn from(v: Geometry) -> Self {
		Value::Geometry(v)
	}
}

impl<T: Into<Value>> From<Option<T>> for Value {
	fn from(v: Option<T>) -> Self {
		match v {
			Some(v) => v.into(),
			None => Value::Null,
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(v: serde_json::Value) -> Self {
		match v {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => {
				if let Some(i) = n.as_i64() {
					Value::from(i)
				} else {
					Value::from(n.as_f64().unwrap_or_default())
				}
			}
			serde_json::Value::String(s) => Value::from(s),
			serde_json::Value::Array(a) => {
				Value::Array(a.into_iter().map(Value::from).collect())
			}
			serde_json::Value::Object(o) => {
				Value::Object(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
			}
		}
	}
}

impl From<Value> for serde_json::Value {
	fn from(v: Value) -> Self {
		match v {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(b),
			Value::Number(Number::Int(i)) => serde_json::Value::from(i),
			Value::Number(Number::Float(f)) => serde_json::Value::from(f),
			Value::Number(Number::Decimal(d)) => serde_json::Value::String(d.to_string()),
			Value::Strand(s) => serde_json::Value::String(s.0),
			Value::Datetime(d) => serde_json::Value::String(d.0),
			Value::Object(o) => serde_json::Value::Object(
				o.into_iter().map(|(k, v)| (k, serde_json::Value::from(v))).collect(),
			),
			Value::Array(a) => {
				serde_json::Value::Array(a.into_iter().map(serde_json::Value::from).collect())
			}
			Value::Geometry(g) => serde_json::Value::String(g.to_wkt()),
		}
	}
}

impl Value {
	/// Whether this value is null
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Whether this value counts as true in a WHERE or HAVING clause.
	/// Null is never truthy; empty strings, empty collections and zero
	/// are false.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => !n.is_zero(),
			Value::Strand(s) => !s.is_empty(),
			Value::Datetime(_) => true,
			Value::Object(o) => !o.is_empty(),
			Value::Array(a) => !a.is_empty(),
			Value::Geometry(_) => true,
		}
	}

	/// Whether this value is a number
	pub fn is_number(&self) -> bool {
		matches!(self, Value::Number(_))
	}

	/// The name of this value's type, used in error messages
	pub fn type_name(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Number(_) => "number",
			Value::Strand(_) => "string",
			Value::Datetime(_) => "datetime",
			Value::Object(_) => "object",
			Value::Array(_) => "array",
			Value::Geometry(_) => "geometry",
		}
	}

	/// The unquoted textual form: what string functions and cross-type
	/// comparisons see.
	pub fn to_raw_string(&self) -> String {
		match self {
			Value::Strand(s) => s.0.clone(),
			Value::Datetime(d) => d.0.clone(),
			other => other.to_string(),
		}
	}

	/// The canonical key fragment used for group keys, DISTINCT and IN-set
	/// membership. Values which compare equal render identically; strings
	/// stay distinguishable from the numbers and keywords they could spell.
	pub(crate) fn to_stable_key(&self) -> String {
		match self {
			Value::Null => "NULL".to_owned(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => n.to_stable_key(),
			Value::Strand(s) => s.to_string(),
			Value::Datetime(d) => d.to_string(),
			Value::Object(o) => o.to_string(),
			Value::Array(a) => a.to_string(),
			Value::Geometry(g) => g.to_wkt(),
		}
	}

	/// The default sort order: null below any non-null, numbers compared
	/// numerically, and every other pairing falling back to lexicographic
	/// ordering over the raw textual form. The cross-type fallback follows
	/// the observed behavior of text comparison and is therefore not a
	/// mathematically total order across mixed numeric and textual data.
	pub fn cmp_order(&self, other: &Value) -> Ordering {
		match (self, other) {
			(Value::Null, Value::Null) => Ordering::Equal,
			(Value::Null, _) => Ordering::Less,
			(_, Value::Null) => Ordering::Greater,
			(Value::Number(a), Value::Number(b)) => a.cmp(b),
			(a, b) => lexicmp::lexical_cmp(&a.to_raw_string(), &b.to_raw_string()),
		}
	}
}

impl Ord for Value {
	fn cmp(&self, other: &Self) -> Ordering {
		self.cmp_order(other)
	}
}

impl PartialOrd for Value {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Value::Null => f.write_str("NULL"),
			Value::Bool(b) => Display::fmt(b, f),
			Value::Number(n) => Display::fmt(n, f),
			Value::Strand(s) => Display::fmt(s, f),
			Value::Datetime(d) => Display::fmt(d, f),
			Value::Object(o) => Display::fmt(o, f),
			Value::Array(a) => Display::fmt(a, f),
			Value::Geometry(g) => Display::fmt(g, f),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn null_sorts_below_everything() {
		assert_eq!(Value::Null.cmp_order(&Value::from(0)), Ordering::Less);
		assert_eq!(Value::from("").cmp_order(&Value::Null), Ordering::Greater);
		assert_eq!(Value::Null.cmp_order(&Value::Null), Ordering::Equal);
	}

	#[test]
	fn numbers_compare_numerically_across_variants() {
		assert_eq!(Value::from(2).cmp_order(&Value::from(10.0)), Ordering::Less);
		assert_eq!(Value::from(1.0).cmp_order(&Value::from(1)), Ordering::Equal);
	}

	#[test]
	fn cross_type_comparison_falls_back_to_text() {
		// A number against a string compares textually
		assert_eq!(Value::from("abc").cmp_order(&Value::from("abd")), Ordering::Less);
		assert_eq!(
			Value::from("2020-01-01").cmp_order(&Value::from("2021-01-01")),
			Ordering::Less
		);
	}

	#[test]
	fn stable_keys_distinguish_types() {
		// The string 'NULL' and the null value render differently
		assert_ne!(Value::from("NULL").to_stable_key(), Value::Null.to_stable_key());
		// The string '1' and the number 1 render differently
		assert_ne!(Value::from("1").to_stable_key(), Value::from(1).to_stable_key());
		// Equal numbers of different variants render identically
		assert_eq!(Value::from(1).to_stable_key(), Value::from(1.0).to_stable_key());
	}

	#[test]
	fn truthiness() {
		assert!(!Value::Null.is_truthy());
		assert!(!Value::from(0).is_truthy());
		assert!(!Value::from("").is_truthy());
		assert!(Value::from("x").is_truthy());
		assert!(Value::from(3).is_truthy());
		assert!(!Value::Bool(false).is_truthy());
	}
}
