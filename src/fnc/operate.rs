//! Implementations of the binary and unary expression operators,
//! following SQL three-valued logic: null operands propagate and a null
//! comparison result excludes a row rather than erroring.

use crate::err::Error;
use crate::sql::datetime::{Datetime, IntervalUnit};
use crate::sql::kind::CastKind;
use crate::sql::number::Number;
use crate::sql::operator::BinaryOperator;
use crate::sql::value::Value;
use std::cmp::Ordering;

/// Apply a non-logical binary operator to two reduced operands. AND and
/// OR short-circuit in the evaluator and never reach this function.
pub(crate) fn binary(l: Value, o: BinaryOperator, r: Value) -> Result<Value, Error> {
	match o {
		BinaryOperator::Equal => equal(l, r),
		BinaryOperator::NotEqual => not(equal(l, r)?),
		BinaryOperator::LessThan => compare(l, r, Ordering::is_lt),
		BinaryOperator::LessThanOrEqual => compare(l, r, Ordering::is_le),
		BinaryOperator::MoreThan => compare(l, r, Ordering::is_gt),
		BinaryOperator::MoreThanOrEqual => compare(l, r, Ordering::is_ge),
		BinaryOperator::Add => add(l, r),
		BinaryOperator::Sub => arithmetic(l, r, "subtract", |a, b| a - b),
		BinaryOperator::Mul => arithmetic(l, r, "multiply", |a, b| a * b),
		BinaryOperator::Div => divide(l, r),
		BinaryOperator::Rem => remainder(l, r),
		BinaryOperator::And | BinaryOperator::Or => Err(Error::Internal(
			"logical operators are evaluated with short-circuiting".to_owned(),
		)),
	}
}

/// SQL equality: null propagates, numbers compare numerically across
/// numeric variants, and values of different types are simply not equal.
pub(crate) fn equal(l: Value, r: Value) -> Result<Value, Error> {
	if l.is_null() || r.is_null() {
		return Ok(Value::Null);
	}
	Ok(Value::Bool(l == r))
}

fn compare(l: Value, r: Value, f: impl FnOnce(Ordering) -> bool) -> Result<Value, Error> {
	if l.is_null() || r.is_null() {
		return Ok(Value::Null);
	}
	Ok(Value::Bool(f(l.cmp_order(&r))))
}

fn add(l: Value, r: Value) -> Result<Value, Error> {
	match (l, r) {
		(Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
		(Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
		// With a string operand, + concatenates
		(l @ Value::Strand(_), r) | (l, r @ Value::Strand(_)) => {
			Ok(Value::from(l.to_raw_string() + &r.to_raw_string()))
		}
		(l, r) => Err(unsupported_arithmetic("add", &l, &r)),
	}
}

fn arithmetic(
	l: Value,
	r: Value,
	verb: &str,
	f: impl FnOnce(Number, Number) -> Number,
) -> Result<Value, Error> {
	match (l, r) {
		(Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
		(Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(a, b))),
		(l, r) => Err(unsupported_arithmetic(verb, &l, &r)),
	}
}

fn divide(l: Value, r: Value) -> Result<Value, Error> {
	match (l, r) {
		(Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
		(Value::Number(_), Value::Number(b)) if b.is_zero() => Ok(Value::Null),
		(Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
		(l, r) => Err(unsupported_arithmetic("divide", &l, &r)),
	}
}

fn remainder(l: Value, r: Value) -> Result<Value, Error> {
	match (l, r) {
		(Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
		(Value::Number(_), Value::Number(b)) if b.is_zero() => Ok(Value::Null),
		(Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
		(l, r) => Err(unsupported_arithmetic("take the remainder of", &l, &r)),
	}
}

fn unsupported_arithmetic(verb: &str, l: &Value, r: &Value) -> Error {
	Error::Unsupported(format!("cannot {verb} {} and {}", l.type_name(), r.type_name()))
}

pub(crate) fn neg(v: Value) -> Result<Value, Error> {
	match v {
		Value::Null => Ok(Value::Null),
		Value::Number(n) => Ok(Value::Number(-n)),
		v => Err(Error::Unsupported(format!("cannot negate {}", v.type_name()))),
	}
}

pub(crate) fn not(v: Value) -> Result<Value, Error> {
	match v {
		Value::Null => Ok(Value::Null),
		v => Ok(Value::Bool(!v.is_truthy())),
	}
}

/// Translate a LIKE pattern into an anchored regex: `%` matches any run
/// of characters, `_` matches exactly one, everything else is literal.
pub(crate) fn like(text: &str, pattern: &str) -> Result<bool, Error> {
	let mut regex = String::with_capacity(pattern.len() + 8);
	regex.push_str("(?s)^");
	for c in pattern.chars() {
		match c {
			'%' => regex.push_str(".*"),
			'_' => regex.push('.'),
			c => regex.push_str(&regex::escape(&c.to_string())),
		}
	}
	regex.push('$');
	let compiled = regex::Regex::new(&regex).map_err(|e| Error::ArgumentValue {
		name: "LIKE".to_owned(),
		message: format!("invalid pattern: {e}"),
	})?;
	Ok(compiled.is_match(text))
}

/// CAST between the supported kinds; an incompatible source value fails
/// with a descriptive error naming the rendered value and the target.
pub(crate) fn cast(v: Value, kind: CastKind) -> Result<Value, Error> {
	if v.is_null() {
		return Ok(Value::Null);
	}
	let error = |v: &Value| Error::Cast {
		from: v.to_string(),
		into: kind.to_string(),
	};
	match kind {
		CastKind::Text => Ok(Value::from(v.to_raw_string())),
		CastKind::Integer => match &v {
			Value::Number(n) => Ok(Value::from(n.as_i64())),
			Value::Bool(b) => Ok(Value::from(i64::from(*b))),
			Value::Strand(s) => match s.trim().parse::<i64>() {
				Ok(i) => Ok(Value::from(i)),
				Err(_) => match s.trim().parse::<f64>() {
					Ok(f) if f.is_finite() => Ok(Value::from(f.trunc() as i64)),
					_ => Err(error(&v)),
				},
			},
			_ => Err(error(&v)),
		},
		CastKind::Float => match &v {
			Value::Number(n) => Ok(Value::from(n.as_f64())),
			Value::Bool(b) => Ok(Value::from(f64::from(u8::from(*b)))),
			Value::Strand(s) => match s.trim().parse::<f64>() {
				Ok(f) => Ok(Value::from(f)),
				Err(_) => Err(error(&v)),
			},
			_ => Err(error(&v)),
		},
		CastKind::Boolean => match &v {
			Value::Bool(b) => Ok(Value::Bool(*b)),
			Value::Number(n) => Ok(Value::Bool(!n.is_zero())),
			Value::Strand(s) => match crate::sql::ident::normal(s.trim()).as_str() {
				"true" => Ok(Value::Bool(true)),
				"false" => Ok(Value::Bool(false)),
				_ => Err(error(&v)),
			},
			_ => Err(error(&v)),
		},
	}
}

/// date ± INTERVAL n UNIT. The date operand may be a datetime value or a
/// string in a recognized ISO-8601 form; the result keeps the operand's
/// format.
pub(crate) fn date_arithmetic(
	date: Value,
	amount: Value,
	unit: IntervalUnit,
	o: BinaryOperator,
) -> Result<Value, Error> {
	let sign = match o {
		BinaryOperator::Add => 1,
		BinaryOperator::Sub => -1,
		_ => {
			return Err(Error::Unsupported(
				"an INTERVAL may only be added to or subtracted from a date".to_owned(),
			))
		}
	};
	if date.is_null() || amount.is_null() {
		return Ok(Value::Null);
	}
	let n = match &amount {
		Value::Number(n) if n.is_integer() => n.as_i64(),
		v => {
			return Err(Error::ArgumentValue {
				name: "INTERVAL".to_owned(),
				message: format!("interval amount must be an integer, got {v}"),
			})
		}
	};
	let datetime = match &date {
		Value::Datetime(d) => d.clone(),
		Value::Strand(s) => Datetime::parse(s).ok_or_else(|| Error::ArgumentValue {
			name: "INTERVAL".to_owned(),
			message: format!("cannot apply an interval to {date}"),
		})?,
		v => {
			return Err(Error::ArgumentValue {
				name: "INTERVAL".to_owned(),
				message: format!("cannot apply an interval to {}", v.type_name()),
			})
		}
	};
	let shifted = datetime.add_interval(sign * n, unit)?;
	// A string operand stays a string so projections keep their shape
	Ok(match date {
		Value::Strand(_) => Value::from(shifted.0),
		_ => Value::Datetime(shifted),
	})
}
