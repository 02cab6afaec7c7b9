use crate::err::Error;
use crate::sql::number::Number;
use crate::sql::value::Value;

/// Numeric arguments: null propagates, anything else must be a number.
fn number(name: &str, v: &Value) -> Result<Option<f64>, Error> {
	match v {
		Value::Null => Ok(None),
		Value::Number(n) => Ok(Some(n.as_f64())),
		v => Err(Error::ArgumentValue {
			name: name.to_owned(),
			message: format!("expected a number, got {}", v.type_name()),
		}),
	}
}

macro_rules! unary_float {
	($fn_name:ident, $name:literal, $op:expr) => {
		pub fn $fn_name((v,): (Value,)) -> Result<Value, Error> {
			match number($name, &v)? {
				None => Ok(Value::Null),
				Some(f) => {
					let op: fn(f64) -> f64 = $op;
					Ok(Value::from(op(f)))
				}
			}
		}
	};
}

pub fn floor((v,): (Value,)) -> Result<Value, Error> {
	match &v {
		Value::Null => Ok(Value::Null),
		Value::Number(Number::Int(i)) => Ok(Value::from(*i)),
		Value::Number(n) => Ok(Value::from(n.as_f64().floor() as i64)),
		_ => Err(not_a_number("FLOOR", &v)),
	}
}

pub fn ceil((v,): (Value,)) -> Result<Value, Error> {
	match &v {
		Value::Null => Ok(Value::Null),
		Value::Number(Number::Int(i)) => Ok(Value::from(*i)),
		Value::Number(n) => Ok(Value::from(n.as_f64().ceil() as i64)),
		_ => Err(not_a_number("CEIL", &v)),
	}
}

/// ROUND(x) or ROUND(x, digits), rounding half away from zero.
pub fn round((v, digits): (Value, Option<Value>)) -> Result<Value, Error> {
	let Some(f) = number("ROUND", &v)? else {
		return Ok(Value::Null);
	};
	let digits = match digits {
		None => 0,
		Some(Value::Null) => return Ok(Value::Null),
		Some(Value::Number(n)) if n.is_integer() => n.as_i64(),
		Some(v) => return Err(not_a_number("ROUND", &v)),
	};
	if digits == 0 {
		return Ok(Value::from(f.round() as i64));
	}
	let factor = 10f64.powi(digits.clamp(-15, 15) as i32);
	Ok(Value::from((f * factor).round() / factor))
}

pub fn abs((v,): (Value,)) -> Result<Value, Error> {
	match &v {
		Value::Null => Ok(Value::Null),
		Value::Number(Number::Int(i)) => Ok(Value::from(i.saturating_abs())),
		Value::Number(n) => Ok(Value::from(n.as_f64().abs())),
		_ => Err(not_a_number("ABS", &v)),
	}
}

pub fn sign((v,): (Value,)) -> Result<Value, Error> {
	match number("SIGN", &v)? {
		None => Ok(Value::Null),
		Some(f) if f > 0.0 => Ok(Value::from(1)),
		Some(f) if f < 0.0 => Ok(Value::from(-1)),
		Some(_) => Ok(Value::from(0)),
	}
}

/// MOD(a, b); a zero divisor yields null like the % operator.
pub fn modulo((a, b): (Value, Value)) -> Result<Value, Error> {
	match (number("MOD", &a)?, number("MOD", &b)?) {
		(Some(_), Some(b)) if b == 0.0 => Ok(Value::Null),
		(Some(a), Some(b)) => Ok(Value::from(a % b)),
		_ => Ok(Value::Null),
	}
}

unary_float!(exp, "EXP", f64::exp);
unary_float!(ln, "LN", f64::ln);
unary_float!(log10, "LOG10", f64::log10);
unary_float!(sqrt, "SQRT", f64::sqrt);
unary_float!(sin, "SIN", f64::sin);
unary_float!(cos, "COS", f64::cos);
unary_float!(tan, "TAN", f64::tan);
unary_float!(asin, "ASIN", f64::asin);
unary_float!(acos, "ACOS", f64::acos);
unary_float!(degrees, "DEGREES", f64::to_degrees);
unary_float!(radians, "RADIANS", f64::to_radians);

pub fn cot((v,): (Value,)) -> Result<Value, Error> {
	match number("COT", &v)? {
		None => Ok(Value::Null),
		Some(f) => Ok(Value::from(1.0 / f.tan())),
	}
}

pub fn power((a, b): (Value, Value)) -> Result<Value, Error> {
	match (number("POWER", &a)?, number("POWER", &b)?) {
		(Some(a), Some(b)) => Ok(Value::from(a.powf(b))),
		_ => Ok(Value::Null),
	}
}

/// ATAN(x) or ATAN(y, x), the latter behaving like ATAN2.
pub fn atan((a, b): (Value, Option<Value>)) -> Result<Value, Error> {
	match b {
		None => match number("ATAN", &a)? {
			None => Ok(Value::Null),
			Some(f) => Ok(Value::from(f.atan())),
		},
		Some(b) => atan2((a, b)),
	}
}

pub fn atan2((y, x): (Value, Value)) -> Result<Value, Error> {
	match (number("ATAN2", &y)?, number("ATAN2", &x)?) {
		(Some(y), Some(x)) => Ok(Value::from(y.atan2(x))),
		_ => Ok(Value::Null),
	}
}

pub fn pi(_: ()) -> Result<Value, Error> {
	Ok(Value::from(std::f64::consts::PI))
}

fn not_a_number(name: &str, v: &Value) -> Error {
	Error::ArgumentValue {
		name: name.to_owned(),
		message: format!("expected a number, got {}", v.type_name()),
	}
}
