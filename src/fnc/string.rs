use crate::err::Error;
use crate::sql::value::Value;
use regex::Regex;

/// Null string arguments propagate to a null result across this module.
macro_rules! text_or_null {
	($v:expr) => {
		match $v {
			Value::Null => return Ok(Value::Null),
			v => v.to_raw_string(),
		}
	};
}

macro_rules! count_or_null {
	($v:expr, $name:literal) => {
		match &$v {
			Value::Null => return Ok(Value::Null),
			Value::Number(n) if n.is_integer() && n.as_i64() >= 0 => n.as_i64() as usize,
			v => {
				return Err(Error::ArgumentValue {
					name: $name.to_owned(),
					message: format!("count must be a non-negative integer, got {v}"),
				})
			}
		}
	};
}

pub fn upper((v,): (Value,)) -> Result<Value, Error> {
	Ok(Value::from(text_or_null!(v).to_uppercase()))
}

pub fn lower((v,): (Value,)) -> Result<Value, Error> {
	Ok(Value::from(text_or_null!(v).to_lowercase()))
}

pub fn concat(args: Vec<Value>) -> Result<Value, Error> {
	let mut out = String::new();
	for v in args {
		match v {
			Value::Null => return Ok(Value::Null),
			v => out.push_str(&v.to_raw_string()),
		}
	}
	Ok(Value::from(out))
}

pub fn length((v,): (Value,)) -> Result<Value, Error> {
	Ok(Value::from(text_or_null!(v).chars().count()))
}

pub fn substring((v, start, len): (Value, Value, Option<Value>)) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let start = match &start {
		Value::Null => return Ok(Value::Null),
		Value::Number(n) if n.is_integer() && n.as_i64() > 0 => n.as_i64() as usize,
		v => {
			return Err(Error::ArgumentValue {
				name: "SUBSTRING".to_owned(),
				message: format!("start position must be a positive integer, got {v}"),
			})
		}
	};
	let len = match &len {
		None => None,
		Some(Value::Null) => return Ok(Value::Null),
		Some(Value::Number(n)) if n.is_integer() && n.as_i64() >= 0 => Some(n.as_i64() as usize),
		Some(v) => {
			return Err(Error::ArgumentValue {
				name: "SUBSTRING".to_owned(),
				message: format!("length must be a non-negative integer, got {v}"),
			})
		}
	};
	let chars = text.chars().skip(start - 1);
	let out: String = match len {
		Some(len) => chars.take(len).collect(),
		None => chars.collect(),
	};
	Ok(Value::from(out))
}

pub fn trim((v,): (Value,)) -> Result<Value, Error> {
	Ok(Value::from(text_or_null!(v).trim().to_owned()))
}

pub fn replace((v, from, to): (Value, Value, Value)) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let from = text_or_null!(from);
	let to = text_or_null!(to);
	if from.is_empty() {
		return Ok(Value::from(text));
	}
	Ok(Value::from(text.replace(&from, &to)))
}

pub fn left((v, n): (Value, Value)) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let n = count_or_null!(n, "LEFT");
	Ok(Value::from(text.chars().take(n).collect::<String>()))
}

pub fn right((v, n): (Value, Value)) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let n = count_or_null!(n, "RIGHT");
	let total = text.chars().count();
	Ok(Value::from(text.chars().skip(total.saturating_sub(n)).collect::<String>()))
}

/// The 1-based position of the first occurrence of `sub`, or 0.
pub fn instr((v, sub): (Value, Value)) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let sub = text_or_null!(sub);
	match text.find(&sub) {
		Some(byte_pos) => Ok(Value::from(text[..byte_pos].chars().count() + 1)),
		None => Ok(Value::from(0)),
	}
}

fn compile(name: &str, pattern: &str) -> Result<Regex, Error> {
	Regex::new(pattern).map_err(|e| Error::ArgumentValue {
		name: name.to_owned(),
		message: format!("invalid regular expression: {e}"),
	})
}

fn position_arg(name: &str, v: Option<Value>) -> Result<Option<usize>, Error> {
	match v {
		None => Ok(Some(1)),
		Some(Value::Null) => Ok(None),
		Some(Value::Number(n)) if n.is_integer() && n.as_i64() > 0 => {
			Ok(Some(n.as_i64() as usize))
		}
		Some(v) => Err(Error::ArgumentValue {
			name: name.to_owned(),
			message: format!("position must be a positive integer, got {v}"),
		}),
	}
}

fn occurrence_arg(name: &str, v: Option<Value>, default: usize) -> Result<Option<usize>, Error> {
	match v {
		None => Ok(Some(default)),
		Some(Value::Null) => Ok(None),
		Some(Value::Number(n)) if n.is_integer() && n.as_i64() >= 0 => {
			Ok(Some(n.as_i64() as usize))
		}
		Some(v) => Err(Error::ArgumentValue {
			name: name.to_owned(),
			message: format!("occurrence must be a non-negative integer, got {v}"),
		}),
	}
}

/// The text of the nth match of a pattern, searching from a 1-based
/// character position. Returns null when nothing matches.
pub fn regexp_substr(
	(v, pattern, position, occurrence): (Value, Value, Option<Value>, Option<Value>),
) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let pattern = text_or_null!(pattern);
	let Some(position) = position_arg("REGEXP_SUBSTR", position)? else {
		return Ok(Value::Null);
	};
	let Some(occurrence) = occurrence_arg("REGEXP_SUBSTR", occurrence, 1)? else {
		return Ok(Value::Null);
	};
	let occurrence = occurrence.max(1);
	let regex = compile("REGEXP_SUBSTR", &pattern)?;
	let start: usize = text.chars().take(position - 1).map(char::len_utf8).sum();
	if start > text.len() {
		return Ok(Value::Null);
	}
	let result = match regex.find_iter(&text[start..]).nth(occurrence - 1) {
		Some(found) => Ok(Value::from(found.as_str().to_owned())),
		None => Ok(Value::Null),
	};
	result
}

/// Replace matches of a pattern, searching from a 1-based character
/// position. Occurrence 0, the default, replaces every match; a positive
/// occurrence replaces only that match.
pub fn regexp_replace(
	(v, pattern, replacement, position, occurrence): (
		Value,
		Value,
		Value,
		Option<Value>,
		Option<Value>,
	),
) -> Result<Value, Error> {
	let text = text_or_null!(v);
	let pattern = text_or_null!(pattern);
	let replacement = text_or_null!(replacement);
	let Some(position) = position_arg("REGEXP_REPLACE", position)? else {
		return Ok(Value::Null);
	};
	let Some(occurrence) = occurrence_arg("REGEXP_REPLACE", occurrence, 0)? else {
		return Ok(Value::Null);
	};
	let regex = compile("REGEXP_REPLACE", &pattern)?;
	let start: usize = text.chars().take(position - 1).map(char::len_utf8).sum();
	if start > text.len() {
		return Ok(Value::from(text));
	}
	let (head, tail) = text.split_at(start);
	let replaced = match occurrence {
		0 => regex.replace_all(tail, replacement.as_str()).into_owned(),
		n => {
			let mut out = String::with_capacity(tail.len());
			let mut last = 0;
			for (i, found) in regex.find_iter(tail).enumerate() {
				if i + 1 == n {
					out.push_str(&tail[last..found.start()]);
					out.push_str(&replacement);
					last = found.end();
					break;
				}
			}
			out.push_str(&tail[last..]);
			out
		}
	};
	Ok(Value::from(format!("{head}{replaced}")))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basic_string_functions() {
		assert_eq!(upper((Value::from("abc"),)).unwrap(), Value::from("ABC"));
		assert_eq!(lower((Value::Null,)).unwrap(), Value::Null);
		assert_eq!(length((Value::from("héllo"),)).unwrap(), Value::from(5));
		assert_eq!(
			concat(vec![Value::from("a"), Value::from(1), Value::from("b")]).unwrap(),
			Value::from("a1b")
		);
		assert_eq!(concat(vec![Value::from("a"), Value::Null]).unwrap(), Value::Null);
		assert_eq!(instr((Value::from("hello"), Value::from("ll"))).unwrap(), Value::from(3));
		assert_eq!(instr((Value::from("hello"), Value::from("zz"))).unwrap(), Value::from(0));
	}

	#[test]
	fn substring_positions_are_one_based() {
		assert_eq!(
			substring((Value::from("hello"), Value::from(2), Some(Value::from(3)))).unwrap(),
			Value::from("ell")
		);
		assert_eq!(
			substring((Value::from("hello"), Value::from(4), None)).unwrap(),
			Value::from("lo")
		);
		let err = substring((Value::from("hello"), Value::from(0), None)).unwrap_err();
		assert!(err.to_string().contains("start position must be a positive integer, got 0"));
	}

	#[test]
	fn left_right_clamp() {
		assert_eq!(left((Value::from("hello"), Value::from(2))).unwrap(), Value::from("he"));
		assert_eq!(right((Value::from("hello"), Value::from(99))).unwrap(), Value::from("hello"));
	}

	#[test]
	fn regexp_functions() {
		assert_eq!(
			regexp_substr((Value::from("a1b22c333"), Value::from("[0-9]+"), None, Some(Value::from(2))))
				.unwrap(),
			Value::from("22")
		);
		assert_eq!(
			regexp_substr((Value::from("abc"), Value::from("[0-9]"), None, None)).unwrap(),
			Value::Null
		);
		assert_eq!(
			regexp_replace((
				Value::from("a1b2c3"),
				Value::from("[0-9]"),
				Value::from("#"),
				None,
				None,
			))
			.unwrap(),
			Value::from("a#b#c#")
		);
		assert_eq!(
			regexp_replace((
				Value::from("a1b2c3"),
				Value::from("[0-9]"),
				Value::from("#"),
				None,
				Some(Value::from(2)),
			))
			.unwrap(),
			Value::from("a1b#c3")
		);
	}
}
