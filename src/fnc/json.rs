use crate::err::Error;
use crate::sql::object::Object;
use crate::sql::value::Value;

/// A parsed JSONPath step: an object key or an array index.
enum Step {
	Key(String),
	Index(usize),
}

/// Parse the supported JSONPath subset: `$`, `.key` and `[index]` steps,
/// e.g. `$.items[0].name`.
fn parse_path(name: &str, path: &str) -> Result<Vec<Step>, Error> {
	let invalid = |message: String| Error::ArgumentValue {
		name: name.to_owned(),
		message,
	};
	let mut chars = path.chars().peekable();
	if chars.next() != Some('$') {
		return Err(invalid(format!("JSON path must start with '$', got {path:?}")));
	}
	let mut steps = Vec::new();
	while let Some(c) = chars.next() {
		match c {
			'.' => {
				let mut key = String::new();
				while let Some(&next) = chars.peek() {
					if next == '.' || next == '[' {
						break;
					}
					key.push(next);
					chars.next();
				}
				if key.is_empty() {
					return Err(invalid(format!("empty key in JSON path {path:?}")));
				}
				steps.push(Step::Key(key));
			}
			'[' => {
				let mut digits = String::new();
				for next in chars.by_ref() {
					if next == ']' {
						break;
					}
					digits.push(next);
				}
				let index = digits
					.trim()
					.parse::<usize>()
					.map_err(|_| invalid(format!("invalid array index in JSON path {path:?}")))?;
				steps.push(Step::Index(index));
			}
			c => return Err(invalid(format!("unexpected {c:?} in JSON path {path:?}"))),
		}
	}
	Ok(steps)
}

/// Resolve the JSON input argument: nested values pass through, strings
/// are parsed as JSON text.
fn json_input(name: &str, v: Value) -> Result<Option<Value>, Error> {
	match v {
		Value::Null => Ok(None),
		v @ (Value::Object(_) | Value::Array(_)) => Ok(Some(v)),
		Value::Strand(s) => match serde_json::from_str::<serde_json::Value>(&s) {
			Ok(parsed) => Ok(Some(Value::from(parsed))),
			Err(e) => Err(Error::ArgumentValue {
				name: name.to_owned(),
				message: format!("invalid JSON document: {e}"),
			}),
		},
		v => Ok(Some(v)),
	}
}

fn walk(mut value: Value, steps: &[Step]) -> Value {
	for step in steps {
		value = match (step, value) {
			(Step::Key(key), Value::Object(mut o)) => o.remove(key).unwrap_or(Value::Null),
			(Step::Index(i), Value::Array(mut a)) => {
				if *i < a.len() {
					a.swap_remove(*i)
				} else {
					Value::Null
				}
			}
			_ => Value::Null,
		};
	}
	value
}

/// JSON_VALUE(json, path): the scalar at a path, null for a missing
/// path or a non-scalar result.
pub fn json_value((doc, path): (Value, Value)) -> Result<Value, Error> {
	let path = match path {
		Value::Null => return Ok(Value::Null),
		v => v.to_raw_string(),
	};
	let Some(doc) = json_input("JSON_VALUE", doc)? else {
		return Ok(Value::Null);
	};
	let steps = parse_path("JSON_VALUE", &path)?;
	match walk(doc, &steps) {
		Value::Object(_) | Value::Array(_) => Ok(Value::Null),
		v => Ok(v),
	}
}

/// JSON_QUERY(json, path): the object or array at a path, null for a
/// missing path or a scalar result.
pub fn json_query((doc, path): (Value, Value)) -> Result<Value, Error> {
	let path = match path {
		Value::Null => return Ok(Value::Null),
		v => v.to_raw_string(),
	};
	let Some(doc) = json_input("JSON_QUERY", doc)? else {
		return Ok(Value::Null);
	};
	let steps = parse_path("JSON_QUERY", &path)?;
	match walk(doc, &steps) {
		v @ (Value::Object(_) | Value::Array(_)) => Ok(v),
		_ => Ok(Value::Null),
	}
}

/// JSON_OBJECT(k1, v1, k2, v2, ...): build an object from alternating
/// keys and values.
pub fn json_object(args: Vec<Value>) -> Result<Value, Error> {
	if args.len() % 2 != 0 {
		return Err(Error::ArgumentValue {
			name: "JSON_OBJECT".to_owned(),
			message: format!("expected an even number of arguments, got {}", args.len()),
		});
	}
	let mut out = Object::default();
	let mut iter = args.into_iter();
	while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
		let key = match key {
			Value::Null => {
				return Err(Error::ArgumentValue {
					name: "JSON_OBJECT".to_owned(),
					message: "object keys must not be null".to_owned(),
				})
			}
			v => v.to_raw_string(),
		};
		out.insert(key, value);
	}
	Ok(Value::Object(out))
}
