use crate::err::Error;
use crate::sql::value::Value;

/// Converts the argument vector of a function call into the typed shape
/// a builtin expects. Arity errors carry the function name and the
/// expected and actual counts.
pub trait FromArgs: Sized {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error>;
}

fn arity_error(name: &str, expected: &str, actual: usize) -> Error {
	Error::ArgumentArity {
		name: name.to_owned(),
		expected: expected.to_owned(),
		actual,
	}
}

/// Variadic functions receive their arguments unchanged.
impl FromArgs for Vec<Value> {
	fn from_args(_name: &str, args: Vec<Value>) -> Result<Self, Error> {
		Ok(args)
	}
}

impl FromArgs for () {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error> {
		if !args.is_empty() {
			return Err(arity_error(name, "0", args.len()));
		}
		Ok(())
	}
}

impl FromArgs for (Value,) {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error> {
		let [a] = <[Value; 1]>::try_from(args)
			.map_err(|args| arity_error(name, "1", args.len()))?;
		Ok((a,))
	}
}

impl FromArgs for (Value, Value) {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error> {
		let [a, b] = <[Value; 2]>::try_from(args)
			.map_err(|args| arity_error(name, "2", args.len()))?;
		Ok((a, b))
	}
}

impl FromArgs for (Value, Value, Value) {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error> {
		let [a, b, c] = <[Value; 3]>::try_from(args)
			.map_err(|args| arity_error(name, "3", args.len()))?;
		Ok((a, b, c))
	}
}

impl FromArgs for (Value, Value, Value, Value) {
	fn from_args(name: &str, args: Vec<Value>) -> Result<Self, Error> {
		let [a, b, c, d] = <[Value; 4]>::try_from(args)
			.map_err(|args| arity_error(name, "4", args.len()))?;
		Ok((a, b, c, d))
	}
}

/// One required argument with one optional tail.
impl FromArgs for (Value, Option<Value>) {
	fn from_args(name: &str, mut args: Vec<Value>) -> Result<Self, Error> {
		if args.is_empty() || args.len() > 2 {
			return Err(arity_error(name, "1 to 2", args.len()));
		}
		let second = if args.len() == 2 {
			args.pop()
		} else {
			None
		};
		Ok((args.pop().expect("length checked above"), second))
	}
}

/// Two required arguments with one optional tail.
impl FromArgs for (Value, Value, Option<Value>) {
	fn from_args(name: &str, mut args: Vec<Value>) -> Result<Self, Error> {
		if args.len() < 2 || args.len() > 3 {
			return Err(arity_error(name, "2 to 3", args.len()));
		}
		let third = if args.len() == 3 {
			args.pop()
		} else {
			None
		};
		let second = args.pop().expect("length checked above");
		Ok((args.pop().expect("length checked above"), second, third))
	}
}

/// Two required arguments with two optional tails.
impl FromArgs for (Value, Value, Option<Value>, Option<Value>) {
	fn from_args(name: &str, mut args: Vec<Value>) -> Result<Self, Error> {
		if args.len() < 2 || args.len() > 4 {
			return Err(arity_error(name, "2 to 4", args.len()));
		}
		let fourth = if args.len() == 4 {
			args.pop()
		} else {
			None
		};
		let third = if args.len() == 3 {
			args.pop()
		} else {
			None
		};
		let second = args.pop().expect("length checked above");
		Ok((args.pop().expect("length checked above"), second, third, fourth))
	}
}

/// Three required arguments with two optional tails.
impl FromArgs for (Value, Value, Value, Option<Value>, Option<Value>) {
	fn from_args(name: &str, mut args: Vec<Value>) -> Result<Self, Error> {
		if args.len() < 3 || args.len() > 5 {
			return Err(arity_error(name, "3 to 5", args.len()));
		}
		let fifth = if args.len() == 5 {
			args.pop()
		} else {
			None
		};
		let fourth = if args.len() == 4 {
			args.pop()
		} else {
			None
		};
		let third = args.pop().expect("length checked above");
		let second = args.pop().expect("length checked above");
		Ok((args.pop().expect("length checked above"), second, third, fourth, fifth))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn arity_errors_name_the_function() {
		let err = <(Value, Value)>::from_args("POWER", vec![Value::from(1)]).unwrap_err();
		assert_eq!(
			err.to_string(),
			"Incorrect number of arguments for POWER(): expected 2, got 1"
		);
	}

	#[test]
	fn optional_tails() {
		let (a, b) = <(Value, Option<Value>)>::from_args("ROUND", vec![Value::from(1.5)]).unwrap();
		assert_eq!(a, Value::from(1.5));
		assert!(b.is_none());
		let (_, _, c) =
			<(Value, Value, Option<Value>)>::from_args("SUBSTRING", vec![
				Value::from("abc"),
				Value::from(1),
				Value::from(2),
			])
			.unwrap();
		assert_eq!(c, Some(Value::from(2)));
	}
}
