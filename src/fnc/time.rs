use crate::err::Error;
use crate::sql::datetime::Datetime;
use crate::sql::value::Value;

/// The current date in UTC, rendered `YYYY-MM-DD`.
pub fn current_date(_: ()) -> Result<Value, Error> {
	Ok(Value::Datetime(Datetime::today()))
}

/// The current timestamp in UTC, rendered as ISO-8601 with milliseconds.
pub fn current_timestamp(_: ()) -> Result<Value, Error> {
	Ok(Value::Datetime(Datetime::now()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn formats() {
		let Value::Datetime(d) = current_date(()).unwrap() else {
			panic!("expected a datetime");
		};
		assert!(d.is_date_only());
		let Value::Datetime(t) = current_timestamp(()).unwrap() else {
			panic!("expected a datetime");
		};
		assert!(!t.is_date_only());
		assert!(t.as_str().ends_with('Z'));
	}
}
