use crate::err::Error;
use crate::sql::value::Value;
use rand::Rng;

/// A uniform float in `[0, 1)`.
pub fn random(_: ()) -> Result<Value, Error> {
	Ok(Value::from(rand::thread_rng().gen::<f64>()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stays_in_range() {
		for _ in 0..64 {
			let Value::Number(n) = random(()).unwrap() else {
				panic!("expected a number");
			};
			let f = n.as_f64();
			assert!((0.0..1.0).contains(&f));
		}
	}
}
