use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::hash;
use std::iter::Sum;
use std::ops::{self};
use std::str::FromStr;

/// The numeric tower: machine integers, floats, and fixed-point decimals
/// for integer literals which exceed the 64-bit range.
#[derive(Clone, Copy, Serialize, Deserialize, Debug)]
#[non_exhaustive]
pub enum Number {
	Int(i64),
	Float(f64),
	Decimal(Decimal),
}

impl Default for Number {
	fn default() -> Self {
		Self::Int(0)
	}
}

macro_rules! from_prim_ints {
	($($int: ty),*) => {
		$(
			impl From<$int> for Number {
				fn from(i: $int) -> Self {
					Self::Int(i as i64)
				}
			}
		)*
	};
}

from_prim_ints!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

impl From<f32> for Number {
	fn from(f: f32) -> Self {
		Self::Float(f as f64)
	}
}

impl From<f64> for Number {
	fn from(f: f64) -> Self {
		Self::Float(f)
	}
}

impl From<Decimal> for Number {
	fn from(v: Decimal) -> Self {
		Self::Decimal(v)
	}
}

impl FromStr for Number {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::try_from(s)
	}
}

impl TryFrom<&str> for Number {
	type Error = ();
	fn try_from(v: &str) -> Result<Self, Self::Error> {
		if let Ok(i) = v.parse::<i64>() {
			return Ok(Number::Int(i));
		}
		// Integer literals beyond the i64 range go through the decimal lane
		if !v.contains(['.', 'e', 'E']) {
			if let Ok(d) = Decimal::from_str(v) {
				return Ok(Number::Decimal(d));
			}
		}
		match v.parse::<f64>() {
			Ok(f) => Ok(Number::Float(f)),
			Err(_) => Err(()),
		}
	}
}

impl Number {
	/// Whether this number is exactly zero
	pub fn is_zero(&self) -> bool {
		match self {
			Number::Int(v) => *v == 0,
			Number::Float(v) => *v == 0.0,
			Number::Decimal(v) => v.is_zero(),
		}
	}

	/// Whether this number is an integer value
	pub fn is_integer(&self) -> bool {
		match self {
			Number::Int(_) => true,
			Number::Float(v) => v.fract() == 0.0,
			Number::Decimal(v) => v.is_integer(),
		}
	}

	pub fn as_i64(self) -> i64 {
		match self {
			Number::Int(v) => v,
			Number::Float(v) => v as i64,
			Number::Decimal(v) => v.to_i64().unwrap_or_default(),
		}
	}

	pub fn as_f64(self) -> f64 {
		match self {
			Number::Int(v) => v as f64,
			Number::Float(v) => v,
			Number::Decimal(v) => v.to_f64().unwrap_or_default(),
		}
	}

	pub fn as_decimal(self) -> Decimal {
		match self {
			Number::Int(v) => Decimal::from(v),
			Number::Float(v) => Decimal::from_f64(v).unwrap_or_default(),
			Number::Decimal(v) => v,
		}
	}

	/// Render the canonical textual form used for stable keys: integral
	/// values render without a fractional part, so `1`, `1.0` and the
	/// decimal `1` all map to the same key fragment.
	pub(crate) fn to_stable_key(self) -> String {
		match self {
			Number::Int(v) => v.to_string(),
			Number::Float(v) => {
				if v.fract() == 0.0 && v.is_finite() && v.abs() < (1u64 << 53) as f64 {
					format!("{}", v as i64)
				} else {
					format!("{v}")
				}
			}
			Number::Decimal(v) => v.normalize().to_string(),
		}
	}
}

impl Eq for Number {}

impl PartialEq for Number {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => v.eq(w),
			(Number::Float(v), Number::Float(w)) => v.eq(w),
			(Number::Decimal(v), Number::Decimal(w)) => v.eq(w),
			// Cross-variant comparison is numeric
			(Number::Int(v), Number::Float(w)) => (*v as f64).eq(w),
			(Number::Float(v), Number::Int(w)) => v.eq(&(*w as f64)),
			(Number::Int(v), Number::Decimal(w)) => Decimal::from(*v).eq(w),
			(Number::Decimal(v), Number::Int(w)) => v.eq(&Decimal::from(*w)),
			(Number::Float(v), Number::Decimal(w)) => {
				Decimal::from_f64(*v).map(|v| v.eq(w)).unwrap_or(false)
			}
			(Number::Decimal(v), Number::Float(w)) => {
				Decimal::from_f64(*w).map(|w| v.eq(&w)).unwrap_or(false)
			}
		}
	}
}

impl Ord for Number {
	fn cmp(&self, other: &Self) -> Ordering {
		fn total_cmp_f64(a: f64, b: f64) -> Ordering {
			a.partial_cmp(&b).unwrap_or_else(|| {
				// NaN sorts above every other number
				match (a.is_nan(), b.is_nan()) {
					(true, true) => Ordering::Equal,
					(true, false) => Ordering::Greater,
					(false, true) => Ordering::Less,
					(false, false) => Ordering::Equal,
				}
			})
		}
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => v.cmp(w),
			(Number::Decimal(v), Number::Decimal(w)) => v.cmp(w),
			(Number::Int(v), Number::Decimal(w)) => Decimal::from(*v).cmp(w),
			(Number::Decimal(v), Number::Int(w)) => v.cmp(&Decimal::from(*w)),
			(v, w) => total_cmp_f64(v.as_f64(), w.as_f64()),
		}
	}
}

impl PartialOrd for Number {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl hash::Hash for Number {
	fn hash<H: hash::Hasher>(&self, state: &mut H) {
		// Hash the stable key so cross-variant equal numbers hash alike
		self.to_stable_key().hash(state)
	}
}

impl ops::Add for Number {
	type Output = Self;
	fn add(self, other: Self) -> Self {
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => match v.checked_add(w) {
				Some(r) => Number::Int(r),
				None => Number::Decimal(Decimal::from(v) + Decimal::from(w)),
			},
			(Number::Decimal(v), w) => Number::Decimal(v + w.as_decimal()),
			(v, Number::Decimal(w)) => Number::Decimal(v.as_decimal() + w),
			(v, w) => Number::Float(v.as_f64() + w.as_f64()),
		}
	}
}

impl ops::Sub for Number {
	type Output = Self;
	fn sub(self, other: Self) -> Self {
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => match v.checked_sub(w) {
				Some(r) => Number::Int(r),
				None => Number::Decimal(Decimal::from(v) - Decimal::from(w)),
			},
			(Number::Decimal(v), w) => Number::Decimal(v - w.as_decimal()),
			(v, Number::Decimal(w)) => Number::Decimal(v.as_decimal() - w),
			(v, w) => Number::Float(v.as_f64() - w.as_f64()),
		}
	}
}

impl ops::Mul for Number {
	type Output = Self;
	fn mul(self, other: Self) -> Self {
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => match v.checked_mul(w) {
				Some(r) => Number::Int(r),
				None => Number::Decimal(Decimal::from(v) * Decimal::from(w)),
			},
			(Number::Decimal(v), w) => Number::Decimal(v * w.as_decimal()),
			(v, Number::Decimal(w)) => Number::Decimal(v.as_decimal() * w),
			(v, w) => Number::Float(v.as_f64() * w.as_f64()),
		}
	}
}

impl ops::Div for Number {
	type Output = Self;
	/// Division always leaves the integer lane. The caller handles division
	/// by zero before dispatching here.
	fn div(self, other: Self) -> Self {
		match (self, other) {
			(Number::Decimal(v), w) => Number::Decimal(
				v.checked_div(w.as_decimal()).unwrap_or_default(),
			),
			(v, Number::Decimal(w)) => Number::Decimal(
				v.as_decimal().checked_div(w).unwrap_or_default(),
			),
			(v, w) => Number::Float(v.as_f64() / w.as_f64()),
		}
	}
}

impl ops::Rem for Number {
	type Output = Self;
	fn rem(self, other: Self) -> Self {
		match (self, other) {
			(Number::Int(v), Number::Int(w)) => Number::Int(v.wrapping_rem(w)),
			(Number::Decimal(v), w) => Number::Decimal(
				v.checked_rem(w.as_decimal()).unwrap_or_default(),
			),
			(v, Number::Decimal(w)) => Number::Decimal(
				v.as_decimal().checked_rem(w).unwrap_or_default(),
			),
			(v, w) => Number::Float(v.as_f64() % w.as_f64()),
		}
	}
}

impl ops::Neg for Number {
	type Output = Self;
	fn neg(self) -> Self {
		match self {
			Number::Int(v) => Number::Int(-v),
			Number::Float(v) => Number::Float(-v),
			Number::Decimal(v) => Number::Decimal(-v),
		}
	}
}

impl Sum<Number> for Number {
	fn sum<I: Iterator<Item = Number>>(iter: I) -> Number {
		iter.fold(Number::Int(0), |a, b| a + b)
	}
}

impl Display for Number {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Number::Int(v) => Display::fmt(v, f),
			Number::Float(v) => {
				if v.is_finite() {
					write!(f, "{v}")
				} else if v.is_nan() {
					write!(f, "NaN")
				} else if *v < 0.0 {
					write!(f, "-Infinity")
				} else {
					write!(f, "Infinity")
				}
			}
			Number::Decimal(v) => Display::fmt(v, f),
		}
	}
}
