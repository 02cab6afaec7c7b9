use crate::err::Error;
use crate::sql::escape::quote_str;
use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::ops::Deref;
use std::time::Duration;

/// An ISO-8601 date or timestamp.
///
/// The value keeps its validated textual form so that a date-only operand
/// stays `YYYY-MM-DD` through arithmetic while a timestamp operand keeps
/// millisecond precision. Chronological ordering coincides with the text
/// ordering for the formats accepted here.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub struct Datetime(pub String);

/// The interval units accepted by date arithmetic.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Serialize, Deserialize, Hash)]
#[non_exhaustive]
pub enum IntervalUnit {
	Year,
	Month,
	Day,
	Hour,
	Minute,
	Second,
}

impl Display for IntervalUnit {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Self::Year => f.write_str("YEAR"),
			Self::Month => f.write_str("MONTH"),
			Self::Day => f.write_str("DAY"),
			Self::Hour => f.write_str("HOUR"),
			Self::Minute => f.write_str("MINUTE"),
			Self::Second => f.write_str("SECOND"),
		}
	}
}

impl Deref for Datetime {
	type Target = String;
	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<Datetime> for String {
	fn from(v: Datetime) -> Self {
		v.0
	}
}

impl Datetime {
	/// Parse a textual date or timestamp, keeping the original text.
	pub fn parse(text: &str) -> Option<Datetime> {
		parse_parts(text).map(|_| Datetime(text.to_owned()))
	}

	/// The current date, rendered `YYYY-MM-DD`.
	pub fn today() -> Datetime {
		Datetime(Utc::now().format("%Y-%m-%d").to_string())
	}

	/// The current timestamp, rendered as ISO-8601 with milliseconds.
	pub fn now() -> Datetime {
		Datetime(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
	}

	/// Whether this value carries a date without a time component.
	pub fn is_date_only(&self) -> bool {
		matches!(parse_parts(&self.0), Some(Parsed::Date(_)))
	}

	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	/// Apply `value` units to this date or timestamp. The result keeps the
	/// operand's format: date-only stays `YYYY-MM-DD`, timestamps render as
	/// UTC ISO-8601 with milliseconds.
	pub fn add_interval(&self, value: i64, unit: IntervalUnit) -> Result<Datetime, Error> {
		let parsed = parse_parts(&self.0).ok_or_else(|| Error::ArgumentValue {
			name: "INTERVAL".to_owned(),
			message: format!("cannot apply an interval to {}", quote_str(&self.0)),
		})?;
		match parsed {
			Parsed::Date(date) => {
				let shifted = shift_datetime(
					date.and_hms_opt(0, 0, 0)
						.map(|dt| Utc.from_utc_datetime(&dt))
						.ok_or_else(|| overflow_error(&self.0))?,
					value,
					unit,
				)
				.ok_or_else(|| overflow_error(&self.0))?;
				Ok(Datetime(shifted.format("%Y-%m-%d").to_string()))
			}
			Parsed::Timestamp(dt) => {
				let shifted =
					shift_datetime(dt, value, unit).ok_or_else(|| overflow_error(&self.0))?;
				Ok(Datetime(shifted.to_rfc3339_opts(SecondsFormat::Millis, true)))
			}
		}
	}
}

fn overflow_error(text: &str) -> Error {
	Error::ArgumentValue {
		name: "INTERVAL".to_owned(),
		message: format!("date arithmetic overflowed for {}", quote_str(text)),
	}
}

enum Parsed {
	Date(NaiveDate),
	Timestamp(DateTime<Utc>),
}

fn parse_parts(text: &str) -> Option<Parsed> {
	if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
		return Some(Parsed::Date(date));
	}
	if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
		return Some(Parsed::Timestamp(dt.with_timezone(&Utc)));
	}
	// Timestamps without a zone are taken as UTC
	for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
		if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
			return Some(Parsed::Timestamp(Utc.from_utc_datetime(&dt)));
		}
	}
	None
}

fn shift_datetime(dt: DateTime<Utc>, value: i64, unit: IntervalUnit) -> Option<DateTime<Utc>> {
	let magnitude = value.unsigned_abs();
	let forward = value >= 0;
	match unit {
		IntervalUnit::Year => {
			let months = Months::new(u32::try_from(magnitude.checked_mul(12)?).ok()?);
			if forward {
				dt.checked_add_months(months)
			} else {
				dt.checked_sub_months(months)
			}
		}
		IntervalUnit::Month => {
			let months = Months::new(u32::try_from(magnitude).ok()?);
			if forward {
				dt.checked_add_months(months)
			} else {
				dt.checked_sub_months(months)
			}
		}
		IntervalUnit::Day => {
			let days = Days::new(magnitude);
			if forward {
				dt.checked_add_days(days)
			} else {
				dt.checked_sub_days(days)
			}
		}
		IntervalUnit::Hour | IntervalUnit::Minute | IntervalUnit::Second => {
			let seconds = match unit {
				IntervalUnit::Hour => magnitude.checked_mul(3600)?,
				IntervalUnit::Minute => magnitude.checked_mul(60)?,
				_ => magnitude,
			};
			let delta = chrono::Duration::from_std(Duration::from_secs(seconds)).ok()?;
			if forward {
				dt.checked_add_signed(delta)
			} else {
				dt.checked_sub_signed(delta)
			}
		}
	}
}

impl Display for Datetime {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		Display::fmt(&quote_str(&self.0), f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn date_plus_interval_preserves_date_format() {
		let d = Datetime::parse("2024-01-31").unwrap();
		assert_eq!(d.add_interval(1, IntervalUnit::Month).unwrap().as_str(), "2024-02-29");
		assert_eq!(d.add_interval(2, IntervalUnit::Day).unwrap().as_str(), "2024-02-02");
		assert_eq!(d.add_interval(-1, IntervalUnit::Year).unwrap().as_str(), "2023-01-31");
	}

	#[test]
	fn timestamp_plus_interval_keeps_milliseconds() {
		let d = Datetime::parse("2024-03-01T10:30:00.250Z").unwrap();
		let shifted = d.add_interval(90, IntervalUnit::Minute).unwrap();
		assert_eq!(shifted.as_str(), "2024-03-01T12:00:00.250Z");
		assert!(!shifted.is_date_only());
	}

	#[test]
	fn hours_on_a_date_keep_the_date_format() {
		let d = Datetime::parse("2024-03-01").unwrap();
		assert_eq!(d.add_interval(26, IntervalUnit::Hour).unwrap().as_str(), "2024-03-02");
	}

	#[test]
	fn rejects_invalid_text() {
		assert!(Datetime::parse("not a date").is_none());
		assert!(Datetime::parse("2024-13-01").is_none());
	}
}
