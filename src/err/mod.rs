use thiserror::Error;

/// The errors returned by any part of the query pipeline.
///
/// Parse and plan failures are raised synchronously from the top-level entry
/// points. Execution failures surface from the row stream at the point the
/// offending row or cell is awaited; a stream is not resumable after an
/// error, and nothing is retried.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
	/// The query string could not be tokenized or parsed
	#[error("Parse error: {message} at line {line}, column {column}")]
	Parse {
		message: String,
		line: usize,
		column: usize,
	},

	/// The query referenced a table which is not present in the catalog
	#[error("Unknown table: {0}")]
	UnknownTable(String),

	/// An identifier did not resolve against any column of the current row
	#[error("Unknown column: {0}")]
	UnknownColumn(String),

	/// A function call did not resolve against a builtin or user function
	#[error("Unknown function: {0}")]
	UnknownFunction(String),

	/// A function was called with the wrong number of arguments
	#[error("Incorrect number of arguments for {name}(): expected {expected}, got {actual}")]
	ArgumentArity {
		name: String,
		expected: String,
		actual: usize,
	},

	/// A function was called with an argument value outside its domain
	#[error("Invalid argument for {name}(): {message}")]
	ArgumentValue {
		name: String,
		message: String,
	},

	/// A statement used a feature this engine does not implement
	#[error("Unsupported: {0}")]
	Unsupported(String),

	/// A CAST could not convert the source value into the target type
	#[error("Cannot cast {from} to {into}")]
	Cast {
		from: String,
		into: String,
	},

	/// A data source violated the scan contract
	#[error("Data source protocol violation: {0}")]
	DataSourceProtocol(String),

	/// The query was cancelled through its context
	///
	/// Operators normally end their stream cleanly on cancellation without
	/// surfacing this error. It exists for API layers which need to
	/// distinguish an aborted query from an exhausted one.
	#[error("Query execution cancelled")]
	Cancelled,

	/// An execution error decorated with the 1-based ordinal of the
	/// offending input row
	#[error("{source} (row {row})")]
	Row {
		row: usize,
		source: Box<Error>,
	},

	/// An internal invariant was broken
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Attach the 1-based input row ordinal to an execution error.
	///
	/// An error that already carries a row ordinal is returned unchanged, so
	/// the innermost decoration wins.
	pub fn with_row(self, row: usize) -> Self {
		match self {
			Error::Row {
				..
			} => self,
			other => Error::Row {
				row,
				source: Box::new(other),
			},
		}
	}

	/// Whether this error carries a row ordinal already.
	pub fn has_row(&self) -> bool {
		matches!(self, Error::Row { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn row_decoration_renders_ordinal() {
		let err = Error::ArgumentValue {
			name: "SUBSTRING".to_owned(),
			message: "start position must be a positive integer, got 0".to_owned(),
		}
		.with_row(2);
		let msg = err.to_string();
		assert!(msg.contains("start position must be a positive integer, got 0"));
		assert!(msg.contains("(row 2)"));
	}

	#[test]
	fn row_decoration_is_idempotent() {
		let err = Error::UnknownColumn("age".to_owned()).with_row(3).with_row(7);
		assert_eq!(err.to_string(), "Unknown column: age (row 3)");
	}
}
