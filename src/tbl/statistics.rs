use std::collections::BTreeMap;

/// Optional statistics a data source can expose for cost estimation.
#[derive(Clone, Debug, Default)]
#[non_exhaustive]
pub struct Statistics {
	/// The total number of rows, when known
	pub num_rows: Option<usize>,
	/// The relative cost of evaluating one cell of each column
	pub column_weights: BTreeMap<String, f64>,
}

impl Statistics {
	pub fn new(num_rows: usize) -> Self {
		Self {
			num_rows: Some(num_rows),
			column_weights: BTreeMap::new(),
		}
	}

	pub fn with_column_weight(mut self, column: impl Into<String>, weight: f64) -> Self {
		self.column_weights.insert(column.into(), weight);
		self
	}

	/// The weight of a single column; columns without an entry count 1.
	pub fn column_weight(&self, column: &str) -> f64 {
		self.column_weights.get(column).copied().unwrap_or(1.0)
	}
}
