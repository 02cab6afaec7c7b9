use crate::err::Error;
use crate::sql::ident;
use crate::sql::object::Object;
use crate::sql::value::Value;
use crate::tbl::cell::Cell;
use ahash::HashMap;
use ahash::HashMapExt;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// The ordered column names of a row, shared by every row of a stream.
///
/// Lookup is case-insensitive through the central identifier
/// normalization; when two columns normalize to the same name the later
/// one wins, which is also the collision rule for join outputs.
pub struct Schema {
	columns: Vec<String>,
	lookup: HashMap<String, usize>,
}

impl Schema {
	pub fn new(columns: Vec<String>) -> Arc<Schema> {
		let mut lookup = HashMap::with_capacity(columns.len());
		for (i, name) in columns.iter().enumerate() {
			lookup.insert(ident::normal(name), i);
		}
		Arc::new(Schema {
			columns,
			lookup,
		})
	}

	/// The column names in declaration order.
	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn index_of(&self, name: &str) -> Option<usize> {
		self.lookup.get(&ident::normal(name)).copied()
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}
}

impl Debug for Schema {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		f.debug_tuple("Schema").field(&self.columns).finish()
	}
}

/// A single row: a shared schema plus one lazy cell per column.
///
/// Construction never forces a cell. The row ordinal is the 1-based
/// position of the row in its source stream and decorates any error
/// raised while one of its cells is computed.
#[derive(Clone, Debug)]
pub struct Row {
	schema: Arc<Schema>,
	cells: Vec<Cell>,
	/// 1-based input ordinal; 0 when synthetic
	num: usize,
}

impl Row {
	pub fn new(schema: Arc<Schema>, cells: Vec<Cell>) -> Row {
		debug_assert_eq!(schema.len(), cells.len());
		Row {
			schema,
			cells,
			num: 0,
		}
	}

	/// Attach the 1-based source ordinal used for error decoration.
	pub fn numbered(mut self, num: usize) -> Row {
		self.num = num;
		self
	}

	/// The 1-based source ordinal, when known.
	pub fn num(&self) -> Option<usize> {
		match self.num {
			0 => None,
			n => Some(n),
		}
	}

	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}

	pub fn columns(&self) -> &[String] {
		self.schema.columns()
	}

	/// The bare output columns: every column not qualified with a table
	/// prefix. `SELECT *` expands to these.
	pub fn star_columns(&self) -> impl Iterator<Item = &String> {
		self.schema.columns().iter().filter(|name| !name.contains('.'))
	}

	/// Look up a cell by column name, case-insensitively.
	pub fn cell(&self, name: &str) -> Option<&Cell> {
		self.schema.index_of(name).map(|i| &self.cells[i])
	}

	pub fn cell_at(&self, index: usize) -> Option<&Cell> {
		self.cells.get(index)
	}

	pub fn cells(&self) -> &[Cell] {
		&self.cells
	}

	/// Force a single column into a value.
	pub async fn value(&self, name: &str) -> Result<Value, Error> {
		match self.cell(name) {
			Some(cell) => cell.value().await,
			None => Err(Error::UnknownColumn(name.to_owned())),
		}
	}

	/// Force every cell, materializing the row as a plain mapping keyed by
	/// the bare output columns.
	pub async fn to_object(&self) -> Result<Object, Error> {
		let mut out = Object::default();
		for name in self.star_columns() {
			let value = self
				.cell(name)
				.expect("schema columns resolve against their own row")
				.value()
				.await
				.map_err(|e| self.decorate(e))?;
			out.insert(name.clone(), value);
		}
		Ok(out)
	}

	/// Attach this row's ordinal to an execution error.
	pub(crate) fn decorate(&self, err: Error) -> Error {
		match self.num() {
			Some(num) => err.with_row(num),
			None => err,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn lookup_is_case_insensitive() {
		let schema = Schema::new(vec!["Name".to_owned(), "users.Name".to_owned()]);
		let row = Row::new(
			schema,
			vec![Cell::resolved(Value::from("ada")), Cell::resolved(Value::from("ada"))],
		);
		assert_eq!(row.value("name").await.unwrap(), Value::from("ada"));
		assert_eq!(row.value("USERS.NAME").await.unwrap(), Value::from("ada"));
		assert!(row.value("missing").await.is_err());
	}

	#[tokio::test]
	async fn star_columns_skip_qualified_names() {
		let schema =
			Schema::new(vec!["id".to_owned(), "users.id".to_owned(), "city".to_owned()]);
		let row = Row::new(
			schema,
			vec![Cell::resolved(Value::from(1)), Cell::resolved(Value::from(1)), Cell::null()],
		);
		let names: Vec<_> = row.star_columns().cloned().collect();
		assert_eq!(names, vec!["id".to_owned(), "city".to_owned()]);
		let obj = row.to_object().await.unwrap();
		assert_eq!(obj.get("id"), Some(&Value::from(1)));
		assert!(!obj.contains_key("users.id"));
	}
}
