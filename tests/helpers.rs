#![allow(dead_code)]

use quillsql::{collect, execute, Catalog, Error, ExecuteOptions, MemTable, Object, Value};
use std::sync::Arc;

/// Build rows from a JSON array of objects.
pub fn objects(rows: serde_json::Value) -> Vec<Object> {
	let Value::Array(rows) = Value::from(rows) else {
		panic!("expected a JSON array of rows");
	};
	rows.into_iter()
		.map(|row| match row {
			Value::Object(object) => object,
			other => panic!("expected a row object, got {other}"),
		})
		.collect()
}

/// Build a catalog of in-memory tables from JSON rows.
pub fn catalog(tables: &[(&str, serde_json::Value)]) -> Catalog {
	let mut catalog = Catalog::new();
	for (name, rows) in tables {
		catalog.insert(*name, Arc::new(MemTable::from_objects(objects(rows.clone()))));
	}
	catalog
}

/// Execute a query against a catalog and materialize every row.
pub async fn run(catalog: &Catalog, sql: &str) -> Result<Vec<Object>, Error> {
	collect(execute(sql, ExecuteOptions::new(catalog.clone()))?).await
}

/// Render materialized rows as JSON for structural assertions.
pub fn as_json(rows: &[Object]) -> serde_json::Value {
	serde_json::Value::Array(
		rows.iter().map(|row| serde_json::Value::from(Value::Object(row.clone()))).collect(),
	)
}

/// The standard five-user fixture shared across tests.
pub fn users() -> Catalog {
	catalog(&[(
		"users",
		serde_json::json!([
			{ "id": 1, "name": "Alice", "age": 30, "city": "NYC" },
			{ "id": 2, "name": "Bob", "age": 25, "city": "LA" },
			{ "id": 3, "name": "Charlie", "age": 35, "city": "NYC" },
			{ "id": 4, "name": "Dana", "age": 28, "city": "NYC" },
			{ "id": 5, "name": "Eve", "age": 41, "city": "LA" },
		]),
	)])
}
