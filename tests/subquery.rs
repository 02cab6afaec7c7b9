mod helpers;

use helpers::*;
use serde_json::json;

fn people() -> quillsql::Catalog {
	catalog(&[(
		"u",
		json!([
			{ "name": "Alice", "age": 30 },
			{ "name": "Bob", "age": 25 },
			{ "name": "Charlie", "age": 35 },
		]),
	)])
}

#[tokio::test]
async fn ctes_resolve_case_insensitively() {
	let catalog = people();
	let rows = run(
		&catalog,
		"WITH t AS (SELECT * FROM u WHERE age > 25) SELECT name FROM T",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Alice" }, { "name": "Charlie" }]));
}

#[tokio::test]
async fn ctes_shadow_tables_and_see_earlier_ctes() {
	let catalog = people();
	let rows = run(
		&catalog,
		"WITH u AS (SELECT * FROM u WHERE age > 25), \
		      old AS (SELECT * FROM u WHERE age > 30) \
		 SELECT name FROM old",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Charlie" }]));
}

#[tokio::test]
async fn cte_references_re_execute_per_reference() {
	let catalog = people();
	let rows = run(
		&catalog,
		"WITH t AS (SELECT * FROM u) \
		 SELECT a.name FROM t AS a JOIN t AS b ON a.name = b.name",
	)
	.await
	.unwrap();
	assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn derived_tables_need_their_alias() {
	let catalog = people();
	let rows = run(
		&catalog,
		"SELECT d.name FROM (SELECT name FROM u WHERE age < 31) AS d ORDER BY d.name",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Alice" }, { "name": "Bob" }]));
}

#[tokio::test]
async fn in_subquery_membership() {
	let catalog = catalog(&[
		(
			"users",
			json!([
				{ "id": 1, "name": "Alice" },
				{ "id": 2, "name": "Bob" },
				{ "id": 3, "name": "Charlie" },
			]),
		),
		("vips", json!([{ "uid": 1 }, { "uid": 3 }])),
	]);
	let rows = run(
		&catalog,
		"SELECT name FROM users WHERE id IN (SELECT uid FROM vips)",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Alice" }, { "name": "Charlie" }]));
	let rows = run(
		&catalog,
		"SELECT name FROM users WHERE id NOT IN (SELECT uid FROM vips)",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Bob" }]));
}

#[tokio::test]
async fn not_in_with_a_null_subquery_value_matches_nothing() {
	let catalog = catalog(&[
		("users", json!([{ "id": 1 }, { "id": 2 }])),
		("vips", json!([{ "uid": 1 }, { "uid": null }])),
	]);
	// NOT IN against a set containing null is never true
	let rows = run(
		&catalog,
		"SELECT id FROM users WHERE id NOT IN (SELECT uid FROM vips)",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([]));
}

#[tokio::test]
async fn exists_stops_at_the_first_row() {
	let catalog = catalog(&[
		("full_table", json!([{ "x": 1 }, { "x": 2 }])),
		("empty_table", json!([])),
	]);
	let rows = run(
		&catalog,
		"SELECT EXISTS (SELECT * FROM full_table) AS yes, \
		        EXISTS (SELECT * FROM empty_table) AS no",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "yes": true, "no": false }]));
}

#[tokio::test]
async fn scalar_subqueries_take_the_first_value() {
	let catalog = people();
	let rows = run(
		&catalog,
		"SELECT name FROM u WHERE age = (SELECT MAX(age) FROM u)",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Charlie" }]));
}

#[tokio::test]
async fn correlated_references_fail_resolution() {
	let catalog = catalog(&[
		("outer_t", json!([{ "a": 1 }])),
		("inner_t", json!([{ "b": 2 }])),
	]);
	let err = run(
		&catalog,
		"SELECT a FROM outer_t WHERE a IN (SELECT a FROM inner_t)",
	)
	.await
	.unwrap_err();
	assert!(err.to_string().contains("a"), "{err}");
}
