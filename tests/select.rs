mod helpers;

use helpers::*;
use quillsql::Catalog;
use serde_json::json;

#[tokio::test]
async fn limit_and_offset_window_the_stream() {
	let catalog = catalog(&[(
		"users",
		json!([{ "id": 1 }, { "id": 2 }, { "id": 3 }, { "id": 4 }]),
	)]);
	let rows = run(&catalog, "SELECT * FROM users LIMIT 2 OFFSET 1").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "id": 2 }, { "id": 3 }]));
}

#[tokio::test]
async fn select_star_returns_the_table_unchanged() {
	let catalog = users();
	let rows = run(&catalog, "SELECT * FROM users").await.unwrap();
	assert_eq!(rows.len(), 5);
	assert_eq!(rows[0].get("name"), Some(&quillsql::Value::from("Alice")));
	assert_eq!(rows[4].get("city"), Some(&quillsql::Value::from("LA")));
}

#[tokio::test]
async fn where_uses_three_valued_logic() {
	let catalog = catalog(&[(
		"t",
		json!([
			{ "a": 1, "b": 10 },
			{ "a": null, "b": 20 },
			{ "a": 3, "b": null },
		]),
	)]);
	// A null comparison is not truthy, so the null row is excluded
	let rows = run(&catalog, "SELECT b FROM t WHERE a > 0").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "b": 10 }, { "b": null }]));
	// IS NULL reaches the row the comparison cannot
	let rows = run(&catalog, "SELECT b FROM t WHERE a IS NULL").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "b": 20 }]));
}

#[tokio::test]
async fn projection_aliases_and_defaults() {
	let catalog = users();
	let rows = run(&catalog, "SELECT name AS who, UPPER(city), age + 1 FROM users LIMIT 1")
		.await
		.unwrap();
	let row = &rows[0];
	assert_eq!(row.get("who"), Some(&quillsql::Value::from("Alice")));
	// A function call over an identifier gets a synthesized alias
	assert_eq!(row.get("upper_city"), Some(&quillsql::Value::from("NYC")));
	// A bare operation falls back to the generic alias
	assert_eq!(row.get("expr"), Some(&quillsql::Value::from(31)));
}

#[tokio::test]
async fn order_by_directions_and_nulls_placement() {
	let catalog = catalog(&[(
		"t",
		json!([
			{ "v": 3 }, { "v": null }, { "v": 1 }, { "v": 2 },
		]),
	)]);
	let rows = run(&catalog, "SELECT v FROM t ORDER BY v").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "v": null }, { "v": 1 }, { "v": 2 }, { "v": 3 }]));
	let rows = run(&catalog, "SELECT v FROM t ORDER BY v DESC").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "v": 3 }, { "v": 2 }, { "v": 1 }, { "v": null }]));
	let rows = run(&catalog, "SELECT v FROM t ORDER BY v DESC NULLS FIRST").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "v": null }, { "v": 3 }, { "v": 2 }, { "v": 1 }]));
	let rows = run(&catalog, "SELECT v FROM t ORDER BY v NULLS LAST").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "v": 1 }, { "v": 2 }, { "v": 3 }, { "v": null }]));
}

#[tokio::test]
async fn order_by_is_stable_across_ties() {
	let catalog = catalog(&[(
		"t",
		json!([
			{ "k": 1, "tag": "a" },
			{ "k": 2, "tag": "b" },
			{ "k": 1, "tag": "c" },
			{ "k": 2, "tag": "d" },
			{ "k": 1, "tag": "e" },
		]),
	)]);
	let rows = run(&catalog, "SELECT k, tag FROM t ORDER BY k").await.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "k": 1, "tag": "a" },
			{ "k": 1, "tag": "c" },
			{ "k": 1, "tag": "e" },
			{ "k": 2, "tag": "b" },
			{ "k": 2, "tag": "d" },
		])
	);
}

#[tokio::test]
async fn secondary_keys_break_ties() {
	let catalog = users();
	let rows = run(&catalog, "SELECT city, name FROM users ORDER BY city, name DESC")
		.await
		.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "city": "LA", "name": "Eve" },
			{ "city": "LA", "name": "Bob" },
			{ "city": "NYC", "name": "Dana" },
			{ "city": "NYC", "name": "Charlie" },
			{ "city": "NYC", "name": "Alice" },
		])
	);
}

#[tokio::test]
async fn order_by_resolves_projection_aliases() {
	let catalog = users();
	let rows = run(&catalog, "SELECT age AS years, name FROM users ORDER BY years LIMIT 2")
		.await
		.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "years": 25, "name": "Bob" },
			{ "years": 28, "name": "Dana" },
		])
	);
}

#[tokio::test]
async fn growing_limits_prefix_each_other() {
	let catalog = users();
	let mut previous: Vec<quillsql::Object> = Vec::new();
	for limit in 1..=5 {
		let rows = run(&catalog, &format!("SELECT name FROM users ORDER BY id LIMIT {limit}"))
			.await
			.unwrap();
		assert_eq!(rows.len(), limit);
		assert_eq!(&rows[..previous.len()], &previous[..]);
		previous = rows;
	}
}

#[tokio::test]
async fn distinct_is_idempotent() {
	let catalog = users();
	let once = run(&catalog, "SELECT DISTINCT city FROM users").await.unwrap();
	assert_eq!(as_json(&once), json!([{ "city": "NYC" }, { "city": "LA" }]));
	let twice = run(
		&catalog,
		"SELECT DISTINCT city FROM (SELECT DISTINCT city FROM users) AS d",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&once), as_json(&twice));
}

#[tokio::test]
async fn select_without_from_projects_once() {
	let catalog = Catalog::new();
	let rows = run(&catalog, "SELECT 1 + 2 AS three, 'x' AS tag").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "three": 3, "tag": "x" }]));
}

#[tokio::test]
async fn unknown_tables_and_columns_error() {
	let catalog = users();
	assert!(matches!(
		run(&catalog, "SELECT * FROM missing").await,
		Err(quillsql::Error::UnknownTable(name)) if name == "missing"
	));
	let err = run(&catalog, "SELECT ghost FROM users").await.unwrap_err();
	assert!(err.to_string().contains("ghost"), "{err}");
}

#[tokio::test]
async fn case_between_in_and_cast_evaluate() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT name, \
		        CASE WHEN age >= 35 THEN 'senior' ELSE 'junior' END AS level, \
		        age BETWEEN 26 AND 34 AS mid, \
		        city IN ('NYC', 'SF') AS coastal, \
		        CAST(age AS TEXT) AS age_text \
		 FROM users ORDER BY id LIMIT 2",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "name": "Alice", "level": "junior", "mid": true, "coastal": true, "age_text": "30" },
			{ "name": "Bob", "level": "junior", "mid": false, "coastal": false, "age_text": "25" },
		])
	);
}
