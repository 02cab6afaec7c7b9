mod helpers;

use helpers::*;
use serde_json::json;

#[tokio::test]
async fn group_by_with_count_orders_by_alias() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT city, COUNT(*) AS c FROM users GROUP BY city ORDER BY c DESC",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "city": "NYC", "c": 3 }, { "city": "LA", "c": 2 }]));
}

#[tokio::test]
async fn count_star_counts_every_row() {
	let empty = catalog(&[("t", json!([]))]);
	let catalog = users();
	let rows = run(&catalog, "SELECT COUNT(*) FROM users").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "count_all": 5 }]));
	let rows = run(&empty, "SELECT COUNT(*) FROM t").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "count_all": 0 }]));
}

#[tokio::test]
async fn count_skips_nulls_and_distinct_dedupes() {
	let catalog = catalog(&[(
		"t",
		json!([
			{ "v": 1 }, { "v": null }, { "v": 2 }, { "v": 1 }, { "v": null },
		]),
	)]);
	let rows = run(
		&catalog,
		"SELECT COUNT(v) AS n, COUNT(DISTINCT v) AS d, COUNT(*) AS all_rows FROM t",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "n": 3, "d": 2, "all_rows": 5 }]));
}

#[tokio::test]
async fn aggregates_over_an_empty_set_are_null() {
	let catalog = catalog(&[("t", json!([]))]);
	let rows = run(
		&catalog,
		"SELECT SUM(v) AS s, AVG(v) AS a, MIN(v) AS lo, MAX(v) AS hi, \
		        STDDEV_POP(v) AS sp, STDDEV_SAMP(v) AS ss, \
		        JSON_ARRAYAGG(v) AS list \
		 FROM t",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([{ "s": null, "a": null, "lo": null, "hi": null, "sp": null, "ss": null, "list": [] }])
	);
}

#[tokio::test]
async fn stddev_of_a_single_value() {
	let catalog = catalog(&[("t", json!([{ "v": 7 }]))]);
	let rows = run(&catalog, "SELECT STDDEV_POP(v) AS p, STDDEV_SAMP(v) AS s FROM t")
		.await
		.unwrap();
	assert_eq!(as_json(&rows), json!([{ "p": 0.0, "s": null }]));
}

#[tokio::test]
async fn welford_stddev_matches_the_closed_form() {
	let catalog = catalog(&[(
		"t",
		json!([{ "v": 2 }, { "v": 4 }, { "v": 4 }, { "v": 4 }, { "v": 5 }, { "v": 5 }, { "v": 7 }, { "v": 9 }]),
	)]);
	let rows = run(&catalog, "SELECT STDDEV_POP(v) AS p FROM t").await.unwrap();
	let quillsql::Value::Number(p) = rows[0].get("p").unwrap() else {
		panic!("expected a number");
	};
	assert!((p.as_f64() - 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn sum_and_avg_skip_non_numeric_values() {
	let catalog = catalog(&[(
		"t",
		json!([{ "v": 1 }, { "v": "x" }, { "v": 3 }, { "v": null }]),
	)]);
	let rows = run(&catalog, "SELECT SUM(v) AS s, AVG(v) AS a FROM t").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "s": 4, "a": 2.0 }]));
}

#[tokio::test]
async fn null_group_keys_group_together() {
	let catalog = catalog(&[(
		"t",
		json!([
			{ "k": "a", "v": 1 },
			{ "k": null, "v": 2 },
			{ "k": null, "v": 3 },
			{ "k": "a", "v": 4 },
		]),
	)]);
	let rows = run(&catalog, "SELECT k, COUNT(*) AS c FROM t GROUP BY k").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "k": "a", "c": 2 }, { "k": null, "c": 2 }]));
}

#[tokio::test]
async fn having_filters_groups_with_nested_aggregates() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT city FROM users GROUP BY city HAVING COUNT(*) > 2",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "city": "NYC" }]));
}

#[tokio::test]
async fn filter_clauses_gate_contributions() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE age > 28) AS older FROM users",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "total": 5, "older": 3 }]));
}

#[tokio::test]
async fn json_arrayagg_collects_in_order() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT city, JSON_ARRAYAGG(name) AS names FROM users GROUP BY city",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "city": "NYC", "names": ["Alice", "Charlie", "Dana"] },
			{ "city": "LA", "names": ["Bob", "Eve"] },
		])
	);
	let catalog = catalog_with_dupes();
	let rows = run(
		&catalog,
		"SELECT JSON_ARRAYAGG(DISTINCT v) AS vs FROM t",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "vs": [1, 2, null] }]));
}

fn catalog_with_dupes() -> quillsql::Catalog {
	catalog(&[(
		"t",
		json!([{ "v": 1 }, { "v": 2 }, { "v": 1 }, { "v": null }]),
	)])
}

#[tokio::test]
async fn ungrouped_columns_bind_to_the_first_row() {
	let catalog = users();
	let rows = run(&catalog, "SELECT name, COUNT(*) AS c FROM users").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Alice", "c": 5 }]));
}

#[tokio::test]
async fn aggregate_arithmetic_in_the_projection() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT MAX(age) - MIN(age) AS spread, SUM(age) / COUNT(age) AS mean FROM users",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "spread": 16, "mean": 31.8 }]));
}
