mod helpers;

use helpers::*;
use quillsql::Catalog;
use serde_json::json;

fn shop() -> Catalog {
	catalog(&[
		(
			"users",
			json!([
				{ "id": 1, "name": "Alice" },
				{ "id": 2, "name": "Bob" },
				{ "id": 3, "name": "Charlie" },
			]),
		),
		(
			"orders",
			json!([
				{ "oid": 10, "user_id": 1, "product": "book" },
				{ "oid": 11, "user_id": 2, "product": "pen" },
				{ "oid": 12, "user_id": 1, "product": "lamp" },
				{ "oid": 13, "user_id": 9, "product": "ghost" },
			]),
		),
	])
}

#[tokio::test]
async fn inner_join_matches_pairs_in_probe_order() {
	let catalog = shop();
	let rows = run(
		&catalog,
		"SELECT users.name, orders.product FROM users JOIN orders ON users.id = orders.user_id",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "name": "Alice", "product": "book" },
			{ "name": "Alice", "product": "lamp" },
			{ "name": "Bob", "product": "pen" },
		])
	);
}

#[tokio::test]
async fn left_join_pads_unmatched_rows_once() {
	let catalog = shop();
	let rows = run(
		&catalog,
		"SELECT users.name, orders.product FROM users LEFT JOIN orders ON users.id = orders.user_id",
	)
	.await
	.unwrap();
	let charlie: Vec<_> = rows
		.iter()
		.filter(|row| row.get("name") == Some(&quillsql::Value::from("Charlie")))
		.collect();
	assert_eq!(charlie.len(), 1);
	assert_eq!(charlie[0].get("product"), Some(&quillsql::Value::Null));
	assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn right_join_keeps_unmatched_build_rows() {
	let catalog = shop();
	let rows = run(
		&catalog,
		"SELECT users.name, orders.product FROM users RIGHT JOIN orders ON users.id = orders.user_id",
	)
	.await
	.unwrap();
	// The orphan order survives with a null user side, appended after
	// the matched pairs
	assert_eq!(rows.len(), 4);
	let last = rows.last().unwrap();
	assert_eq!(last.get("product"), Some(&quillsql::Value::from("ghost")));
	assert_eq!(last.get("name"), Some(&quillsql::Value::Null));
}

#[tokio::test]
async fn full_join_pads_both_sides() {
	let catalog = shop();
	let rows = run(
		&catalog,
		"SELECT users.name, orders.product FROM users FULL JOIN orders ON users.id = orders.user_id",
	)
	.await
	.unwrap();
	// Three matches, Charlie padded inline, the orphan order appended
	assert_eq!(rows.len(), 5);
	assert!(rows.iter().any(|r| {
		r.get("name") == Some(&quillsql::Value::from("Charlie"))
			&& r.get("product") == Some(&quillsql::Value::Null)
	}));
	assert!(rows.iter().any(|r| {
		r.get("name") == Some(&quillsql::Value::Null)
			&& r.get("product") == Some(&quillsql::Value::from("ghost"))
	}));
}

#[tokio::test]
async fn null_keys_never_match() {
	let catalog = catalog(&[
		("a", json!([{ "k": 1 }, { "k": null }])),
		("b", json!([{ "k": 1 }, { "k": null }])),
	]);
	let rows = run(&catalog, "SELECT a.k FROM a JOIN b ON a.k = b.k").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "k": 1 }]));
}

#[tokio::test]
async fn non_equi_conditions_run_through_the_nested_loop() {
	let catalog = catalog(&[
		("a", json!([{ "x": 1 }, { "x": 5 }])),
		("b", json!([{ "y": 3 }, { "y": 7 }])),
	]);
	let rows = run(&catalog, "SELECT a.x, b.y FROM a JOIN b ON a.x < b.y").await.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "x": 1, "y": 3 },
			{ "x": 1, "y": 7 },
			{ "x": 5, "y": 7 },
		])
	);
}

#[tokio::test]
async fn positional_join_pads_the_shorter_side() {
	let catalog = catalog(&[
		("a", json!([{ "x": 1 }, { "x": 2 }, { "x": 3 }])),
		("b", json!([{ "y": "p" }, { "y": "q" }])),
	]);
	let rows = run(&catalog, "SELECT a.x, b.y FROM a POSITIONAL JOIN b").await.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "x": 1, "y": "p" },
			{ "x": 2, "y": "q" },
			{ "x": 3, "y": null },
		])
	);
}

#[tokio::test]
async fn colliding_bare_columns_stay_reachable_qualified() {
	let catalog = catalog(&[
		("a", json!([{ "id": 1, "v": "left" }])),
		("b", json!([{ "id": 1, "v": "right" }])),
	]);
	// The bare name resolves to the later side; qualification reaches both
	let rows = run(
		&catalog,
		"SELECT v, a.v AS av, b.v AS bv FROM a JOIN b ON a.id = b.id",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "v": "right", "av": "left", "bv": "right" }]));
}

#[tokio::test]
async fn aliases_qualify_join_sides() {
	let catalog = shop();
	let rows = run(
		&catalog,
		"SELECT u.name, o.product FROM users AS u JOIN orders AS o ON u.id = o.user_id \
		 WHERE o.product = 'pen'",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Bob", "product": "pen" }]));
}

#[tokio::test]
async fn three_way_joins_chain() {
	let catalog = catalog(&[
		("a", json!([{ "id": 1, "n": "one" }])),
		("b", json!([{ "aid": 1, "cid": 7 }])),
		("c", json!([{ "id": 7, "tag": "seven" }])),
	]);
	let rows = run(
		&catalog,
		"SELECT a.n, c.tag FROM a \
		 JOIN b ON a.id = b.aid \
		 JOIN c ON b.cid = c.id",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "n": "one", "tag": "seven" }]));
}
