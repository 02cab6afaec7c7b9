mod helpers;

use helpers::*;
use quillsql::{Error, Functions, Value};
use serde_json::json;

#[tokio::test]
async fn row_errors_carry_the_input_ordinal() {
	let catalog = catalog(&[("d", json!([{ "val": 1 }, { "val": 0 }]))]);
	let err = run(&catalog, "SELECT SUBSTRING('hello', val, 2) FROM d").await.unwrap_err();
	let message = err.to_string();
	assert!(
		message.contains("start position must be a positive integer, got 0"),
		"{message}"
	);
	assert!(message.contains("(row 2)"), "{message}");
}

#[tokio::test]
async fn polygon_containment_includes_the_boundary() {
	let catalog = quillsql::Catalog::new();
	let sql = |point: &str| {
		format!(
			"SELECT ST_Contains(\
			 ST_GeomFromText('POLYGON ((0 0, 10 0, 10 10, 0 10, 0 0))'), \
			 ST_GeomFromText('POINT ({point})')) AS hit"
		)
	};
	let rows = run(&catalog, &sql("5 5")).await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "hit": true }]));
	let rows = run(&catalog, &sql("50 50")).await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "hit": false }]));
	let rows = run(&catalog, &sql("0 5")).await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "hit": true }]));
}

#[tokio::test]
async fn spatial_predicates_over_table_geometries() {
	let catalog = catalog(&[(
		"places",
		json!([
			{ "name": "inside", "wkt": "POINT (3 3)" },
			{ "name": "outside", "wkt": "POINT (30 30)" },
			{ "name": "edge", "wkt": "POINT (0 3)" },
		]),
	)]);
	let rows = run(
		&catalog,
		"SELECT name FROM places \
		 WHERE ST_Within(ST_GeomFromText(wkt), ST_MakeEnvelope(0, 0, 10, 10)) \
		 ORDER BY name",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "edge" }, { "name": "inside" }]));
	let rows = run(
		&catalog,
		"SELECT ST_DWithin(ST_GeomFromText('POINT (0 0)'), ST_GeomFromText('POINT (3 4)'), 5) AS near",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "near": true }]));
}

#[tokio::test]
async fn string_functions_compose() {
	let catalog = users();
	let rows = run(
		&catalog,
		"SELECT CONCAT(LEFT(name, 1), '.') AS initial, \
		        REPLACE(LOWER(city), 'nyc', 'new york') AS where_from, \
		        INSTR(name, 'li') AS pos \
		 FROM users ORDER BY id LIMIT 2",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([
			{ "initial": "A.", "where_from": "new york", "pos": 2 },
			{ "initial": "B.", "where_from": "la", "pos": 0 },
		])
	);
}

#[tokio::test]
async fn regexp_functions_take_position_and_occurrence() {
	let catalog = quillsql::Catalog::new();
	let rows = run(
		&catalog,
		"SELECT REGEXP_SUBSTR('a1b22c333', '[0-9]+', 1, 3) AS third, \
		        REGEXP_REPLACE('a1b2c3', '[0-9]', '#', 1, 2) AS second",
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "third": "333", "second": "a1b#c3" }]));
}

#[tokio::test]
async fn like_translates_wildcards() {
	let catalog = users();
	let rows = run(&catalog, "SELECT name FROM users WHERE name LIKE 'A%'").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Alice" }]));
	let rows = run(&catalog, "SELECT name FROM users WHERE name LIKE '_ob'").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Bob" }]));
	let rows =
		run(&catalog, "SELECT name FROM users WHERE name NOT LIKE '%e%' ORDER BY name").await.unwrap();
	assert_eq!(as_json(&rows), json!([{ "name": "Bob" }, { "name": "Dana" }]));
}

#[tokio::test]
async fn interval_arithmetic_preserves_formats() {
	let catalog = catalog(&[(
		"t",
		json!([{ "d": "2024-01-31", "ts": "2024-03-01T10:30:00.250Z" }]),
	)]);
	let rows = run(
		&catalog,
		"SELECT d + INTERVAL 1 MONTH AS next_month, \
		        d - INTERVAL 2 DAY AS earlier, \
		        ts + INTERVAL 90 MINUTE AS later \
		 FROM t",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([{
			"next_month": "2024-02-29",
			"earlier": "2024-01-29",
			"later": "2024-03-01T12:00:00.250Z",
		}])
	);
}

#[tokio::test]
async fn division_by_zero_and_null_propagation() {
	let catalog = catalog(&[("t", json!([{ "a": 10, "b": 0, "c": null }]))]);
	let rows = run(
		&catalog,
		"SELECT a / b AS div_zero, a % b AS rem_zero, a + c AS plus_null FROM t",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([{ "div_zero": null, "rem_zero": null, "plus_null": null }])
	);
}

#[tokio::test]
async fn cast_failures_describe_the_value() {
	let catalog = catalog(&[("t", json!([{ "v": "abc" }]))]);
	let err = run(&catalog, "SELECT CAST(v AS INTEGER) FROM t").await.unwrap_err();
	assert!(err.to_string().contains("Cannot cast 'abc' to INTEGER"), "{err}");
}

#[tokio::test]
async fn json_functions_navigate_documents() {
	let catalog = catalog(&[(
		"t",
		json!([{ "doc": { "user": { "name": "ada" }, "tags": ["x", "y"] } }]),
	)]);
	let rows = run(
		&catalog,
		"SELECT JSON_VALUE(doc, '$.user.name') AS who, \
		        JSON_VALUE(doc, '$.tags[1]') AS tag, \
		        JSON_OBJECT('a', 1, 'b', 'two') AS built \
		 FROM t",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([{ "who": "ada", "tag": "y", "built": { "a": 1, "b": "two" } }])
	);
}

#[tokio::test]
async fn user_functions_override_builtins() {
	let mut functions = Functions::new();
	functions.register("upper", |args, _ctx| async move {
		let input = args.into_iter().next().unwrap_or(Value::Null);
		Ok(Value::from(format!("custom:{}", input.to_raw_string())))
	});
	functions.register("shout", |args, _ctx| async move {
		let input = args.into_iter().next().unwrap_or(Value::Null);
		Ok(Value::from(format!("{}!", input.to_raw_string().to_uppercase())))
	});
	let rows = quillsql::collect(
		quillsql::execute(
			"SELECT UPPER(name) AS u, shout(name) AS s FROM users LIMIT 1",
			quillsql::ExecuteOptions::new(users()).with_functions(functions),
		)
		.unwrap(),
	)
	.await
	.unwrap();
	assert_eq!(as_json(&rows), json!([{ "u": "custom:Alice", "s": "ALICE!" }]));
}

#[tokio::test]
async fn math_and_trig_round_trip() {
	let catalog = quillsql::Catalog::new();
	let rows = run(
		&catalog,
		"SELECT FLOOR(2.7) AS f, CEIL(2.1) AS c, ROUND(2.5) AS r, ABS(-3) AS a, \
		        SIGN(-9) AS s, MOD(7, 4) AS m, POWER(2, 10) AS p, \
		        ROUND(DEGREES(RADIANS(90))) AS deg",
	)
	.await
	.unwrap();
	assert_eq!(
		as_json(&rows),
		json!([{ "f": 2, "c": 3, "r": 3, "a": 3, "s": -1, "m": 3.0, "p": 1024.0, "deg": 90 }])
	);
}

#[tokio::test]
async fn current_date_functions_return_datetimes() {
	let catalog = quillsql::Catalog::new();
	let rows = run(&catalog, "SELECT CURRENT_DATE() AS d, CURRENT_TIMESTAMP() AS ts")
		.await
		.unwrap();
	let Some(Value::Datetime(d)) = rows[0].get("d") else {
		panic!("expected a date");
	};
	assert_eq!(d.as_str().len(), "2026-01-01".len());
	let Some(Value::Datetime(ts)) = rows[0].get("ts") else {
		panic!("expected a timestamp");
	};
	assert!(ts.as_str().ends_with('Z'));
}

#[tokio::test]
async fn unsupported_star_arguments_error() {
	let catalog = users();
	assert!(matches!(
		run(&catalog, "SELECT SUM(*) FROM users").await,
		Err(Error::Unsupported(message)) if message.contains("SUM(*)")
	));
}
