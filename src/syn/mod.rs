//! The tokenizer and parser.

use crate::err::Error;
use crate::fnc::Functions;
use crate::sql::statement::SelectStatement;

pub mod lexer;
pub(crate) mod parser;
pub mod token;

pub use self::token::{Keyword, Span, Token, TokenKind};

/// Tokenize a query string into its linear token stream, without the
/// trailing end-of-source marker.
pub fn tokenize(sql: &str) -> Result<Vec<Token>, Error> {
	let mut lexer = lexer::Lexer::new(sql);
	let mut tokens = Vec::new();
	loop {
		let token = lexer.next_token()?;
		if token.is(TokenKind::Eof) {
			return Ok(tokens);
		}
		tokens.push(token);
	}
}

/// Parse a SELECT statement.
pub fn parse(sql: &str) -> Result<SelectStatement, Error> {
	parser::Parser::new(sql, None).parse_query()
}

/// Parse a SELECT statement, resolving function names and arities
/// against the given user functions as well as the builtins.
pub fn parse_with(sql: &str, functions: &Functions) -> Result<SelectStatement, Error> {
	parser::Parser::new(sql, Some(functions)).parse_query()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::expression::Expr;
	use crate::sql::field::Field;
	use crate::sql::join::JoinKind;
	use crate::sql::operator::BinaryOperator;
	use crate::sql::order::NullsOrder;
	use crate::sql::table::TableRef;
	use crate::sql::value::Value;

	#[test]
	fn tokenize_reports_positions() {
		let tokens = tokenize("SELECT a FROM t").unwrap();
		assert_eq!(tokens.len(), 4);
		assert_eq!(tokens[1].span.position("SELECT a FROM t"), (1, 8));
	}

	#[test]
	fn parses_a_minimal_select() {
		let q = parse("SELECT * FROM users").unwrap();
		assert_eq!(q.fields, vec![Field::All]);
		assert!(matches!(q.from, Some(TableRef::Table { ref name, .. }) if name == "users"));
		assert!(q.cond.is_none());
	}

	#[test]
	fn parses_every_clause() {
		let q = parse(
			"WITH t AS (SELECT * FROM u) \
			 SELECT DISTINCT city, COUNT(*) AS c \
			 FROM t \
			 WHERE age > 25 AND name LIKE 'A%' \
			 GROUP BY city \
			 HAVING COUNT(*) > 1 \
			 ORDER BY c DESC NULLS LAST \
			 LIMIT 10 OFFSET 5;",
		)
		.unwrap();
		assert_eq!(q.with.len(), 1);
		assert!(crate::sql::ident::same(&q.with[0].name, "t"));
		assert!(q.distinct);
		assert_eq!(q.fields.len(), 2);
		assert_eq!(q.group.len(), 1);
		assert!(q.having.is_some());
		assert_eq!(q.order.len(), 1);
		assert!(!q.order[0].ascending);
		assert_eq!(q.order[0].nulls, Some(NullsOrder::Last));
		assert_eq!(q.limit, Some(10));
		assert_eq!(q.offset, Some(5));
	}

	#[test]
	fn parses_joins() {
		let q = parse(
			"SELECT * FROM a \
			 JOIN b ON a.id = b.id \
			 LEFT JOIN c ON a.id = c.id \
			 POSITIONAL JOIN d",
		)
		.unwrap();
		assert_eq!(q.joins.len(), 3);
		assert_eq!(q.joins[0].kind, JoinKind::Inner);
		assert_eq!(q.joins[1].kind, JoinKind::Left);
		assert_eq!(q.joins[2].kind, JoinKind::Positional);
		assert!(q.joins[2].on.is_none());
	}

	#[test]
	fn join_conditions_are_validated() {
		assert!(parse("SELECT * FROM a JOIN b").is_err());
		assert!(parse("SELECT * FROM a POSITIONAL JOIN b ON a.x = b.x").is_err());
	}

	#[test]
	fn left_stays_a_function_when_called() {
		let q = parse("SELECT LEFT(name, 2) FROM t").unwrap();
		let Field::Single {
			expr: Expr::Function(call),
			..
		} = &q.fields[0]
		else {
			panic!("expected a function call");
		};
		assert!(crate::sql::ident::same(&call.name, "left"));
	}

	#[test]
	fn operator_precedence() {
		let q = parse("SELECT * FROM t WHERE a OR b AND NOT c = 1 + 2 * 3").unwrap();
		let Some(Expr::Binary {
			o: BinaryOperator::Or,
			r,
			..
		}) = q.cond
		else {
			panic!("expected OR at the top");
		};
		let Expr::Binary {
			o: BinaryOperator::And,
			..
		} = *r
		else {
			panic!("expected AND under OR");
		};
	}

	#[test]
	fn arity_violations_carry_position_and_counts() {
		let err = parse("SELECT UPPER(a, b) FROM t").unwrap_err();
		let Error::Parse {
			message,
			line,
			column,
		} = err
		else {
			panic!("expected a parse error");
		};
		assert!(message.contains("UPPER() expects 1 arguments, got 2"), "{message}");
		assert_eq!((line, column), (1, 8));
	}

	#[test]
	fn unknown_functions_are_rejected_unless_registered() {
		assert!(matches!(
			parse("SELECT frobnicate(1) FROM t"),
			Err(Error::UnknownFunction(name)) if name == "frobnicate"
		));
		let mut functions = Functions::new();
		functions.register("frobnicate", |args, _ctx| async move {
			Ok(args.into_iter().next().unwrap_or(Value::Null))
		});
		assert!(parse_with("SELECT frobnicate(1) FROM t", &functions).is_ok());
	}

	#[test]
	fn star_arguments_are_count_only() {
		assert!(parse("SELECT COUNT(*) FROM t").is_ok());
		assert!(matches!(
			parse("SELECT SUM(*) FROM t"),
			Err(Error::Unsupported(msg)) if msg.contains("SUM(*)")
		));
	}

	#[test]
	fn bare_intervals_are_rejected() {
		assert!(parse("SELECT d + INTERVAL 1 DAY FROM t").is_ok());
		assert!(parse("SELECT d - INTERVAL 2 MONTH FROM t").is_ok());
		assert!(parse("SELECT INTERVAL 1 DAY FROM t").is_err());
		assert!(parse("SELECT * FROM t WHERE INTERVAL 1 DAY > d").is_err());
		assert!(parse("SELECT d * INTERVAL 1 DAY FROM t").is_err());
		assert!(parse("SELECT d + INTERVAL 1 fortnight FROM t").is_err());
	}

	#[test]
	fn filter_and_distinct_are_aggregate_only() {
		assert!(parse("SELECT COUNT(DISTINCT city) FROM t").is_ok());
		assert!(parse("SELECT COUNT(x) FILTER (WHERE x > 1) FROM t").is_ok());
		assert!(parse("SELECT UPPER(DISTINCT name) FROM t").is_err());
		assert!(parse("SELECT UPPER(name) FILTER (WHERE x) FROM t").is_err());
	}

	#[test]
	fn derived_tables_require_aliases() {
		assert!(parse("SELECT * FROM (SELECT * FROM t) AS d").is_ok());
		assert!(parse("SELECT * FROM (SELECT * FROM t)").is_err());
	}

	#[test]
	fn quoted_identifiers_preserve_their_text() {
		let q = parse("SELECT \"First Name\" FROM \"My Table\"").unwrap();
		let Field::Single {
			expr: Expr::Ident {
				name,
				..
			},
			..
		} = &q.fields[0]
		else {
			panic!("expected an identifier");
		};
		assert_eq!(name, "First Name");
	}

	#[test]
	fn case_expressions() {
		let q = parse(
			"SELECT CASE WHEN a > 1 THEN 'big' ELSE 'small' END, \
			        CASE a WHEN 1 THEN 'one' END \
			 FROM t",
		)
		.unwrap();
		assert_eq!(q.fields.len(), 2);
	}

	#[test]
	fn in_list_and_subquery_forms() {
		let q = parse("SELECT * FROM t WHERE a IN (1, 2, 3)").unwrap();
		assert!(matches!(q.cond, Some(Expr::InList { .. })));
		let q = parse("SELECT * FROM t WHERE a NOT IN (SELECT b FROM u)").unwrap();
		assert!(matches!(
			q.cond,
			Some(Expr::InSubquery {
				negated: true,
				..
			})
		));
	}

	#[test]
	fn statement_rendering_round_trips() {
		let sql = "SELECT name AS n FROM users WHERE age > 25 ORDER BY n LIMIT 3";
		let q = parse(sql).unwrap();
		let rendered = q.to_string();
		let reparsed = parse(&rendered).unwrap();
		assert_eq!(q, reparsed);
	}
}
