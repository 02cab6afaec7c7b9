//! The recursive-descent SQL parser.
//!
//! Most functions peek one token and choose a production; [`Parser::expect`]
//! covers positions where only one token can be next, and clause-internal
//! soft keywords such as `NULLS FIRST` or the interval units match against
//! identifier text, so they stay usable as column names elsewhere.

use crate::err::Error;
use crate::fnc::Functions;
use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::sql::join::{Join, JoinKind};
use crate::sql::order::{NullsOrder, OrderItem};
use crate::sql::statement::SelectStatement;
use crate::sql::table::TableRef;
use crate::sql::with::Cte;
use crate::syn::lexer::Lexer;
use crate::syn::token::{Keyword, Span, Token, TokenKind};

mod expr;

/// The maximum nesting depth of subqueries and parenthesized
/// expressions.
const MAX_DEPTH: usize = 96;

pub(crate) struct Parser<'a> {
	lexer: Lexer<'a>,
	/// The token lookahead buffer with each token's decoded text; at
	/// most two tokens are ever buffered
	buffer: Vec<(Token, Option<String>)>,
	/// User functions, consulted so unknown names and arities fail at
	/// parse time
	functions: Option<&'a Functions>,
	depth: usize,
}

impl<'a> Parser<'a> {
	pub(crate) fn new(source: &'a str, functions: Option<&'a Functions>) -> Parser<'a> {
		Parser {
			lexer: Lexer::new(source),
			buffer: Vec::with_capacity(2),
			functions,
			depth: 0,
		}
	}

	/// Parse a complete statement: an optional WITH clause, the SELECT,
	/// an optional trailing semicolon, then the end of the source.
	pub(crate) fn parse_query(&mut self) -> Result<SelectStatement, Error> {
		let statement = self.parse_select_statement()?;
		self.eat(TokenKind::Semicolon)?;
		let (token, _) = self.next()?;
		if !token.is(TokenKind::Eof) {
			return Err(self.error(token.span, format!("unexpected {}", token.kind)));
		}
		Ok(statement)
	}

	// ------------------------------------------------------------------
	// Token plumbing
	// ------------------------------------------------------------------

	fn fill(&mut self, count: usize) -> Result<(), Error> {
		while self.buffer.len() < count {
			let token = self.lexer.next_token()?;
			let text = self.lexer.string.take();
			self.buffer.push((token, text));
		}
		Ok(())
	}

	fn next(&mut self) -> Result<(Token, Option<String>), Error> {
		self.fill(1)?;
		Ok(self.buffer.remove(0))
	}

	fn peek(&mut self) -> Result<Token, Error> {
		self.fill(1)?;
		Ok(self.buffer[0].0)
	}

	/// Consume the next token when it matches.
	fn eat(&mut self, kind: TokenKind) -> Result<bool, Error> {
		if self.peek()?.is(kind) {
			self.next()?;
			Ok(true)
		} else {
			Ok(false)
		}
	}

	fn eat_keyword(&mut self, keyword: Keyword) -> Result<bool, Error> {
		self.eat(TokenKind::Keyword(keyword))
	}

	/// Consume a soft keyword: an identifier with the given
	/// case-insensitive text.
	fn eat_soft_keyword(&mut self, word: &str) -> Result<bool, Error> {
		let token = self.peek()?;
		if token.is(TokenKind::Ident) {
			let matches = self.buffer[0]
				.1
				.as_deref()
				.is_some_and(|text| crate::sql::ident::same(text, word));
			if matches {
				self.next()?;
				return Ok(true);
			}
		}
		Ok(false)
	}

	fn expect(&mut self, kind: TokenKind) -> Result<(Token, Option<String>), Error> {
		let (token, text) = self.next()?;
		if !token.is(kind) {
			return Err(self.error(token.span, format!("expected {kind}, found {}", token.kind)));
		}
		Ok((token, text))
	}

	fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), Error> {
		self.expect(TokenKind::Keyword(keyword)).map(|_| ())
	}

	fn error(&self, span: Span, message: impl Into<String>) -> Error {
		let (line, column) = span.position(self.lexer.source());
		Error::Parse {
			message: message.into(),
			line,
			column,
		}
	}

	fn enter(&mut self, span: Span) -> Result<(), Error> {
		self.depth += 1;
		if self.depth > MAX_DEPTH {
			return Err(self.error(span, "the query nests too deeply"));
		}
		Ok(())
	}

	fn exit(&mut self) {
		self.depth -= 1;
	}

	/// The raw source text of a token, for numbers.
	fn token_text(&self, token: Token) -> &'a str {
		token.span.slice(self.lexer.source())
	}

	/// An identifier: bare or quoted.
	fn parse_ident(&mut self) -> Result<String, Error> {
		let (token, text) = self.next()?;
		match token.kind {
			TokenKind::Ident | TokenKind::QuotedIdent => {
				Ok(text.expect("identifier tokens carry their text"))
			}
			kind => Err(self.error(token.span, format!("expected an identifier, found {kind}"))),
		}
	}

	// ------------------------------------------------------------------
	// Statements
	// ------------------------------------------------------------------

	/// An optional WITH clause followed by a SELECT.
	fn parse_select_statement(&mut self) -> Result<SelectStatement, Error> {
		let with = if self.eat_keyword(Keyword::With)? {
			self.parse_with_clause()?
		} else {
			Vec::new()
		};
		let mut statement = self.parse_select_core()?;
		statement.with = with;
		Ok(statement)
	}

	fn parse_with_clause(&mut self) -> Result<Vec<Cte>, Error> {
		let mut ctes = Vec::new();
		loop {
			let name = self.parse_ident()?;
			self.expect_keyword(Keyword::As)?;
			let (open, _) = self.expect(TokenKind::LeftParen)?;
			self.enter(open.span)?;
			let select = self.parse_select_statement()?;
			self.exit();
			self.expect(TokenKind::RightParen)?;
			ctes.push(Cte {
				name,
				select,
			});
			if !self.eat(TokenKind::Comma)? {
				break;
			}
		}
		Ok(ctes)
	}

	fn parse_select_core(&mut self) -> Result<SelectStatement, Error> {
		self.expect_keyword(Keyword::Select)?;
		let distinct = self.eat_keyword(Keyword::Distinct)?;
		let fields = self.parse_fields()?;
		let from = if self.eat_keyword(Keyword::From)? {
			Some(self.parse_table_ref()?)
		} else {
			None
		};
		let mut joins = Vec::new();
		while let Some(kind) = self.parse_join_kind()? {
			let table = self.parse_table_ref()?;
			let on = if self.eat_keyword(Keyword::On)? {
				Some(self.parse_expr()?)
			} else {
				None
			};
			match kind {
				JoinKind::Positional => {
					if on.is_some() {
						let span = self.peek()?.span;
						return Err(
							self.error(span, "a POSITIONAL join does not take an ON condition")
						);
					}
				}
				_ => {
					if on.is_none() {
						let span = self.peek()?.span;
						return Err(self.error(span, format!("{kind} requires an ON condition")));
					}
				}
			}
			joins.push(Join {
				kind,
				table,
				on,
			});
		}
		let cond = if self.eat_keyword(Keyword::Where)? {
			Some(self.parse_expr()?)
		} else {
			None
		};
		let mut group = Vec::new();
		if self.eat_keyword(Keyword::Group)? {
			self.expect_keyword(Keyword::By)?;
			loop {
				group.push(self.parse_expr()?);
				if !self.eat(TokenKind::Comma)? {
					break;
				}
			}
		}
		let having = if self.eat_keyword(Keyword::Having)? {
			Some(self.parse_expr()?)
		} else {
			None
		};
		let mut order = Vec::new();
		if self.eat_keyword(Keyword::Order)? {
			self.expect_keyword(Keyword::By)?;
			loop {
				order.push(self.parse_order_item()?);
				if !self.eat(TokenKind::Comma)? {
					break;
				}
			}
		}
		let limit = if self.eat_keyword(Keyword::Limit)? {
			Some(self.parse_count("LIMIT")?)
		} else {
			None
		};
		let offset = if self.eat_keyword(Keyword::Offset)? {
			Some(self.parse_count("OFFSET")?)
		} else {
			None
		};
		Ok(SelectStatement {
			with: Vec::new(),
			distinct,
			fields,
			from,
			joins,
			cond,
			group,
			having,
			order,
			limit,
			offset,
		})
	}

	fn parse_fields(&mut self) -> Result<Vec<Field>, Error> {
		let mut fields = Vec::new();
		loop {
			if self.eat(TokenKind::Star)? {
				fields.push(Field::All);
			} else {
				let expr = self.parse_expr()?;
				let alias = self.parse_alias()?;
				fields.push(Field::Single {
					expr,
					alias,
				});
			}
			if !self.eat(TokenKind::Comma)? {
				break;
			}
		}
		Ok(fields)
	}

	/// `AS alias`, or a bare trailing identifier.
	fn parse_alias(&mut self) -> Result<Option<String>, Error> {
		if self.eat_keyword(Keyword::As)? {
			return self.parse_ident().map(Some);
		}
		let token = self.peek()?;
		if matches!(token.kind, TokenKind::Ident | TokenKind::QuotedIdent) {
			return self.parse_ident().map(Some);
		}
		Ok(None)
	}

	fn parse_table_ref(&mut self) -> Result<TableRef, Error> {
		let token = self.peek()?;
		if token.is(TokenKind::LeftParen) {
			let (open, _) = self.next()?;
			self.enter(open.span)?;
			let select = self.parse_select_statement()?;
			self.exit();
			self.expect(TokenKind::RightParen)?;
			match self.parse_alias()? {
				Some(alias) => Ok(TableRef::Derived {
					select: Box::new(select),
					alias,
				}),
				None => Err(self.error(open.span, "a derived table requires an alias")),
			}
		} else {
			let name = self.parse_ident()?;
			let alias = self.parse_alias()?;
			Ok(TableRef::Table {
				name,
				alias,
			})
		}
	}

	fn parse_join_kind(&mut self) -> Result<Option<JoinKind>, Error> {
		let kind = match self.peek()?.kind {
			TokenKind::Keyword(Keyword::Join) => {
				self.next()?;
				return Ok(Some(JoinKind::Inner));
			}
			TokenKind::Keyword(Keyword::Inner) => JoinKind::Inner,
			TokenKind::Keyword(Keyword::Left) => JoinKind::Left,
			TokenKind::Keyword(Keyword::Right) => JoinKind::Right,
			TokenKind::Keyword(Keyword::Full) => JoinKind::Full,
			TokenKind::Keyword(Keyword::Positional) => JoinKind::Positional,
			_ => return Ok(None),
		};
		// LEFT and RIGHT also name builtin functions; only a following
		// JOIN or OUTER makes them join kinds
		if matches!(kind, JoinKind::Left | JoinKind::Right) {
			let ahead = self.peek_second()?;
			if !matches!(
				ahead,
				TokenKind::Keyword(Keyword::Join) | TokenKind::Keyword(Keyword::Outer)
			) {
				return Ok(None);
			}
		}
		self.next()?;
		if !matches!(kind, JoinKind::Inner | JoinKind::Positional) {
			self.eat_keyword(Keyword::Outer)?;
		}
		self.expect_keyword(Keyword::Join)?;
		Ok(Some(kind))
	}

	/// Look one token past the current lookahead.
	fn peek_second(&mut self) -> Result<TokenKind, Error> {
		self.fill(2)?;
		Ok(self.buffer[1].0.kind)
	}

	fn parse_order_item(&mut self) -> Result<OrderItem, Error> {
		let expr = self.parse_expr()?;
		let ascending = if self.eat_keyword(Keyword::Desc)? {
			false
		} else {
			self.eat_keyword(Keyword::Asc)?;
			true
		};
		let nulls = if self.eat_soft_keyword("nulls")? {
			if self.eat_soft_keyword("first")? {
				Some(NullsOrder::First)
			} else if self.eat_soft_keyword("last")? {
				Some(NullsOrder::Last)
			} else {
				let span = self.peek()?.span;
				return Err(self.error(span, "expected FIRST or LAST after NULLS"));
			}
		} else {
			None
		};
		Ok(OrderItem {
			expr,
			ascending,
			nulls,
		})
	}

	/// A non-negative integer literal, for LIMIT and OFFSET.
	fn parse_count(&mut self, clause: &str) -> Result<usize, Error> {
		let (token, _) = self.expect(TokenKind::Number)?;
		let text = self.token_text(token);
		text.parse::<usize>().map_err(|_| {
			self.error(token.span, format!("{clause} takes a non-negative integer, got {text}"))
		})
	}

	pub(crate) fn parse_expr(&mut self) -> Result<Expr, Error> {
		self.parse_or()
	}
}
