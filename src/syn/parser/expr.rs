//! Expression parsing, from OR at the loosest binding down to primaries.

use crate::err::Error;
use crate::fnc;
use crate::sql::datetime::IntervalUnit;
use crate::sql::expression::Expr;
use crate::sql::function::{FunctionArg, FunctionCall};
use crate::sql::kind::CastKind;
use crate::sql::number::Number;
use crate::sql::operator::{BinaryOperator, UnaryOperator};
use crate::sql::value::Value;
use crate::syn::parser::Parser;
use crate::syn::token::{Keyword, Span, TokenKind};

impl<'a> Parser<'a> {
	pub(super) fn parse_or(&mut self) -> Result<Expr, Error> {
		let mut lhs = self.parse_and()?;
		loop {
			let token = self.peek()?;
			let is_or = token.is_keyword(Keyword::Or) || token.is(TokenKind::OrOr);
			if !is_or {
				return Ok(lhs);
			}
			self.next()?;
			let rhs = self.parse_and()?;
			lhs = Expr::Binary {
				l: Box::new(lhs),
				o: BinaryOperator::Or,
				r: Box::new(rhs),
			};
		}
	}

	fn parse_and(&mut self) -> Result<Expr, Error> {
		let mut lhs = self.parse_not()?;
		while self.eat_keyword(Keyword::And)? {
			let rhs = self.parse_not()?;
			lhs = Expr::Binary {
				l: Box::new(lhs),
				o: BinaryOperator::And,
				r: Box::new(rhs),
			};
		}
		Ok(lhs)
	}

	fn parse_not(&mut self) -> Result<Expr, Error> {
		if self.eat_keyword(Keyword::Not)? {
			let v = self.parse_not()?;
			return Ok(Expr::Unary {
				o: UnaryOperator::Not,
				v: Box::new(v),
			});
		}
		self.parse_comparison()
	}

	/// A single, non-chaining comparison: the operator set plus IS, IN,
	/// LIKE and BETWEEN with their NOT forms.
	fn parse_comparison(&mut self) -> Result<Expr, Error> {
		let start = self.peek()?.span;
		let lhs = self.parse_additive()?;
		self.deny_bare_interval(&lhs, start)?;
		let token = self.peek()?;
		let op = match token.kind {
			TokenKind::Equal => Some(BinaryOperator::Equal),
			TokenKind::NotEqual => Some(BinaryOperator::NotEqual),
			TokenKind::LessThan => Some(BinaryOperator::LessThan),
			TokenKind::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
			TokenKind::MoreThan => Some(BinaryOperator::MoreThan),
			TokenKind::MoreThanOrEqual => Some(BinaryOperator::MoreThanOrEqual),
			_ => None,
		};
		if let Some(op) = op {
			self.next()?;
			let rhs_start = self.peek()?.span;
			let rhs = self.parse_additive()?;
			self.deny_bare_interval(&rhs, rhs_start)?;
			return Ok(Expr::Binary {
				l: Box::new(lhs),
				o: op,
				r: Box::new(rhs),
			});
		}
		if token.is_keyword(Keyword::Is) {
			self.next()?;
			let negated = self.eat_keyword(Keyword::Not)?;
			self.expect_keyword(Keyword::Null)?;
			return Ok(Expr::IsNull {
				expr: Box::new(lhs),
				negated,
			});
		}
		let negated = if token.is_keyword(Keyword::Not) {
			// Only IN, LIKE or BETWEEN may follow here; a prefix NOT was
			// already consumed at the NOT precedence level
			self.next()?;
			true
		} else {
			false
		};
		let token = self.peek()?;
		if token.is_keyword(Keyword::In) {
			self.next()?;
			return self.parse_in_rhs(lhs, negated);
		}
		if token.is_keyword(Keyword::Like) {
			self.next()?;
			let pattern_start = self.peek()?.span;
			let pattern = self.parse_additive()?;
			self.deny_bare_interval(&pattern, pattern_start)?;
			return Ok(Expr::Like {
				expr: Box::new(lhs),
				negated,
				pattern: Box::new(pattern),
			});
		}
		if token.is_keyword(Keyword::Between) {
			self.next()?;
			let low_start = self.peek()?.span;
			let low = self.parse_additive()?;
			self.deny_bare_interval(&low, low_start)?;
			self.expect_keyword(Keyword::And)?;
			let high_start = self.peek()?.span;
			let high = self.parse_additive()?;
			self.deny_bare_interval(&high, high_start)?;
			return Ok(Expr::Between {
				expr: Box::new(lhs),
				negated,
				low: Box::new(low),
				high: Box::new(high),
			});
		}
		if negated {
			return Err(
				self.error(token.span, "expected IN, LIKE or BETWEEN after NOT")
			);
		}
		Ok(lhs)
	}

	/// The parenthesized tail of `expr IN ...`: a value list or a
	/// subquery.
	fn parse_in_rhs(&mut self, lhs: Expr, negated: bool) -> Result<Expr, Error> {
		let (open, _) = self.expect(TokenKind::LeftParen)?;
		self.enter(open.span)?;
		let result = if self.peek_is_subquery()? {
			let select = self.parse_select_statement()?;
			Expr::InSubquery {
				expr: Box::new(lhs),
				negated,
				select: Box::new(select),
			}
		} else {
			let mut list = Vec::new();
			loop {
				list.push(self.parse_expr()?);
				if !self.eat(TokenKind::Comma)? {
					break;
				}
			}
			Expr::InList {
				expr: Box::new(lhs),
				negated,
				list,
			}
		};
		self.exit();
		self.expect(TokenKind::RightParen)?;
		Ok(result)
	}

	fn peek_is_subquery(&mut self) -> Result<bool, Error> {
		let token = self.peek()?;
		Ok(token.is_keyword(Keyword::Select) || token.is_keyword(Keyword::With))
	}

	fn parse_additive(&mut self) -> Result<Expr, Error> {
		let mut lhs = self.parse_multiplicative()?;
		loop {
			let op = match self.peek()?.kind {
				TokenKind::Plus => BinaryOperator::Add,
				TokenKind::Minus => BinaryOperator::Sub,
				_ => return Ok(lhs),
			};
			self.next()?;
			let rhs = self.parse_multiplicative()?;
			lhs = Expr::Binary {
				l: Box::new(lhs),
				o: op,
				r: Box::new(rhs),
			};
		}
	}

	fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
		let start = self.peek()?.span;
		let mut lhs = self.parse_unary()?;
		loop {
			let op = match self.peek()?.kind {
				TokenKind::Star => BinaryOperator::Mul,
				TokenKind::Slash => BinaryOperator::Div,
				TokenKind::Percent => BinaryOperator::Rem,
				_ => return Ok(lhs),
			};
			self.deny_bare_interval(&lhs, start)?;
			self.next()?;
			let rhs_start = self.peek()?.span;
			let rhs = self.parse_unary()?;
			self.deny_bare_interval(&rhs, rhs_start)?;
			lhs = Expr::Binary {
				l: Box::new(lhs),
				o: op,
				r: Box::new(rhs),
			};
		}
	}

	fn parse_unary(&mut self) -> Result<Expr, Error> {
		let token = self.peek()?;
		match token.kind {
			TokenKind::Minus => {
				self.next()?;
				let start = self.peek()?.span;
				let v = self.parse_unary()?;
				self.deny_bare_interval(&v, start)?;
				Ok(Expr::Unary {
					o: UnaryOperator::Neg,
					v: Box::new(v),
				})
			}
			// A unary plus is absorbed
			TokenKind::Plus => {
				self.next()?;
				self.parse_unary()
			}
			_ => self.parse_primary(),
		}
	}

	fn parse_primary(&mut self) -> Result<Expr, Error> {
		let token = self.peek()?;
		match token.kind {
			TokenKind::Number => {
				let (token, _) = self.next()?;
				let text = self.token_text(token);
				match Number::try_from(text) {
					Ok(number) => Ok(Expr::Literal(Value::Number(number))),
					Err(()) => {
						Err(self.error(token.span, format!("invalid numeric literal {text}")))
					}
				}
			}
			TokenKind::String => {
				let (_, text) = self.next()?;
				Ok(Expr::Literal(Value::from(text.expect("string tokens carry their text"))))
			}
			TokenKind::Keyword(Keyword::True) => {
				self.next()?;
				Ok(Expr::Literal(Value::Bool(true)))
			}
			TokenKind::Keyword(Keyword::False) => {
				self.next()?;
				Ok(Expr::Literal(Value::Bool(false)))
			}
			TokenKind::Keyword(Keyword::Null) => {
				self.next()?;
				Ok(Expr::Literal(Value::Null))
			}
			TokenKind::Keyword(Keyword::Case) => self.parse_case(),
			TokenKind::Keyword(Keyword::Cast) => self.parse_cast(),
			TokenKind::Keyword(Keyword::Exists) => {
				self.next()?;
				let (open, _) = self.expect(TokenKind::LeftParen)?;
				self.enter(open.span)?;
				let select = self.parse_select_statement()?;
				self.exit();
				self.expect(TokenKind::RightParen)?;
				Ok(Expr::Exists {
					select: Box::new(select),
				})
			}
			TokenKind::Keyword(Keyword::Interval) => self.parse_interval(),
			// LEFT and RIGHT are reserved for joins but also name builtins
			TokenKind::Keyword(k @ (Keyword::Left | Keyword::Right)) => {
				let (token, _) = self.next()?;
				if self.peek()?.is(TokenKind::LeftParen) {
					self.parse_function_call(k.as_str().to_owned(), token.span)
				} else {
					Err(self.error(token.span, format!("unexpected {}", token.kind)))
				}
			}
			TokenKind::LeftParen => {
				let (open, _) = self.next()?;
				self.enter(open.span)?;
				let result = if self.peek_is_subquery()? {
					Expr::Subquery(Box::new(self.parse_select_statement()?))
				} else {
					self.parse_expr()?
				};
				self.exit();
				self.expect(TokenKind::RightParen)?;
				Ok(result)
			}
			TokenKind::Ident | TokenKind::QuotedIdent => {
				let (token, text) = self.next()?;
				let name = text.expect("identifier tokens carry their text");
				if self.peek()?.is(TokenKind::LeftParen) {
					return self.parse_function_call(name, token.span);
				}
				if self.eat(TokenKind::Dot)? {
					let column = self.parse_ident()?;
					return Ok(Expr::Ident {
						table: Some(name),
						name: column,
					});
				}
				Ok(Expr::Ident {
					table: None,
					name,
				})
			}
			kind => Err(self.error(token.span, format!("unexpected {kind}"))),
		}
	}

	/// `name(...)` with eager arity validation against the builtin
	/// descriptor table. A registered user function of the same name
	/// overrides the builtin, including its arity rules.
	fn parse_function_call(&mut self, name: String, name_span: Span) -> Result<Expr, Error> {
		self.expect(TokenKind::LeftParen)?;
		let user_defined = self.functions.is_some_and(|f| f.contains(&name));
		let descriptor = fnc::descriptor(&name);
		if !user_defined && descriptor.is_none() {
			return Err(Error::UnknownFunction(name));
		}
		let aggregate = !user_defined && descriptor.is_some_and(|d| d.aggregate);
		let distinct = self.eat_keyword(Keyword::Distinct)?;
		if distinct && !aggregate {
			return Err(self.error(
				name_span,
				format!("DISTINCT is only valid in aggregate functions, not {name}()"),
			));
		}
		let mut args = Vec::new();
		if self.peek()?.is(TokenKind::Star) {
			let (star, _) = self.next()?;
			if distinct {
				return Err(self.error(star.span, format!("{name}(DISTINCT *) is not valid")));
			}
			match descriptor {
				Some(d) if d.star && !user_defined => args.push(FunctionArg::Star),
				_ => return Err(Error::Unsupported(format!("{name}(*)"))),
			}
		} else if !self.peek()?.is(TokenKind::RightParen) {
			loop {
				args.push(FunctionArg::Expr(self.parse_expr()?));
				if !self.eat(TokenKind::Comma)? {
					break;
				}
			}
		}
		self.expect(TokenKind::RightParen)?;
		if !user_defined && !matches!(args.first(), Some(FunctionArg::Star)) {
			let descriptor = descriptor.expect("unknown builtins were rejected above");
			if !descriptor.arity.accepts(args.len()) {
				return Err(self.error(
					name_span,
					format!(
						"{name}() expects {} arguments, got {}",
						descriptor.arity,
						args.len()
					),
				));
			}
		}
		let filter = if self.eat_soft_keyword("filter")? {
			if !aggregate {
				return Err(self.error(
					name_span,
					format!("FILTER is only valid on aggregate functions, not {name}()"),
				));
			}
			let (open, _) = self.expect(TokenKind::LeftParen)?;
			self.enter(open.span)?;
			self.expect_keyword(Keyword::Where)?;
			let filter = self.parse_expr()?;
			self.exit();
			self.expect(TokenKind::RightParen)?;
			Some(filter)
		} else {
			None
		};
		Ok(Expr::Function(Box::new(FunctionCall {
			name,
			args,
			distinct,
			filter,
		})))
	}

	fn parse_case(&mut self) -> Result<Expr, Error> {
		let (case, _) = self.next()?;
		self.enter(case.span)?;
		let operand = if self.peek()?.is_keyword(Keyword::When) {
			None
		} else {
			Some(Box::new(self.parse_expr()?))
		};
		let mut branches = Vec::new();
		while self.eat_keyword(Keyword::When)? {
			let cond = self.parse_expr()?;
			self.expect_keyword(Keyword::Then)?;
			let result = self.parse_expr()?;
			branches.push((cond, result));
		}
		if branches.is_empty() {
			self.exit();
			return Err(self.error(case.span, "a CASE expression requires at least one WHEN"));
		}
		let otherwise = if self.eat_keyword(Keyword::Else)? {
			Some(Box::new(self.parse_expr()?))
		} else {
			None
		};
		self.expect_keyword(Keyword::End)?;
		self.exit();
		Ok(Expr::Case {
			operand,
			branches,
			otherwise,
		})
	}

	fn parse_cast(&mut self) -> Result<Expr, Error> {
		let (cast, _) = self.next()?;
		self.enter(cast.span)?;
		self.expect(TokenKind::LeftParen)?;
		let expr = self.parse_expr()?;
		self.expect_keyword(Keyword::As)?;
		let (type_token, text) = self.next()?;
		let type_name = match type_token.kind {
			TokenKind::Ident | TokenKind::QuotedIdent => {
				text.expect("identifier tokens carry their text")
			}
			kind => {
				self.exit();
				return Err(self.error(type_token.span, format!("expected a type name, found {kind}")));
			}
		};
		let kind = CastKind::from_name(&type_name)
			.map_err(|_| self.error(type_token.span, format!("unknown cast target type {type_name}")))?;
		self.expect(TokenKind::RightParen)?;
		self.exit();
		Ok(Expr::Cast {
			expr: Box::new(expr),
			kind,
		})
	}

	/// `INTERVAL n UNIT`. The parser only admits the result as an
	/// operand of binary + or -, which [`Parser::deny_bare_interval`]
	/// enforces at every other consumption point.
	fn parse_interval(&mut self) -> Result<Expr, Error> {
		self.next()?;
		let (token, _) = self.expect(TokenKind::Number)?;
		let text = self.token_text(token);
		let value = match Number::try_from(text) {
			Ok(n @ Number::Int(_)) => Expr::Literal(Value::Number(n)),
			_ => {
				return Err(
					self.error(token.span, format!("an interval takes an integer, got {text}"))
				)
			}
		};
		let (unit_token, unit_text) = self.next()?;
		let unit_text = match unit_token.kind {
			TokenKind::Ident => unit_text.expect("identifier tokens carry their text"),
			kind => {
				return Err(self.error(unit_token.span, format!("expected an interval unit, found {kind}")))
			}
		};
		let unit = match crate::sql::ident::normal(&unit_text).as_str() {
			"day" => IntervalUnit::Day,
			"month" => IntervalUnit::Month,
			"year" => IntervalUnit::Year,
			"hour" => IntervalUnit::Hour,
			"minute" => IntervalUnit::Minute,
			"second" => IntervalUnit::Second,
			_ => {
				return Err(self.error(
					unit_token.span,
					format!("unknown interval unit {unit_text}; expected DAY, MONTH, YEAR, HOUR, MINUTE or SECOND"),
				))
			}
		};
		Ok(Expr::Interval {
			value: Box::new(value),
			unit,
		})
	}

	/// A bare `INTERVAL n UNIT` is not a value; it may only sit directly
	/// under a binary + or -.
	fn deny_bare_interval(&self, expr: &Expr, span: Span) -> Result<(), Error> {
		if matches!(expr, Expr::Interval { .. }) {
			return Err(self.error(
				span,
				"an INTERVAL may only be added to or subtracted from a date",
			));
		}
		Ok(())
	}
}
