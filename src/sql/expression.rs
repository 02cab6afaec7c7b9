use crate::dbs::env::QueryEnv;
use crate::dbs::subquery;
use crate::err::Error;
use crate::fnc;
use crate::fnc::operate;
use crate::sql::datetime::IntervalUnit;
use crate::sql::fmt::Fmt;
use crate::sql::function::{FunctionArg, FunctionCall};
use crate::sql::ident;
use crate::sql::kind::CastKind;
use crate::sql::operator::{BinaryOperator, UnaryOperator};
use crate::sql::statement::SelectStatement;
use crate::sql::value::Value;
use crate::tbl::row::Row;
use async_recursion::async_recursion;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A scalar expression tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Expr {
	/// A literal value
	Literal(Value),
	/// A column reference, optionally qualified with a table name
	Ident {
		table: Option<String>,
		name: String,
	},
	/// A binary operation
	Binary {
		l: Box<Expr>,
		o: BinaryOperator,
		r: Box<Expr>,
	},
	/// A unary operation
	Unary {
		o: UnaryOperator,
		v: Box<Expr>,
	},
	/// A function call
	Function(Box<FunctionCall>),
	/// CAST(expr AS type)
	Cast {
		expr: Box<Expr>,
		kind: CastKind,
	},
	/// A simple or searched CASE expression
	Case {
		operand: Option<Box<Expr>>,
		branches: Vec<(Expr, Expr)>,
		otherwise: Option<Box<Expr>>,
	},
	/// expr [NOT] BETWEEN low AND high
	Between {
		expr: Box<Expr>,
		negated: bool,
		low: Box<Expr>,
		high: Box<Expr>,
	},
	/// expr [NOT] IN (e1, e2, ...)
	InList {
		expr: Box<Expr>,
		negated: bool,
		list: Vec<Expr>,
	},
	/// expr [NOT] IN (SELECT ...)
	InSubquery {
		expr: Box<Expr>,
		negated: bool,
		select: Box<SelectStatement>,
	},
	/// EXISTS (SELECT ...)
	Exists {
		select: Box<SelectStatement>,
	},
	/// expr IS [NOT] NULL
	IsNull {
		expr: Box<Expr>,
		negated: bool,
	},
	/// expr [NOT] LIKE pattern
	Like {
		expr: Box<Expr>,
		negated: bool,
		pattern: Box<Expr>,
	},
	/// INTERVAL n UNIT, only valid as an operand of binary + or -
	Interval {
		value: Box<Expr>,
		unit: IntervalUnit,
	},
	/// A parenthesized scalar subquery
	Subquery(Box<SelectStatement>),
}

impl Expr {
	/// The name a bare column reference resolves through, when this
	/// expression is one.
	pub fn as_ident_name(&self) -> Option<&str> {
		match self {
			Expr::Ident {
				name,
				..
			} => Some(name.as_str()),
			_ => None,
		}
	}

	/// Whether this expression is, or contains, an aggregate function call
	/// outside of subqueries.
	pub fn contains_aggregate(&self) -> bool {
		match self {
			Expr::Function(f) => {
				f.is_aggregate() || f.args.iter().any(|a| match a {
					FunctionArg::Expr(e) => e.contains_aggregate(),
					FunctionArg::Star => false,
				})
			}
			Expr::Binary {
				l,
				r,
				..
			} => l.contains_aggregate() || r.contains_aggregate(),
			Expr::Unary {
				v,
				..
			} => v.contains_aggregate(),
			Expr::Cast {
				expr,
				..
			} => expr.contains_aggregate(),
			Expr::Case {
				operand,
				branches,
				otherwise,
			} => {
				operand.as_deref().map(Expr::contains_aggregate).unwrap_or(false)
					|| branches
						.iter()
						.any(|(c, v)| c.contains_aggregate() || v.contains_aggregate())
					|| otherwise.as_deref().map(Expr::contains_aggregate).unwrap_or(false)
			}
			Expr::Between {
				expr,
				low,
				high,
				..
			} => expr.contains_aggregate() || low.contains_aggregate() || high.contains_aggregate(),
			Expr::InList {
				expr,
				list,
				..
			} => expr.contains_aggregate() || list.iter().any(Expr::contains_aggregate),
			Expr::InSubquery {
				expr,
				..
			} => expr.contains_aggregate(),
			Expr::IsNull {
				expr,
				..
			} => expr.contains_aggregate(),
			Expr::Like {
				expr,
				pattern,
				..
			} => expr.contains_aggregate() || pattern.contains_aggregate(),
			Expr::Interval {
				value,
				..
			} => value.contains_aggregate(),
			Expr::Literal(_) | Expr::Ident { .. } | Expr::Exists { .. } | Expr::Subquery(_) => {
				false
			}
		}
	}

	/// Evaluate this expression against an optional row context.
	#[async_recursion]
	pub(crate) async fn compute(&self, env: &QueryEnv, row: Option<&Row>) -> Result<Value, Error> {
		match self {
			Expr::Literal(v) => Ok(v.clone()),
			Expr::Ident {
				table,
				name,
			} => {
				let row = row.ok_or_else(|| Error::UnknownColumn(self.to_string()))?;
				match table {
					Some(table) => {
						let qualified = format!("{table}.{name}");
						if let Some(cell) = row.cell(&qualified) {
							cell.value().await
						} else if let Some(cell) = row.cell(name) {
							cell.value().await
						} else {
							Err(Error::UnknownColumn(qualified))
						}
					}
					None => match row.cell(name) {
						Some(cell) => cell.value().await,
						None => Err(Error::UnknownColumn(name.clone())),
					},
				}
			}
			Expr::Binary {
				l,
				o,
				r,
			} => {
				// Date arithmetic is dispatched before the operands are
				// reduced, since a bare interval is not a value
				if let Expr::Interval {
					value,
					unit,
				} = r.as_ref()
				{
					return operate::date_arithmetic(
						l.compute(env, row).await?,
						value.compute(env, row).await?,
						*unit,
						*o,
					);
				}
				if let Expr::Interval {
					value,
					unit,
				} = l.as_ref()
				{
					if matches!(o, BinaryOperator::Add) {
						return operate::date_arithmetic(
							r.compute(env, row).await?,
							value.compute(env, row).await?,
							*unit,
							*o,
						);
					}
					return Err(Error::Unsupported(
						"an INTERVAL may only be added to or subtracted from a date".to_owned(),
					));
				}
				match o {
					BinaryOperator::And => {
						let l = l.compute(env, row).await?;
						if !l.is_null() && !l.is_truthy() {
							return Ok(Value::Bool(false));
						}
						let r = r.compute(env, row).await?;
						if !r.is_null() && !r.is_truthy() {
							return Ok(Value::Bool(false));
						}
						if l.is_null() || r.is_null() {
							return Ok(Value::Null);
						}
						Ok(Value::Bool(true))
					}
					BinaryOperator::Or => {
						let l = l.compute(env, row).await?;
						if !l.is_null() && l.is_truthy() {
							return Ok(Value::Bool(true));
						}
						let r = r.compute(env, row).await?;
						if !r.is_null() && r.is_truthy() {
							return Ok(Value::Bool(true));
						}
						if l.is_null() || r.is_null() {
							return Ok(Value::Null);
						}
						Ok(Value::Bool(false))
					}
					o => {
						let l = l.compute(env, row).await?;
						let r = r.compute(env, row).await?;
						operate::binary(l, *o, r)
					}
				}
			}
			Expr::Unary {
				o,
				v,
			} => {
				let v = v.compute(env, row).await?;
				match o {
					UnaryOperator::Neg => operate::neg(v),
					UnaryOperator::Not => operate::not(v),
				}
			}
			Expr::Function(f) => {
				if f.is_aggregate() {
					return Err(Error::Unsupported(format!(
						"aggregate function {}() is not allowed in this context",
						f.name
					)));
				}
				let mut args = Vec::with_capacity(f.args.len());
				for arg in f.args.iter() {
					match arg {
						FunctionArg::Star => {
							return Err(Error::Unsupported(format!("{}(*)", f.name)))
						}
						FunctionArg::Expr(e) => args.push(e.compute(env, row).await?),
					}
				}
				fnc::run(env, &f.name, args).await
			}
			Expr::Cast {
				expr,
				kind,
			} => {
				let v = expr.compute(env, row).await?;
				operate::cast(v, *kind)
			}
			Expr::Case {
				operand,
				branches,
				otherwise,
			} => {
				let operand = match operand {
					Some(e) => Some(e.compute(env, row).await?),
					None => None,
				};
				for (cond, result) in branches {
					let matched = match &operand {
						Some(operand) => {
							let cond = cond.compute(env, row).await?;
							operate::equal(operand.clone(), cond)?.is_truthy()
						}
						None => cond.compute(env, row).await?.is_truthy(),
					};
					if matched {
						return result.compute(env, row).await;
					}
				}
				match otherwise {
					Some(e) => e.compute(env, row).await,
					None => Ok(Value::Null),
				}
			}
			Expr::Between {
				expr,
				negated,
				low,
				high,
			} => {
				let v = expr.compute(env, row).await?;
				let low = low.compute(env, row).await?;
				let high = high.compute(env, row).await?;
				let ge = operate::binary(v.clone(), BinaryOperator::MoreThanOrEqual, low)?;
				let le = operate::binary(v, BinaryOperator::LessThanOrEqual, high)?;
				let result = match (ge, le) {
					(Value::Null, _) | (_, Value::Null) => Value::Null,
					(a, b) => Value::Bool(a.is_truthy() && b.is_truthy()),
				};
				if *negated {
					operate::not(result)
				} else {
					Ok(result)
				}
			}
			Expr::InList {
				expr,
				negated,
				list,
			} => {
				let v = expr.compute(env, row).await?;
				if v.is_null() {
					return Ok(Value::Null);
				}
				let mut saw_null = false;
				let mut found = false;
				for item in list {
					let item = item.compute(env, row).await?;
					if item.is_null() {
						saw_null = true;
						continue;
					}
					if operate::equal(v.clone(), item)?.is_truthy() {
						found = true;
						break;
					}
				}
				let result = if found {
					Value::Bool(true)
				} else if saw_null {
					Value::Null
				} else {
					Value::Bool(false)
				};
				if *negated {
					operate::not(result)
				} else {
					Ok(result)
				}
			}
			Expr::InSubquery {
				expr,
				negated,
				select,
			} => {
				let v = expr.compute(env, row).await?;
				if v.is_null() {
					return Ok(Value::Null);
				}
				let set = subquery::membership_set(env, select).await?;
				let result = if set.contains(&v.to_stable_key()) {
					Value::Bool(true)
				} else if set.saw_null() {
					Value::Null
				} else {
					Value::Bool(false)
				};
				if *negated {
					operate::not(result)
				} else {
					Ok(result)
				}
			}
			Expr::Exists {
				select,
			} => Ok(Value::Bool(subquery::exists(env, select).await?)),
			Expr::IsNull {
				expr,
				negated,
			} => {
				let v = expr.compute(env, row).await?;
				Ok(Value::Bool(v.is_null() != *negated))
			}
			Expr::Like {
				expr,
				negated,
				pattern,
			} => {
				let v = expr.compute(env, row).await?;
				let pattern = pattern.compute(env, row).await?;
				if v.is_null() || pattern.is_null() {
					return Ok(Value::Null);
				}
				let matched = operate::like(&v.to_raw_string(), &pattern.to_raw_string())?;
				Ok(Value::Bool(matched != *negated))
			}
			Expr::Interval {
				..
			} => Err(Error::Unsupported(
				"an INTERVAL may only be added to or subtracted from a date".to_owned(),
			)),
			Expr::Subquery(select) => subquery::scalar(env, select).await,
		}
	}
}

impl Display for Expr {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self {
			Expr::Literal(v) => Display::fmt(v, f),
			Expr::Ident {
				table,
				name,
			} => match table {
				Some(table) => write!(f, "{table}.{name}"),
				None => f.write_str(name),
			},
			Expr::Binary {
				l,
				o,
				r,
			} => write!(f, "{l} {o} {r}"),
			Expr::Unary {
				o,
				v,
			} => match o {
				UnaryOperator::Not => write!(f, "NOT {v}"),
				UnaryOperator::Neg => write!(f, "-{v}"),
			},
			Expr::Function(call) => Display::fmt(call, f),
			Expr::Cast {
				expr,
				kind,
			} => write!(f, "CAST({expr} AS {kind})"),
			Expr::Case {
				operand,
				branches,
				otherwise,
			} => {
				f.write_str("CASE")?;
				if let Some(operand) = operand {
					write!(f, " {operand}")?;
				}
				for (cond, result) in branches {
					write!(f, " WHEN {cond} THEN {result}")?;
				}
				if let Some(otherwise) = otherwise {
					write!(f, " ELSE {otherwise}")?;
				}
				f.write_str(" END")
			}
			Expr::Between {
				expr,
				negated,
				low,
				high,
			} => {
				if *negated {
					write!(f, "{expr} NOT BETWEEN {low} AND {high}")
				} else {
					write!(f, "{expr} BETWEEN {low} AND {high}")
				}
			}
			Expr::InList {
				expr,
				negated,
				list,
			} => {
				if *negated {
					write!(f, "{expr} NOT IN ({})", Fmt::comma_separated(list.iter()))
				} else {
					write!(f, "{expr} IN ({})", Fmt::comma_separated(list.iter()))
				}
			}
			Expr::InSubquery {
				expr,
				negated,
				select,
			} => {
				if *negated {
					write!(f, "{expr} NOT IN ({select})")
				} else {
					write!(f, "{expr} IN ({select})")
				}
			}
			Expr::Exists {
				select,
			} => write!(f, "EXISTS ({select})"),
			Expr::IsNull {
				expr,
				negated,
			} => {
				if *negated {
					write!(f, "{expr} IS NOT NULL")
				} else {
					write!(f, "{expr} IS NULL")
				}
			}
			Expr::Like {
				expr,
				negated,
				pattern,
			} => {
				if *negated {
					write!(f, "{expr} NOT LIKE {pattern}")
				} else {
					write!(f, "{expr} LIKE {pattern}")
				}
			}
			Expr::Interval {
				value,
				unit,
			} => write!(f, "INTERVAL {value} {unit}"),
			Expr::Subquery(select) => write!(f, "({select})"),
		}
	}
}

/// Walk every identifier referenced by this expression, skipping the
/// interiors of subqueries, which resolve against their own sources.
pub(crate) fn each_ident<'a>(expr: &'a Expr, f: &mut impl FnMut(Option<&'a str>, &'a str)) {
	match expr {
		Expr::Ident {
			table,
			name,
		} => f(table.as_deref(), name),
		Expr::Binary {
			l,
			r,
			..
		} => {
			each_ident(l, f);
			each_ident(r, f);
		}
		Expr::Unary {
			v,
			..
		} => each_ident(v, f),
		Expr::Function(call) => {
			for arg in call.args.iter() {
				if let FunctionArg::Expr(e) = arg {
					each_ident(e, f);
				}
			}
			if let Some(filter) = &call.filter {
				each_ident(filter, f);
			}
		}
		Expr::Cast {
			expr,
			..
		} => each_ident(expr, f),
		Expr::Case {
			operand,
			branches,
			otherwise,
		} => {
			if let Some(operand) = operand {
				each_ident(operand, f);
			}
			for (cond, result) in branches {
				each_ident(cond, f);
				each_ident(result, f);
			}
			if let Some(otherwise) = otherwise {
				each_ident(otherwise, f);
			}
		}
		Expr::Between {
			expr,
			low,
			high,
			..
		} => {
			each_ident(expr, f);
			each_ident(low, f);
			each_ident(high, f);
		}
		Expr::InList {
			expr,
			list,
			..
		} => {
			each_ident(expr, f);
			for item in list {
				each_ident(item, f);
			}
		}
		Expr::InSubquery {
			expr,
			..
		} => each_ident(expr, f),
		Expr::IsNull {
			expr,
			..
		} => each_ident(expr, f),
		Expr::Like {
			expr,
			pattern,
			..
		} => {
			each_ident(expr, f);
			each_ident(pattern, f);
		}
		Expr::Interval {
			value,
			..
		} => each_ident(value, f),
		Expr::Literal(_) | Expr::Exists { .. } | Expr::Subquery(_) => {}
	}
}

/// The default output name for an expression projected without an alias.
pub(crate) fn default_alias(expr: &Expr) -> String {
	match expr {
		Expr::Ident {
			name,
			..
		} => name.clone(),
		Expr::Function(call) => {
			if call.is_count_star() {
				return "count_all".to_owned();
			}
			let mut out = ident::normal(&call.name);
			for arg in call.args.iter() {
				if let FunctionArg::Expr(Expr::Ident {
					name,
					..
				}) = arg
				{
					out.push('_');
					out.push_str(name);
				}
			}
			out
		}
		Expr::Literal(v) => v.to_raw_string(),
		_ => "expr".to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::function::FunctionCall;

	fn ident(name: &str) -> Expr {
		Expr::Ident {
			table: None,
			name: name.to_owned(),
		}
	}

	#[test]
	fn default_aliases() {
		assert_eq!(default_alias(&ident("city")), "city");
		assert_eq!(default_alias(&Expr::Literal(Value::from(42))), "42");
		assert_eq!(default_alias(&Expr::Literal(Value::from("hi"))), "hi");
		let call = Expr::Function(Box::new(FunctionCall {
			name: "CONCAT".to_owned(),
			args: vec![
				FunctionArg::Expr(ident("a")),
				FunctionArg::Expr(Expr::Literal(Value::from("x"))),
				FunctionArg::Expr(ident("b")),
			],
			distinct: false,
			filter: None,
		}));
		assert_eq!(default_alias(&call), "concat_a_b");
		let agg = Expr::Function(Box::new(FunctionCall {
			name: "COUNT".to_owned(),
			args: vec![FunctionArg::Star],
			distinct: false,
			filter: None,
		}));
		assert_eq!(default_alias(&agg), "count_all");
		let op = Expr::Binary {
			l: Box::new(ident("a")),
			o: BinaryOperator::Add,
			r: Box::new(ident("b")),
		};
		assert_eq!(default_alias(&op), "expr");
	}

	#[test]
	fn rendering_round_trips_structure() {
		let e = Expr::Between {
			expr: Box::new(ident("age")),
			negated: true,
			low: Box::new(Expr::Literal(Value::from(18))),
			high: Box::new(Expr::Literal(Value::from(65))),
		};
		assert_eq!(e.to_string(), "age NOT BETWEEN 18 AND 65");
	}
}
