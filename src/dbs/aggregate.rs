//! Single-pass streaming aggregation: group keys are the canonical
//! stable serialization of the group-by tuple, every aggregate call in
//! the projection and HAVING accumulates per group, and emission
//! rewrites those calls into their finalized values before evaluating
//! the projection against the group's first row.

use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::dbs::project::lazy_cell;
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::sql::function::{FunctionArg, FunctionCall};
use crate::sql::ident;
use crate::sql::number::Number;
use crate::sql::value::Value;
use crate::tbl::row::{Row, Schema};
use ahash::HashMap;
use ahash::HashMapExt;
use ahash::HashSet;
use ahash::HashSetExt;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct Aggregate {
	child: BoxOperator,
	fields: Vec<Field>,
	group: Vec<Expr>,
	having: Option<Expr>,
	state: AggState,
}

enum AggState {
	Init,
	Emitting(VecDeque<Row>),
	Done,
}

/// One distinct aggregate call appearing in the projection or HAVING,
/// identified by its rendered text.
struct AggSpec {
	key: String,
	call: FunctionCall,
}

struct Group {
	first_row: Option<Row>,
	accumulators: Vec<Accumulator>,
}

impl Aggregate {
	pub(crate) fn new(
		child: BoxOperator,
		fields: Vec<Field>,
		group: Vec<Expr>,
		having: Option<Expr>,
	) -> Aggregate {
		Aggregate {
			child,
			fields,
			group,
			having,
			state: AggState::Init,
		}
	}

	fn collect_specs(&self) -> Result<Vec<AggSpec>, Error> {
		let mut specs: Vec<AggSpec> = Vec::new();
		let mut push = |call: &FunctionCall| {
			let key = call.to_string();
			if !specs.iter().any(|s| s.key == key) {
				specs.push(AggSpec {
					key,
					call: call.clone(),
				});
			}
		};
		for field in &self.fields {
			if let Field::Single {
				expr,
				..
			} = field
			{
				collect_aggregates(expr, &mut push);
			}
		}
		if let Some(having) = &self.having {
			collect_aggregates(having, &mut push);
		}
		// Fail early on shapes the accumulators cannot carry
		for spec in &specs {
			Accumulator::build(&spec.call)?;
		}
		Ok(specs)
	}

	async fn run(&mut self, env: &QueryEnv) -> Result<VecDeque<Row>, Error> {
		let specs = self.collect_specs()?;
		let mut order: Vec<String> = Vec::new();
		let mut groups: HashMap<String, Group> = HashMap::new();
		while let Some(row) = self.child.next(env).await? {
			if env.ctx.is_done() {
				return Ok(VecDeque::new());
			}
			let mut key = String::new();
			for group_expr in &self.group {
				let value = group_expr
					.compute(env, Some(&row))
					.await
					.map_err(|e| row.decorate(e))?;
				key.push_str(&value.to_stable_key());
				key.push('\u{1}');
			}
			let group = groups.entry(key.clone()).or_insert_with(|| {
				order.push(key.clone());
				Group {
					first_row: None,
					accumulators: specs
						.iter()
						.map(|s| Accumulator::build(&s.call).expect("validated in collect_specs"))
						.collect(),
				}
			});
			if group.first_row.is_none() {
				group.first_row = Some(row.clone());
			}
			for (spec, accumulator) in specs.iter().zip(&mut group.accumulators) {
				if let Some(filter) = &spec.call.filter {
					let keep = filter
						.compute(env, Some(&row))
						.await
						.map_err(|e| row.decorate(e))?;
					if !keep.is_truthy() {
						continue;
					}
				}
				let argument = match spec.call.args.first() {
					None | Some(FunctionArg::Star) => None,
					Some(FunctionArg::Expr(expr)) => Some(
						expr.compute(env, Some(&row)).await.map_err(|e| row.decorate(e))?,
					),
				};
				accumulator.update(argument);
			}
		}
		// An empty input without GROUP BY still aggregates once
		if groups.is_empty() && self.group.is_empty() {
			let key = String::new();
			order.push(key.clone());
			groups.insert(key, Group {
				first_row: None,
				accumulators: specs
					.iter()
					.map(|s| Accumulator::build(&s.call).expect("validated in collect_specs"))
					.collect(),
			});
		}
		debug!(groups = groups.len(), aggregates = specs.len(), "aggregation complete");

		// Emission: finalize each group's aggregates, apply HAVING, and
		// project against the group's first row
		let columns: Vec<String> = self
			.fields
			.iter()
			.map(|f| f.output_name().expect("the planner rejects * in aggregate queries"))
			.collect();
		let schema = Schema::new(columns);
		let empty_row = Row::new(Schema::new(Vec::new()), Vec::new());
		let mut out = VecDeque::new();
		for key in order {
			let group = groups.remove(&key).expect("group keys come from the map");
			let resolved: HashMap<String, Value> = specs
				.iter()
				.zip(&group.accumulators)
				.map(|(spec, acc)| (spec.key.clone(), acc.finalize()))
				.collect();
			let synthetic = group.first_row.is_none();
			let row = group.first_row.unwrap_or_else(|| empty_row.clone());
			if let Some(having) = &self.having {
				let rewritten = rewrite(having, &resolved, synthetic);
				let keep = rewritten
					.compute(env, Some(&row))
					.await
					.map_err(|e| row.decorate(e))?;
				if !keep.is_truthy() {
					continue;
				}
			}
			let mut cells = Vec::with_capacity(self.fields.len());
			for field in &self.fields {
				let Field::Single {
					expr,
					..
				} = field
				else {
					continue;
				};
				let rewritten = Arc::new(rewrite(expr, &resolved, synthetic));
				cells.push(lazy_cell(env, &row, &rewritten));
			}
			out.push_back(Row::new(schema.clone(), cells));
		}
		Ok(out)
	}
}

#[async_trait]
impl Operator for Aggregate {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, AggState::Init) {
			match self.run(env).await {
				Ok(rows) => self.state = AggState::Emitting(rows),
				Err(e) => {
					self.state = AggState::Done;
					return Err(e);
				}
			}
		}
		match &mut self.state {
			AggState::Emitting(rows) => match rows.pop_front() {
				Some(row) => Ok(Some(row)),
				None => {
					self.state = AggState::Done;
					Ok(None)
				}
			},
			_ => Ok(None),
		}
	}
}

/// Find every aggregate call in an expression, without descending into
/// subqueries, which aggregate over their own inputs.
fn collect_aggregates(expr: &Expr, push: &mut impl FnMut(&FunctionCall)) {
	match expr {
		Expr::Function(call) if call.is_aggregate() => push(call),
		Expr::Function(call) => {
			for arg in call.arg_exprs() {
				collect_aggregates(arg, push);
			}
		}
		Expr::Binary {
			l,
			r,
			..
		} => {
			collect_aggregates(l, push);
			collect_aggregates(r, push);
		}
		Expr::Unary {
			v,
			..
		} => collect_aggregates(v, push),
		Expr::Cast {
			expr,
			..
		} => collect_aggregates(expr, push),
		Expr::Case {
			operand,
			branches,
			otherwise,
		} => {
			if let Some(operand) = operand {
				collect_aggregates(operand, push);
			}
			for (cond, result) in branches {
				collect_aggregates(cond, push);
				collect_aggregates(result, push);
			}
			if let Some(otherwise) = otherwise {
				collect_aggregates(otherwise, push);
			}
		}
		Expr::Between {
			expr,
			low,
			high,
			..
		} => {
			collect_aggregates(expr, push);
			collect_aggregates(low, push);
			collect_aggregates(high, push);
		}
		Expr::InList {
			expr,
			list,
			..
		} => {
			collect_aggregates(expr, push);
			for item in list {
				collect_aggregates(item, push);
			}
		}
		Expr::InSubquery {
			expr,
			..
		} => collect_aggregates(expr, push),
		Expr::IsNull {
			expr,
			..
		} => collect_aggregates(expr, push),
		Expr::Like {
			expr,
			pattern,
			..
		} => {
			collect_aggregates(expr, push);
			collect_aggregates(pattern, push);
		}
		Expr::Interval {
			value,
			..
		} => collect_aggregates(value, push),
		Expr::Literal(_) | Expr::Ident { .. } | Expr::Exists { .. } | Expr::Subquery(_) => {}
	}
}

/// Replace aggregate calls with their finalized values; for the
/// synthetic empty-input group, column references become nulls as well.
fn rewrite(expr: &Expr, resolved: &HashMap<String, Value>, synthetic: bool) -> Expr {
	match expr {
		Expr::Function(call) if call.is_aggregate() => {
			let value = resolved.get(&call.to_string()).cloned().unwrap_or(Value::Null);
			Expr::Literal(value)
		}
		Expr::Ident {
			..
		} if synthetic => Expr::Literal(Value::Null),
		Expr::Function(call) => {
			let args = call
				.args
				.iter()
				.map(|arg| match arg {
					FunctionArg::Star => FunctionArg::Star,
					FunctionArg::Expr(e) => FunctionArg::Expr(rewrite(e, resolved, synthetic)),
				})
				.collect();
			Expr::Function(Box::new(FunctionCall {
				name: call.name.clone(),
				args,
				distinct: call.distinct,
				filter: call.filter.clone(),
			}))
		}
		Expr::Binary {
			l,
			o,
			r,
		} => Expr::Binary {
			l: Box::new(rewrite(l, resolved, synthetic)),
			o: *o,
			r: Box::new(rewrite(r, resolved, synthetic)),
		},
		Expr::Unary {
			o,
			v,
		} => Expr::Unary {
			o: *o,
			v: Box::new(rewrite(v, resolved, synthetic)),
		},
		Expr::Cast {
			expr,
			kind,
		} => Expr::Cast {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			kind: *kind,
		},
		Expr::Case {
			operand,
			branches,
			otherwise,
		} => Expr::Case {
			operand: operand.as_ref().map(|o| Box::new(rewrite(o, resolved, synthetic))),
			branches: branches
				.iter()
				.map(|(c, v)| (rewrite(c, resolved, synthetic), rewrite(v, resolved, synthetic)))
				.collect(),
			otherwise: otherwise.as_ref().map(|o| Box::new(rewrite(o, resolved, synthetic))),
		},
		Expr::Between {
			expr,
			negated,
			low,
			high,
		} => Expr::Between {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			negated: *negated,
			low: Box::new(rewrite(low, resolved, synthetic)),
			high: Box::new(rewrite(high, resolved, synthetic)),
		},
		Expr::InList {
			expr,
			negated,
			list,
		} => Expr::InList {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			negated: *negated,
			list: list.iter().map(|e| rewrite(e, resolved, synthetic)).collect(),
		},
		Expr::InSubquery {
			expr,
			negated,
			select,
		} => Expr::InSubquery {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			negated: *negated,
			select: select.clone(),
		},
		Expr::IsNull {
			expr,
			negated,
		} => Expr::IsNull {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			negated: *negated,
		},
		Expr::Like {
			expr,
			negated,
			pattern,
		} => Expr::Like {
			expr: Box::new(rewrite(expr, resolved, synthetic)),
			negated: *negated,
			pattern: Box::new(rewrite(pattern, resolved, synthetic)),
		},
		Expr::Interval {
			value,
			unit,
		} => Expr::Interval {
			value: Box::new(rewrite(value, resolved, synthetic)),
			unit: *unit,
		},
		other => other.clone(),
	}
}

/// The per-group state machine of one aggregate call.
enum Accumulator {
	CountStar {
		n: usize,
	},
	Count {
		n: usize,
	},
	CountDistinct {
		seen: HashSet<String>,
	},
	Sum {
		sum: Option<Number>,
	},
	Avg {
		sum: Number,
		n: usize,
	},
	Min {
		value: Option<Value>,
	},
	Max {
		value: Option<Value>,
	},
	/// Welford's running mean and sum of squared deviations
	Stddev {
		mean: f64,
		m2: f64,
		n: usize,
		sample: bool,
	},
	ArrayAgg {
		values: Vec<Value>,
		distinct: Option<HashSet<String>>,
	},
}

impl Accumulator {
	fn build(call: &FunctionCall) -> Result<Accumulator, Error> {
		let name = ident::normal(&call.name);
		let acc = match name.as_str() {
			"count" => {
				if matches!(call.args.first(), Some(FunctionArg::Star)) {
					Accumulator::CountStar {
						n: 0,
					}
				} else if call.distinct {
					Accumulator::CountDistinct {
						seen: HashSet::new(),
					}
				} else {
					Accumulator::Count {
						n: 0,
					}
				}
			}
			"json_arrayagg" => Accumulator::ArrayAgg {
				values: Vec::new(),
				distinct: call.distinct.then(HashSet::new),
			},
			_ if call.distinct => {
				return Err(Error::Unsupported(format!("{}(DISTINCT ...)", call.name)))
			}
			"sum" => Accumulator::Sum {
				sum: None,
			},
			"avg" => Accumulator::Avg {
				sum: Number::Int(0),
				n: 0,
			},
			"min" => Accumulator::Min {
				value: None,
			},
			"max" => Accumulator::Max {
				value: None,
			},
			"stddev_pop" => Accumulator::Stddev {
				mean: 0.0,
				m2: 0.0,
				n: 0,
				sample: false,
			},
			"stddev_samp" => Accumulator::Stddev {
				mean: 0.0,
				m2: 0.0,
				n: 0,
				sample: true,
			},
			other => {
				return Err(Error::Internal(format!(
					"no accumulator for aggregate function {other}"
				)))
			}
		};
		Ok(acc)
	}

	fn update(&mut self, argument: Option<Value>) {
		match self {
			Accumulator::CountStar {
				n,
			} => *n += 1,
			Accumulator::Count {
				n,
			} => {
				if argument.is_some_and(|v| !v.is_null()) {
					*n += 1;
				}
			}
			Accumulator::CountDistinct {
				seen,
			} => {
				if let Some(v) = argument {
					if !v.is_null() {
						seen.insert(v.to_stable_key());
					}
				}
			}
			Accumulator::Sum {
				sum,
			} => {
				if let Some(Value::Number(v)) = argument {
					*sum = Some(match sum.take() {
						Some(s) => s + v,
						None => v,
					});
				}
			}
			Accumulator::Avg {
				sum,
				n,
			} => {
				if let Some(Value::Number(v)) = argument {
					*sum = *sum + v;
					*n += 1;
				}
			}
			Accumulator::Min {
				value,
			} => {
				if let Some(v) = argument {
					if !v.is_null() {
						let smaller = match value {
							Some(current) => v.cmp_order(current).is_lt(),
							None => true,
						};
						if smaller {
							*value = Some(v);
						}
					}
				}
			}
			Accumulator::Max {
				value,
			} => {
				if let Some(v) = argument {
					if !v.is_null() {
						let larger = match value {
							Some(current) => v.cmp_order(current).is_gt(),
							None => true,
						};
						if larger {
							*value = Some(v);
						}
					}
				}
			}
			Accumulator::Stddev {
				mean,
				m2,
				n,
				..
			} => {
				if let Some(Value::Number(v)) = argument {
					let x = v.as_f64();
					*n += 1;
					let delta = x - *mean;
					*mean += delta / *n as f64;
					*m2 += delta * (x - *mean);
				}
			}
			Accumulator::ArrayAgg {
				values,
				distinct,
			} => {
				if let Some(v) = argument {
					if let Some(seen) = distinct {
						if !seen.insert(v.to_stable_key()) {
							return;
						}
					}
					values.push(v);
				}
			}
		}
	}

	fn finalize(&self) -> Value {
		match self {
			Accumulator::CountStar {
				n,
			}
			| Accumulator::Count {
				n,
			} => Value::from(*n),
			Accumulator::CountDistinct {
				seen,
			} => Value::from(seen.len()),
			Accumulator::Sum {
				sum,
			} => sum.map(Value::Number).unwrap_or(Value::Null),
			Accumulator::Avg {
				sum,
				n,
			} => {
				if *n == 0 {
					Value::Null
				} else {
					Value::Number(*sum / Number::Int(*n as i64))
				}
			}
			Accumulator::Min {
				value,
			}
			| Accumulator::Max {
				value,
			} => value.clone().unwrap_or(Value::Null),
			Accumulator::Stddev {
				m2,
				n,
				sample,
				..
			} => match (*n, *sample) {
				(0, _) => Value::Null,
				(1, true) => Value::Null,
				(1, false) => Value::from(0.0),
				(n, true) => Value::from((m2 / (n as f64 - 1.0)).sqrt()),
				(n, false) => Value::from((m2 / n as f64).sqrt()),
			},
			Accumulator::ArrayAgg {
				values,
				..
			} => Value::from(values.clone()),
		}
	}
}
