use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::sql::field::Field;
use crate::tbl::cell::Cell;
use crate::tbl::row::{Row, Schema};
use async_trait::async_trait;
use std::sync::Arc;

/// The projection: builds output rows whose cells are lazy thunks over
/// the source row. A thunk only evaluates when the consumer forces the
/// cell, so expressions never touch source columns the query does not
/// read.
pub(crate) struct Project {
	child: BoxOperator,
	fields: Arc<Vec<ProjectField>>,
	/// The output schema, cached per input schema identity
	cached: Option<(usize, Arc<Schema>)>,
}

enum ProjectField {
	All,
	Single {
		name: String,
		expr: Arc<Expr>,
	},
}

impl Project {
	pub(crate) fn new(child: BoxOperator, fields: Vec<Field>) -> Project {
		let fields = fields
			.into_iter()
			.map(|field| match field {
				Field::All => ProjectField::All,
				Field::Single {
					expr,
					alias,
				} => {
					let name = alias.unwrap_or_else(|| {
						crate::sql::expression::default_alias(&expr)
					});
					ProjectField::Single {
						name,
						expr: Arc::new(expr),
					}
				}
			})
			.collect();
		Project {
			child,
			fields: Arc::new(fields),
			cached: None,
		}
	}

	fn output_schema(&mut self, input: &Row) -> Arc<Schema> {
		let key = Arc::as_ptr(input.schema()) as usize;
		if let Some((cached_key, schema)) = &self.cached {
			if *cached_key == key {
				return schema.clone();
			}
		}
		let mut columns = Vec::new();
		for field in self.fields.iter() {
			match field {
				ProjectField::All => {
					columns.extend(input.star_columns().cloned());
				}
				ProjectField::Single {
					name,
					..
				} => columns.push(name.clone()),
			}
		}
		let schema = Schema::new(columns);
		self.cached = Some((key, schema.clone()));
		schema
	}
}

#[async_trait]
impl Operator for Project {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		let Some(row) = self.child.next(env).await? else {
			return Ok(None);
		};
		let schema = self.output_schema(&row);
		let mut cells = Vec::with_capacity(schema.len());
		for field in self.fields.iter() {
			match field {
				ProjectField::All => {
					for name in row.star_columns() {
						cells.push(
							row.cell(name)
								.expect("star columns resolve against their own row")
								.clone(),
						);
					}
				}
				ProjectField::Single {
					expr,
					..
				} => {
					cells.push(lazy_cell(env, &row, expr));
				}
			}
		}
		let out = Row::new(schema, cells);
		Ok(Some(match row.num() {
			Some(num) => out.numbered(num),
			None => out,
		}))
	}
}

/// A cell which evaluates an expression against its source row on first
/// await, decorating any failure with the source row's ordinal.
pub(crate) fn lazy_cell(env: &QueryEnv, row: &Row, expr: &Arc<Expr>) -> Cell {
	let env = env.clone();
	let row = row.clone();
	let expr = expr.clone();
	Cell::new(Box::new(move || {
		let env = env.clone();
		let row = row.clone();
		let expr = expr.clone();
		Box::pin(async move {
			expr.compute(&env, Some(&row)).await.map_err(|e| row.decorate(e))
		})
	}))
}
