use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::tbl::row::Row;
use async_trait::async_trait;

/// The streaming WHERE filter: a row passes when its predicate reduces
/// to a truthy non-null value, so a null comparison excludes the row.
pub(crate) struct Filter {
	child: BoxOperator,
	predicate: Expr,
}

impl Filter {
	pub(crate) fn new(child: BoxOperator, predicate: Expr) -> Filter {
		Filter {
			child,
			predicate,
		}
	}
}

#[async_trait]
impl Operator for Filter {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		loop {
			if env.ctx.is_done() {
				return Ok(None);
			}
			let Some(row) = self.child.next(env).await? else {
				return Ok(None);
			};
			let value = self
				.predicate
				.compute(env, Some(&row))
				.await
				.map_err(|e| row.decorate(e))?;
			if env.ctx.is_done() {
				return Ok(None);
			}
			if value.is_truthy() {
				return Ok(Some(row));
			}
		}
	}
}
