use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::tbl::row::Row;
use async_trait::async_trait;

/// Drops `offset` rows, then forwards up to `limit`.
pub(crate) struct LimitOffset {
	child: BoxOperator,
	skip: usize,
	remaining: Option<usize>,
}

impl LimitOffset {
	pub(crate) fn new(child: BoxOperator, limit: Option<usize>, offset: Option<usize>) -> Self {
		LimitOffset {
			child,
			skip: offset.unwrap_or(0),
			remaining: limit,
		}
	}
}

#[async_trait]
impl Operator for LimitOffset {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if self.remaining == Some(0) || env.ctx.is_done() {
			return Ok(None);
		}
		while self.skip > 0 {
			if self.child.next(env).await?.is_none() {
				return Ok(None);
			}
			self.skip -= 1;
		}
		match self.child.next(env).await? {
			Some(row) => {
				if let Some(remaining) = &mut self.remaining {
					*remaining -= 1;
				}
				Ok(Some(row))
			}
			None => Ok(None),
		}
	}
}
