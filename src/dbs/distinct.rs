use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::tbl::row::Row;
use ahash::HashSet;
use ahash::HashSetExt;
use async_trait::async_trait;

/// Set-hashing DISTINCT: each row is rendered into its stable textual
/// form and only the first occurrence is forwarded. Rendering forces
/// the row's cells, which DISTINCT semantics require anyway.
pub(crate) struct Distinct {
	child: BoxOperator,
	seen: HashSet<String>,
}

impl Distinct {
	pub(crate) fn new(child: BoxOperator) -> Distinct {
		Distinct {
			child,
			seen: HashSet::new(),
		}
	}
}

#[async_trait]
impl Operator for Distinct {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		loop {
			if env.ctx.is_done() {
				return Ok(None);
			}
			let Some(row) = self.child.next(env).await? else {
				return Ok(None);
			};
			let key = row_key(env, &row).await?;
			if self.seen.insert(key) {
				return Ok(Some(row));
			}
		}
	}
}

/// The stable textual form of a row: each cell's canonical key fragment
/// in column order.
pub(crate) async fn row_key(env: &QueryEnv, row: &Row) -> Result<String, Error> {
	let mut key = String::new();
	for name in row.star_columns() {
		let value = row
			.cell(name)
			.expect("star columns resolve against their own row")
			.value()
			.await
			.map_err(|e| row.decorate(e))?;
		if env.ctx.is_done() {
			break;
		}
		key.push_str(&value.to_stable_key());
		key.push('\u{1}');
	}
	Ok(key)
}
