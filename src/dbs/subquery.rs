//! Subquery and CTE execution. Subqueries are uncorrelated: they plan
//! and run against the catalog and the CTE scope alone, so a reference
//! to an outer row's column fails name resolution inside the subquery.

use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{self, BoxOperator, Operator};
use crate::dbs::scan::QualifyCache;
use crate::err::Error;
use crate::plan::planner;
use crate::sql::statement::SelectStatement;
use crate::sql::value::Value;
use crate::sql::with::Cte;
use crate::tbl::row::Row;
use ahash::HashSet;
use ahash::HashSetExt;
use async_trait::async_trait;

/// Start a nested statement: plan it against the current CTE scope and
/// build its operator tree.
fn start(env: &QueryEnv, select: &SelectStatement) -> Result<BoxOperator, Error> {
	let plan = planner::plan_statement(select, &env.ctes)?;
	Ok(iterate::build(&plan))
}

/// The values a subquery contributes to `IN (SELECT ...)`: the first
/// output column of every row, reduced to membership keys plus a
/// null marker for three-valued logic.
pub(crate) struct MembershipSet {
	keys: HashSet<String>,
	saw_null: bool,
}

impl MembershipSet {
	pub(crate) fn contains(&self, key: &str) -> bool {
		self.keys.contains(key)
	}

	pub(crate) fn saw_null(&self) -> bool {
		self.saw_null
	}
}

pub(crate) async fn membership_set(
	env: &QueryEnv,
	select: &SelectStatement,
) -> Result<MembershipSet, Error> {
	let mut operator = start(env, select)?;
	let mut set = MembershipSet {
		keys: HashSet::new(),
		saw_null: false,
	};
	while let Some(row) = operator.next(env).await? {
		if env.ctx.is_done() {
			break;
		}
		let value = first_column(&row).await?;
		if value.is_null() {
			set.saw_null = true;
		} else {
			set.keys.insert(value.to_stable_key());
		}
	}
	Ok(set)
}

/// EXISTS: advance the subquery to its first yield.
pub(crate) async fn exists(env: &QueryEnv, select: &SelectStatement) -> Result<bool, Error> {
	let mut operator = start(env, select)?;
	Ok(operator.next(env).await?.is_some())
}

/// A scalar subquery: the first row's first column, null when the
/// subquery yields nothing.
pub(crate) async fn scalar(env: &QueryEnv, select: &SelectStatement) -> Result<Value, Error> {
	let mut operator = start(env, select)?;
	match operator.next(env).await? {
		Some(row) => first_column(&row).await,
		None => Ok(Value::Null),
	}
}

async fn first_column(row: &Row) -> Result<Value, Error> {
	match row.cell_at(0) {
		Some(cell) => cell.value().await.map_err(|e| row.decorate(e)),
		None => Ok(Value::Null),
	}
}

/// A reference to a CTE. Each reference re-plans and re-executes the
/// definition as its own stream; nothing is materialized across
/// references. Resolution happens by name against the scope in force,
/// never by pointer, so definition cycles cannot form.
pub(crate) struct CteRef {
	name: String,
	state: CteState,
	qualify: QualifyCache,
}

enum CteState {
	Unresolved,
	Running {
		operator: BoxOperator,
		env: QueryEnv,
	},
	Done,
}

impl CteRef {
	pub(crate) fn new(name: String, label: String) -> CteRef {
		CteRef {
			name,
			state: CteState::Unresolved,
			qualify: QualifyCache::new(label),
		}
	}
}

#[async_trait]
impl Operator for CteRef {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, CteState::Unresolved) {
			let Some((statement, visible)) = env.ctes.lookup(&self.name) else {
				self.state = CteState::Done;
				return Err(Error::UnknownTable(self.name.clone()));
			};
			let sub_env = env.with_ctes(visible);
			match start(&sub_env, &statement) {
				Ok(operator) => {
					self.state = CteState::Running {
						operator,
						env: sub_env,
					};
				}
				Err(e) => {
					self.state = CteState::Done;
					return Err(e);
				}
			}
		}
		match &mut self.state {
			CteState::Running {
				operator,
				env,
			} => {
				let env = env.clone();
				match operator.next(&env).await? {
					Some(row) => Ok(Some(self.qualify.apply(row))),
					None => {
						self.state = CteState::Done;
						Ok(None)
					}
				}
			}
			_ => Ok(None),
		}
	}
}

/// Extends the CTE scope for the subtree of a statement carrying a WITH
/// clause, so references inside resolve at execution time.
pub(crate) struct ScopeFrame {
	child: BoxOperator,
	ctes: Vec<Cte>,
	scoped: Option<QueryEnv>,
}

impl ScopeFrame {
	pub(crate) fn new(child: BoxOperator, ctes: Vec<Cte>) -> ScopeFrame {
		ScopeFrame {
			child,
			ctes,
			scoped: None,
		}
	}
}

#[async_trait]
impl Operator for ScopeFrame {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if self.scoped.is_none() {
			self.scoped = Some(env.with_ctes(env.ctes.extended(&self.ctes)));
		}
		let env = self.scoped.clone().expect("initialized above");
		self.child.next(&env).await
	}
}
