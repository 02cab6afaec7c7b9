//! Join execution: hash joins for equi-conditions, buffered nested
//! loops for everything else, and positional pairing.
//!
//! Output rows carry the qualified `table.column` names of both sides
//! plus the bare column names, where the later side wins a bare-name
//! collision; qualified access always reaches shadowed columns. Matched
//! pairs preserve probe-side order and unmatched build-side rows of
//! outer joins are appended afterwards in build order.

use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, MergeCache, Operator};
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::sql::join::JoinKind;
use crate::tbl::row::{Row, Schema};
use ahash::HashMap;
use ahash::HashMapExt;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Evaluate join key expressions into a bucket key. A null component
/// means the row never matches, per SQL join semantics.
async fn bucket_key(
	env: &QueryEnv,
	keys: &[Expr],
	row: &Row,
) -> Result<Option<String>, Error> {
	let mut out = String::new();
	for key in keys {
		let value = key.compute(env, Some(row)).await.map_err(|e| row.decorate(e))?;
		if value.is_null() {
			return Ok(None);
		}
		out.push_str(&value.to_stable_key());
		out.push('\u{1}');
	}
	Ok(Some(out))
}

pub(crate) struct HashJoin {
	left: BoxOperator,
	right: BoxOperator,
	kind: JoinKind,
	left_keys: Vec<Expr>,
	right_keys: Vec<Expr>,
	state: HashState,
	merge: MergeCache,
}

enum HashState {
	Init,
	Probing(Build),
	/// Unmatched build-side rows of RIGHT and FULL joins
	Tail {
		rows: VecDeque<Row>,
		left_schema: Option<Arc<Schema>>,
	},
	Done,
}

struct Build {
	buckets: HashMap<String, Vec<usize>>,
	rows: Vec<Row>,
	matched: Vec<bool>,
	right_schema: Option<Arc<Schema>>,
	left_schema: Option<Arc<Schema>>,
	/// Output rows already produced by the current probe row
	pending: VecDeque<Row>,
}

impl HashJoin {
	pub(crate) fn new(
		left: BoxOperator,
		right: BoxOperator,
		kind: JoinKind,
		left_keys: Vec<Expr>,
		right_keys: Vec<Expr>,
	) -> HashJoin {
		HashJoin {
			left,
			right,
			kind,
			left_keys,
			right_keys,
			state: HashState::Init,
			merge: MergeCache::default(),
		}
	}

	/// The build phase: consume the inner input into a multimap.
	async fn build(&mut self, env: &QueryEnv) -> Result<Build, Error> {
		let mut build = Build {
			buckets: HashMap::new(),
			rows: Vec::new(),
			matched: Vec::new(),
			right_schema: None,
			left_schema: None,
			pending: VecDeque::new(),
		};
		while let Some(row) = self.right.next(env).await? {
			if env.ctx.is_done() {
				break;
			}
			build.right_schema = Some(row.schema().clone());
			if let Some(key) = bucket_key(env, &self.right_keys, &row).await? {
				build.buckets.entry(key).or_default().push(build.rows.len());
			}
			build.rows.push(row);
			build.matched.push(false);
		}
		debug!(rows = build.rows.len(), "hash join build complete");
		Ok(build)
	}
}

#[async_trait]
impl Operator for HashJoin {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, HashState::Init) {
			match self.build(env).await {
				Ok(build) => self.state = HashState::Probing(build),
				Err(e) => {
					self.state = HashState::Done;
					return Err(e);
				}
			}
		}
		loop {
			match &mut self.state {
				HashState::Probing(build) => {
					if let Some(row) = build.pending.pop_front() {
						return Ok(Some(row));
					}
					if env.ctx.is_done() {
						self.state = HashState::Done;
						return Ok(None);
					}
					let Some(left_row) = self.left.next(env).await? else {
						// The probe side is exhausted; RIGHT and FULL
						// joins still owe the unmatched build rows
						let rows: VecDeque<Row> =
							if matches!(self.kind, JoinKind::Right | JoinKind::Full) {
								build
									.rows
									.iter()
									.zip(&build.matched)
									.filter(|(_, matched)| !**matched)
									.map(|(row, _)| row.clone())
									.collect()
							} else {
								VecDeque::new()
							};
						let left_schema = build.left_schema.clone();
						self.state = HashState::Tail {
							rows,
							left_schema,
						};
						continue;
					};
					build.left_schema = Some(left_row.schema().clone());
					let key = bucket_key(env, &self.left_keys, &left_row).await?;
					let indices = key.as_ref().and_then(|k| build.buckets.get(k));
					match indices {
						Some(indices) if !indices.is_empty() => {
							for &i in indices {
								build.matched[i] = true;
								build
									.pending
									.push_back(self.merge.merge(&left_row, &build.rows[i]));
							}
						}
						_ => {
							if matches!(self.kind, JoinKind::Left | JoinKind::Full) {
								let right_schema = build.right_schema.clone();
								build.pending.push_back(self.merge.merge_padded(
									Some(&left_row),
									None,
									None,
									right_schema.as_ref(),
								));
							}
						}
					}
				}
				HashState::Tail {
					rows,
					left_schema,
				} => match rows.pop_front() {
					Some(right_row) => {
						let left_schema = left_schema.clone();
						return Ok(Some(self.merge.merge_padded(
							None,
							Some(&right_row),
							left_schema.as_ref(),
							None,
						)));
					}
					None => {
						self.state = HashState::Done;
						return Ok(None);
					}
				},
				_ => return Ok(None),
			}
		}
	}
}

pub(crate) struct NestedLoopJoin {
	left: BoxOperator,
	right: BoxOperator,
	kind: JoinKind,
	on: Expr,
	state: NestedState,
}

enum NestedState {
	Init,
	Emitting(VecDeque<Row>),
	Done,
}

impl NestedLoopJoin {
	pub(crate) fn new(
		left: BoxOperator,
		right: BoxOperator,
		kind: JoinKind,
		on: Expr,
	) -> NestedLoopJoin {
		NestedLoopJoin {
			left,
			right,
			kind,
			on,
			state: NestedState::Init,
		}
	}

	/// Buffer both inputs and produce the filtered Cartesian product,
	/// with outer padding per join kind.
	async fn run(&mut self, env: &QueryEnv) -> Result<VecDeque<Row>, Error> {
		let mut merge = MergeCache::default();
		let mut left_rows = Vec::new();
		while let Some(row) = self.left.next(env).await? {
			if env.ctx.is_done() {
				return Ok(VecDeque::new());
			}
			left_rows.push(row);
		}
		let mut right_rows = Vec::new();
		while let Some(row) = self.right.next(env).await? {
			if env.ctx.is_done() {
				return Ok(VecDeque::new());
			}
			right_rows.push(row);
		}
		let left_schema = left_rows.first().map(|r| r.schema().clone());
		let right_schema = right_rows.first().map(|r| r.schema().clone());
		let mut right_matched = vec![false; right_rows.len()];
		let mut out = VecDeque::new();
		for left_row in &left_rows {
			if env.ctx.is_done() {
				return Ok(VecDeque::new());
			}
			let mut matched = false;
			for (j, right_row) in right_rows.iter().enumerate() {
				let candidate = merge.merge(left_row, right_row);
				let keep = self
					.on
					.compute(env, Some(&candidate))
					.await
					.map_err(|e| candidate.decorate(e))?;
				if keep.is_truthy() {
					matched = true;
					right_matched[j] = true;
					out.push_back(candidate);
				}
			}
			if !matched && matches!(self.kind, JoinKind::Left | JoinKind::Full) {
				out.push_back(merge.merge_padded(
					Some(left_row),
					None,
					None,
					right_schema.as_ref(),
				));
			}
		}
		if matches!(self.kind, JoinKind::Right | JoinKind::Full) {
			for (j, right_row) in right_rows.iter().enumerate() {
				if !right_matched[j] {
					out.push_back(merge.merge_padded(
						None,
						Some(right_row),
						left_schema.as_ref(),
						None,
					));
				}
			}
		}
		Ok(out)
	}
}

#[async_trait]
impl Operator for NestedLoopJoin {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, NestedState::Init) {
			match self.run(env).await {
				Ok(out) => self.state = NestedState::Emitting(out),
				Err(e) => {
					self.state = NestedState::Done;
					return Err(e);
				}
			}
		}
		match &mut self.state {
			NestedState::Emitting(out) => match out.pop_front() {
				Some(row) => Ok(Some(row)),
				None => {
					self.state = NestedState::Done;
					Ok(None)
				}
			},
			_ => Ok(None),
		}
	}
}

/// Pairs the inputs row by row; when one side runs out first, its
/// columns continue as nulls until the longer side is exhausted.
pub(crate) struct PositionalJoin {
	left: BoxOperator,
	right: BoxOperator,
	left_done: bool,
	right_done: bool,
	left_schema: Option<Arc<Schema>>,
	right_schema: Option<Arc<Schema>>,
	merge: MergeCache,
}

impl PositionalJoin {
	pub(crate) fn new(left: BoxOperator, right: BoxOperator) -> PositionalJoin {
		PositionalJoin {
			left,
			right,
			left_done: false,
			right_done: false,
			left_schema: None,
			right_schema: None,
			merge: MergeCache::default(),
		}
	}
}

#[async_trait]
impl Operator for PositionalJoin {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		let left_row = if self.left_done {
			None
		} else {
			let row = self.left.next(env).await?;
			if row.is_none() {
				self.left_done = true;
			}
			row
		};
		let right_row = if self.right_done {
			None
		} else {
			let row = self.right.next(env).await?;
			if row.is_none() {
				self.right_done = true;
			}
			row
		};
		if let Some(row) = &left_row {
			self.left_schema = Some(row.schema().clone());
		}
		if let Some(row) = &right_row {
			self.right_schema = Some(row.schema().clone());
		}
		match (left_row, right_row) {
			(None, None) => Ok(None),
			(left_row, right_row) => Ok(Some(self.merge.merge_padded(
				left_row.as_ref(),
				right_row.as_ref(),
				self.left_schema.as_ref(),
				self.right_schema.as_ref(),
			))),
		}
	}
}
