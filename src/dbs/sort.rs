//! ORDER BY execution: a buffered, multi-pass sort which evaluates
//! later terms only inside the tie groups left by earlier terms, plus
//! the Fisher-Yates shuffle behind ORDER BY RANDOM().

use crate::dbs::env::QueryEnv;
use crate::dbs::iterate::{BoxOperator, Operator};
use crate::err::Error;
use crate::sql::order::OrderItem;
use crate::sql::value::Value;
use crate::tbl::row::Row;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

pub(crate) struct Sort {
	child: BoxOperator,
	order: Vec<OrderItem>,
	state: SortState,
}

enum SortState {
	Init,
	Emitting(VecDeque<Row>),
	Done,
}

impl Sort {
	pub(crate) fn new(child: BoxOperator, order: Vec<OrderItem>) -> Sort {
		Sort {
			child,
			order,
			state: SortState::Init,
		}
	}

	async fn run(&mut self, env: &QueryEnv) -> Result<VecDeque<Row>, Error> {
		let mut rows = Vec::new();
		while let Some(row) = self.child.next(env).await? {
			if env.ctx.is_done() {
				return Ok(VecDeque::new());
			}
			rows.push(row);
		}
		let mut indices: Vec<usize> = (0..rows.len()).collect();
		// Tie groups from the previous pass, as ranges over `indices`;
		// each later term is evaluated only for rows still tied
		let mut groups: Vec<(usize, usize)> = if rows.len() > 1 {
			vec![(0, rows.len())]
		} else {
			Vec::new()
		};
		for term in &self.order {
			if groups.is_empty() {
				break;
			}
			// Term values, memoized per row for this pass
			let mut values: Vec<Option<Value>> = vec![None; rows.len()];
			for &(start, end) in &groups {
				for &row_index in &indices[start..end] {
					let row = &rows[row_index];
					let value = term
						.expr
						.compute(env, Some(row))
						.await
						.map_err(|e| row.decorate(e))?;
					values[row_index] = Some(value);
				}
				if env.ctx.is_done() {
					return Ok(VecDeque::new());
				}
			}
			let mut next_groups = Vec::new();
			for &(start, end) in &groups {
				let slice = &mut indices[start..end];
				slice.sort_by(|&a, &b| {
					compare_terms(
						values[a].as_ref().expect("evaluated above"),
						values[b].as_ref().expect("evaluated above"),
						term,
					)
				});
				// Split equal runs into the next pass's tie groups
				let mut run_start = 0;
				for i in 1..=slice.len() {
					let tied = i < slice.len()
						&& compare_terms(
							values[slice[run_start]].as_ref().expect("evaluated above"),
							values[slice[i]].as_ref().expect("evaluated above"),
							term,
						) == Ordering::Equal;
					if !tied {
						if i - run_start > 1 {
							next_groups.push((start + run_start, start + i));
						}
						run_start = i;
					}
				}
			}
			groups = next_groups;
		}
		debug!(rows = rows.len(), terms = self.order.len(), "sort complete");
		let mut taken: Vec<Option<Row>> = rows.into_iter().map(Some).collect();
		Ok(indices
			.into_iter()
			.map(|i| taken[i].take().expect("each index appears once"))
			.collect())
	}
}

/// Compare two evaluated term values: an explicit NULLS FIRST/LAST
/// placement overrides the default null-low ordering, and DESC reverses
/// only the non-null comparison.
fn compare_terms(a: &Value, b: &Value, term: &OrderItem) -> Ordering {
	match (a.is_null(), b.is_null()) {
		(true, true) => Ordering::Equal,
		(true, false) => {
			if term.nulls_first() {
				Ordering::Less
			} else {
				Ordering::Greater
			}
		}
		(false, true) => {
			if term.nulls_first() {
				Ordering::Greater
			} else {
				Ordering::Less
			}
		}
		(false, false) => {
			let ordering = a.cmp_order(b);
			if term.ascending {
				ordering
			} else {
				ordering.reverse()
			}
		}
	}
}

#[async_trait]
impl Operator for Sort {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, SortState::Init) {
			match self.run(env).await {
				Ok(rows) => self.state = SortState::Emitting(rows),
				Err(e) => {
					self.state = SortState::Done;
					return Err(e);
				}
			}
		}
		match &mut self.state {
			SortState::Emitting(rows) => match rows.pop_front() {
				Some(row) => Ok(Some(row)),
				None => {
					self.state = SortState::Done;
					Ok(None)
				}
			},
			_ => Ok(None),
		}
	}
}

/// ORDER BY RANDOM(): buffer everything and shuffle.
pub(crate) struct RandomShuffle {
	child: BoxOperator,
	state: SortState,
}

impl RandomShuffle {
	pub(crate) fn new(child: BoxOperator) -> RandomShuffle {
		RandomShuffle {
			child,
			state: SortState::Init,
		}
	}
}

#[async_trait]
impl Operator for RandomShuffle {
	async fn next(&mut self, env: &QueryEnv) -> Result<Option<Row>, Error> {
		if env.ctx.is_done() {
			return Ok(None);
		}
		if matches!(self.state, SortState::Init) {
			let mut rows = Vec::new();
			while let Some(row) = self.child.next(env).await? {
				if env.ctx.is_done() {
					return Ok(None);
				}
				rows.push(row);
			}
			rows.shuffle(&mut rand::thread_rng());
			self.state = SortState::Emitting(rows.into());
		}
		match &mut self.state {
			SortState::Emitting(rows) => match rows.pop_front() {
				Some(row) => Ok(Some(row)),
				None => {
					self.state = SortState::Done;
					Ok(None)
				}
			},
			_ => Ok(None),
		}
	}
}
