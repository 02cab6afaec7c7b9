use crate::err::Error;
use crate::sql::value::Value;
use futures::future::BoxFuture;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// The producer behind an unforced cell.
pub type CellThunk = Box<dyn Fn() -> BoxFuture<'static, Result<Value, Error>> + Send + Sync>;

/// A lazily computed cell of a row.
///
/// A cell starts unforced, holding only the thunk which can produce its
/// value. The first await moves it through a pending state, in which
/// concurrent awaiters queue on the same computation, into a resolved
/// state holding the value. The thunk must be idempotent but may be
/// expensive; nothing in the engine forces a cell that no expression
/// references.
///
/// Clones share the underlying state, so forcing any clone resolves all
/// of them.
#[derive(Clone)]
pub struct Cell(Arc<Inner>);

struct Inner {
	state: OnceCell<Result<Value, Error>>,
	thunk: Option<CellThunk>,
}

impl Debug for Cell {
	fn fmt(&self, f: &mut Formatter) -> fmt::Result {
		match self.0.state.get() {
			Some(v) => f.debug_tuple("Cell").field(v).finish(),
			None => f.write_str("Cell(<unforced>)"),
		}
	}
}

impl Cell {
	/// A cell which computes its value on first await.
	pub fn new(thunk: CellThunk) -> Cell {
		Cell(Arc::new(Inner {
			state: OnceCell::new(),
			thunk: Some(thunk),
		}))
	}

	/// A cell which already holds its value.
	pub fn resolved(value: Value) -> Cell {
		Cell(Arc::new(Inner {
			state: OnceCell::new_with(Some(Ok(value))),
			thunk: None,
		}))
	}

	/// A resolved null cell.
	pub fn null() -> Cell {
		Self::resolved(Value::Null)
	}

	/// Whether the value has been computed already.
	pub fn is_resolved(&self) -> bool {
		self.0.state.initialized()
	}

	/// Force the cell, computing the value on first use.
	pub async fn value(&self) -> Result<Value, Error> {
		match &self.0.thunk {
			None => match self.0.state.get() {
				Some(result) => result.clone(),
				None => Ok(Value::Null),
			},
			Some(thunk) => self.0.state.get_or_init(|| thunk()).await.clone(),
		}
	}
}

impl From<Value> for Cell {
	fn from(value: Value) -> Self {
		Cell::resolved(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[tokio::test]
	async fn thunks_run_once_and_share_results() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let cell = Cell::new(Box::new(move || {
			let counter = counter.clone();
			Box::pin(async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Ok(Value::from(7))
			})
		}));
		let clone = cell.clone();
		assert!(!cell.is_resolved());
		assert_eq!(cell.value().await.unwrap(), Value::from(7));
		assert_eq!(clone.value().await.unwrap(), Value::from(7));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(clone.is_resolved());
	}

	#[tokio::test]
	async fn errors_are_sticky() {
		let cell = Cell::new(Box::new(|| {
			Box::pin(async { Err(Error::UnknownColumn("ghost".to_owned())) })
		}));
		assert!(cell.value().await.is_err());
		assert!(cell.value().await.is_err());
	}
}
