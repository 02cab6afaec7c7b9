use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A handle for cancelling a query context and all of its children.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct Canceller {
	/// The cancellation flag shared with the context
	cancelled: Arc<AtomicBool>,
}

impl Canceller {
	/// Create a new canceller over a shared cancellation flag.
	pub(crate) fn new(cancelled: Arc<AtomicBool>) -> Canceller {
		Canceller {
			cancelled,
		}
	}

	/// Cancel the context this canceller was created from.
	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Relaxed);
	}
}
