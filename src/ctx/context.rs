use crate::ctx::canceller::Canceller;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The execution context passed through every stage of a query.
///
/// A context forms a chain: cancelling a parent cancels every child created
/// from it. Operators check the context before yielding each row and around
/// every cell await; a cancelled context ends the stream cleanly without
/// surfacing an error. There are no wall-clock timeouts inside the engine;
/// a caller wanting a timeout cancels the context itself.
#[derive(Clone, Default)]
pub struct Context {
	inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
	/// An optional parent context
	parent: Option<Context>,
	/// Whether or not this context is cancelled
	cancelled: Arc<AtomicBool>,
}

impl Debug for Context {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.debug_struct("Context")
			.field("cancelled", &self.inner.cancelled.load(Ordering::Relaxed))
			.field("parent", &self.inner.parent)
			.finish()
	}
}

impl Context {
	/// Create an empty background context.
	pub fn background() -> Self {
		Self::default()
	}

	/// Create a new child of this context.
	pub fn new(parent: &Context) -> Self {
		Context {
			inner: Arc::new(Inner {
				parent: Some(parent.clone()),
				cancelled: Arc::new(AtomicBool::new(false)),
			}),
		}
	}

	/// Get a handle which cancels this context and all of its children.
	pub fn add_cancel(&self) -> Canceller {
		Canceller::new(self.inner.cancelled.clone())
	}

	/// Check if the context is ok to continue.
	pub fn is_ok(&self) -> bool {
		!self.is_done()
	}

	/// Check if the context, or any of its ancestors, was cancelled.
	pub fn is_done(&self) -> bool {
		if self.inner.cancelled.load(Ordering::Relaxed) {
			return true;
		}
		match &self.inner.parent {
			Some(parent) => parent.is_done(),
			None => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cancelling_a_parent_cancels_the_child() {
		let parent = Context::background();
		let child = Context::new(&parent);
		let canceller = parent.add_cancel();
		assert!(child.is_ok());
		canceller.cancel();
		assert!(parent.is_done());
		assert!(child.is_done());
	}

	#[test]
	fn cancelling_a_child_leaves_the_parent_running() {
		let parent = Context::background();
		let child = Context::new(&parent);
		child.add_cancel().cancel();
		assert!(child.is_done());
		assert!(parent.is_ok());
	}
}
