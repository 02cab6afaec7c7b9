pub(crate) mod canceller;
pub(crate) mod context;

pub use self::canceller::Canceller;
pub use self::context::Context;
