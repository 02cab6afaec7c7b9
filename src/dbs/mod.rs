//! The executor: streaming operators driven one row at a time.

pub(crate) mod aggregate;
pub(crate) mod distinct;
pub(crate) mod env;
pub(crate) mod filter;
pub(crate) mod iterate;
pub(crate) mod join;
pub(crate) mod limit;
pub(crate) mod project;
pub(crate) mod scan;
pub(crate) mod sort;
pub(crate) mod subquery;
