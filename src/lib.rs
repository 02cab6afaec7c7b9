//! An embeddable, read-only SQL query engine over pluggable row
//! sources.
//!
//! The engine parses a SQL SELECT dialect, lowers it into a tree of
//! streaming physical operators, and drives those operators against
//! tabular sources exposing asynchronous, lazily computed cells. Rows
//! arriving from I/O-bound or compute-bound backends are filtered,
//! projected, grouped, sorted, joined and aggregated while minimizing
//! both the rows scanned and the expensive cells forced: projection,
//! predicate and limit hints travel into the source, and a cell no
//! expression touches is never evaluated.
//!
//! ```no_run
//! use quillsql::{collect, execute, Catalog, ExecuteOptions, MemTable};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), quillsql::Error> {
//! let users = MemTable::from_objects(vec![/* rows */]);
//! let catalog = Catalog::new().with("users", Arc::new(users));
//! let rows = execute(
//! 	"SELECT name FROM users WHERE age > 25 ORDER BY name",
//! 	ExecuteOptions::new(catalog),
//! )?;
//! let result = collect(rows).await?;
//! # Ok(())
//! # }
//! ```

pub mod ctx;
pub(crate) mod dbs;
pub mod err;
pub mod fnc;
pub mod plan;
pub mod sql;
pub mod syn;
pub mod tbl;

use crate::dbs::env::{CteScope, QueryEnv};
use crate::dbs::iterate::BoxOperator;
use std::sync::Arc;

pub use crate::ctx::{Canceller, Context};
pub use crate::err::Error;
pub use crate::fnc::Functions;
pub use crate::plan::PlanNode;
pub use crate::sql::{Object, SelectStatement, Value};
pub use crate::syn::{tokenize, Token};
pub use crate::tbl::{
	CachedSource, Catalog, Cell, DataSource, MemTable, Row, RowStream, Scan, ScanHints,
	ScanOptions, Schema, Statistics,
};

/// Parse a SELECT statement into its AST.
pub fn parse(sql: &str) -> Result<SelectStatement, Error> {
	syn::parse(sql)
}

/// Parse with user functions registered, so their names and arities
/// validate alongside the builtins.
pub fn parse_with(sql: &str, functions: &Functions) -> Result<SelectStatement, Error> {
	syn::parse_with(sql, functions)
}

/// Parse and lower a query into its physical plan.
pub fn plan(sql: &str) -> Result<PlanNode, Error> {
	plan_statement(&parse(sql)?)
}

/// Parse with user functions and lower into the physical plan.
pub fn plan_with(sql: &str, functions: &Functions) -> Result<PlanNode, Error> {
	plan_statement(&parse_with(sql, functions)?)
}

/// Lower an already-parsed statement into its physical plan.
pub fn plan_statement(statement: &SelectStatement) -> Result<PlanNode, Error> {
	plan::planner::plan_statement(statement, &CteScope::default())
}

/// The context an execution runs in: the table catalog, optional user
/// functions, and an optional cancellation context.
#[derive(Clone, Default)]
#[non_exhaustive]
pub struct ExecuteOptions {
	pub catalog: Catalog,
	pub functions: Arc<Functions>,
	pub ctx: Context,
}

impl ExecuteOptions {
	pub fn new(catalog: Catalog) -> ExecuteOptions {
		ExecuteOptions {
			catalog,
			functions: Arc::new(Functions::new()),
			ctx: Context::background(),
		}
	}

	pub fn with_functions(mut self, functions: Functions) -> ExecuteOptions {
		self.functions = Arc::new(functions);
		self
	}

	pub fn with_context(mut self, ctx: Context) -> ExecuteOptions {
		self.ctx = ctx;
		self
	}
}

/// Parse, plan and execute a query, returning the lazy row stream.
/// Nothing is scanned until the stream is polled; cancelling the
/// context ends the stream cleanly at the next row boundary.
pub fn execute(sql: &str, options: ExecuteOptions) -> Result<RowStream, Error> {
	let statement = parse_with(sql, &options.functions)?;
	let plan = plan_statement(&statement)?;
	Ok(execute_plan(&plan, options))
}

/// Execute a previously built plan.
pub fn execute_plan(plan: &PlanNode, options: ExecuteOptions) -> RowStream {
	let env = QueryEnv::new(options.ctx, options.catalog, options.functions);
	let operator = dbs::iterate::build(plan);
	operator_stream(operator, env)
}

fn operator_stream(operator: BoxOperator, env: QueryEnv) -> RowStream {
	Box::pin(futures::stream::try_unfold(
		(operator, env),
		|(mut operator, env)| async move {
			match operator.next(&env).await? {
				Some(row) => Ok(Some((row, (operator, env)))),
				None => Ok(None),
			}
		},
	))
}

/// Materialize a row stream, forcing every cell of every row into a
/// plain mapping.
pub async fn collect(mut rows: RowStream) -> Result<Vec<Object>, Error> {
	use futures::StreamExt;
	let mut out = Vec::new();
	while let Some(row) = rows.next().await {
		out.push(row?.to_object().await?);
	}
	Ok(out)
}

/// Wrap a data source so cell results are memoized per row index and
/// column name, shared across every scan of the wrapper. Intended to be
/// owned by the caller and reused between queries.
pub fn cached(source: Arc<dyn DataSource>) -> Arc<dyn DataSource> {
	Arc::new(CachedSource::new(source))
}

/// Estimate the worst-case cost of a query from table statistics: rows
/// scanned weighted by the touched columns, with join inputs
/// multiplied. Returns `Ok(None)` when any touched table lacks
/// statistics.
pub fn estimate_cost(sql: &str, options: &ExecuteOptions) -> Result<Option<f64>, Error> {
	let statement = parse_with(sql, &options.functions)?;
	let plan = plan_statement(&statement)?;
	let env = QueryEnv::new(
		options.ctx.clone(),
		options.catalog.clone(),
		options.functions.clone(),
	);
	Ok(plan::cost::estimate(&plan, &env))
}
