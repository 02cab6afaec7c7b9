use crate::ctx::Context;
use crate::err::Error;
use crate::sql::expression::Expr;
use crate::tbl::row::Row;
use crate::tbl::statistics::Statistics;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// The rows produced by a data source scan.
pub type RowStream = BoxStream<'static, Result<Row, Error>>;

/// The pushdown hints passed to a scan. Every hint is optional and a
/// source is free to ignore any of them, declaring what it honored on
/// the returned [`Scan`].
#[derive(Clone, Debug, Default)]
pub struct ScanHints {
	/// The column subset the query will touch; absence means every
	/// column must be available. A source may return extra columns, but
	/// requested columns it does not know must still appear as null
	/// cells.
	pub columns: Option<Vec<String>>,
	/// The WHERE predicate, for sources able to filter during the scan
	pub predicate: Option<Expr>,
	pub limit: Option<usize>,
	pub offset: Option<usize>,
}

/// The options passed to [`DataSource::scan`].
#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
	/// The cancellation context of the running query
	pub ctx: Context,
	pub hints: ScanHints,
}

impl ScanOptions {
	pub fn new(ctx: Context, hints: ScanHints) -> Self {
		Self {
			ctx,
			hints,
		}
	}
}

/// The result of a scan: the row stream plus the declaration of which
/// hints the source honored. The executor reconstructs whatever the
/// source declined.
pub struct Scan {
	pub rows: RowStream,
	/// Whether the predicate hint was applied during the scan
	pub applied_predicate: bool,
	/// Whether the limit and offset hints were applied during the scan
	pub applied_limit_offset: bool,
}

impl Scan {
	/// A scan which applied no hints.
	pub fn raw(rows: RowStream) -> Scan {
		Scan {
			rows,
			applied_predicate: false,
			applied_limit_offset: false,
		}
	}
}

/// A pluggable, read-only source of rows.
///
/// Repeated scans of one source yield deterministic row sequences. A
/// source MUST NOT claim `applied_limit_offset` without also claiming
/// `applied_predicate` when a predicate hint was given; limiting
/// unfiltered rows would change the result. The executor rejects that
/// combination as a protocol violation.
#[async_trait]
pub trait DataSource: Send + Sync {
	/// Start scanning rows with the given pushdown hints.
	async fn scan(&self, options: ScanOptions) -> Result<Scan, Error>;

	/// Optional table statistics used for cost estimation.
	fn statistics(&self) -> Option<Statistics> {
		None
	}
}
