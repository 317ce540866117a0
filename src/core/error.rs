//! qdb Error Module
//!
//! One crate-wide error enum covers every failure the access layer can
//! report. Driver errors that are not `Clone` are held behind an `Arc` so a
//! decorated result object can hand the same cached error out repeatedly.

use std::sync::Arc;

use thiserror::Error;

use crate::core::convert::ConversionError;
use crate::core::db::query::Query;
use crate::mock::MockError;

/// Errors produced by the access layer, its drivers and the mock backend.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A single-row query matched nothing.
    #[error("sql: no rows in result set")]
    NoRows,

    /// Commit or rollback was called on a transaction that already completed.
    #[error("sql: transaction has already been committed or rolled back")]
    TxDone,

    /// Begin was called on a handle that is already a transaction.
    #[error("tx: already in transaction")]
    AlreadyInTx,

    /// A backend failure attributed to the query that caused it.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A test-setup defect reported by the mock backend.
    #[error(transparent)]
    Mock(#[from] MockError),

    /// A stored value could not be assigned to its scan destination.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// `scan` was called without a current row.
    #[error("sql: Scan called without calling Next")]
    NoCurrentRow,

    /// The number of scan destinations did not match the row width.
    #[error("sql: expected {expected} destination arguments in scan, not {got}")]
    ColumnCount { expected: usize, got: usize },

    /// The caller's context was cancelled.
    #[error("context canceled")]
    Canceled,

    /// The caller's context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Failure reported by the SQLite driver.
    #[error("sqlite: {0}")]
    Sqlite(Arc<rusqlite::Error>),

    /// Configuration loading and validation errors
    #[error("configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Sqlite(Arc::new(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl Error {
    /// Returns the innermost error, looking through any `QueryError` layers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Query(q) = current {
            current = q.cause();
        }
        current
    }

    /// True when this is, or wraps, the no-rows sentinel.
    pub fn is_no_rows(&self) -> bool {
        matches!(self.root_cause(), Error::NoRows)
    }

    /// True when this is, or wraps, a context cancellation or deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.root_cause(), Error::Canceled | Error::DeadlineExceeded)
    }

    /// Wraps `self` with the query it originated from.
    pub(crate) fn with_query(self, query: &Arc<Query>) -> Error {
        Error::Query(QueryError::new(self, Arc::clone(query)))
    }
}

/// Describes an error that occurred while processing the result of a query,
/// whether at query time or at scan time.
///
/// Only the wrapping layer builds these; callers receive them inside
/// [`Error::Query`].
#[derive(Error, Debug, Clone)]
#[error("query {:?}: {source}", .query.name())]
pub struct QueryError {
    source: Box<Error>,
    query: Arc<Query>,
}

impl QueryError {
    pub(crate) fn new(source: Error, query: Arc<Query>) -> Self {
        QueryError {
            source: Box::new(source),
            query,
        }
    }

    /// The underlying failure.
    pub fn cause(&self) -> &Error {
        &self.source
    }

    /// The query this error is attributed to.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_name(&self) -> &str {
        self.query.name()
    }

    /// The statement text, for logging.
    pub fn query_body(&self) -> &str {
        self.query.statement()
    }

    /// The bound arguments, for logging.
    pub fn query_args(&self) -> &[crate::core::value::Value] {
        self.query.args()
    }
}

/// Type alias for Result to use the crate [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
