//! The live access layer over a driver.

use std::sync::Arc;

use tracing::debug;

use crate::config::DatabaseConfig;
use crate::core::context::Context;
use crate::core::db::connection::SqliteConn;
use crate::core::db::driver::Conn;
use crate::core::db::query::Query;
use crate::core::db::result::{ExecResult, Row, Rows};
use crate::core::db::transaction::Transaction;
use crate::core::db::wrap::{wrap_result, wrap_row, wrap_rows};
use crate::core::db::{Db, Tx, TxOptions};
use crate::core::error::Result;

/// A non-transactional handle over a driver connection.
///
/// Every result it returns is wrapped so that failures carry the query
/// that caused them. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<dyn Conn>,
}

impl Database {
    pub fn new(conn: impl Conn) -> Self {
        Database {
            conn: Arc::new(conn),
        }
    }

    /// Opens a SQLite database at `path`, or in memory for `":memory:"`.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Database::new(SqliteConn::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Database::new(SqliteConn::open_in_memory()?))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Ok(Database::new(SqliteConn::open_with(config)?))
    }
}

impl Db for Database {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>> {
        debug!(query = query.name(), kind = query.kind().as_str(), "query");
        wrap_rows(query, self.conn.query(ctx, query))
    }

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row> {
        debug!(query = query.name(), kind = query.kind().as_str(), "query_row");
        wrap_row(query, self.conn.query_row(ctx, query))
    }

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>> {
        debug!(query = query.name(), kind = query.kind().as_str(), "exec");
        wrap_result(query, self.conn.exec(ctx, query))
    }

    fn begin(&self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>> {
        let tx = self.conn.begin(ctx, &opts)?;
        debug!(behavior = ?opts.behavior, read_only = opts.read_only, "begin");
        Ok(Box::new(Transaction::new(Arc::clone(&self.conn), tx)))
    }

    fn ping(&self, ctx: &Context) -> Result<()> {
        self.conn.ping(ctx)
    }
}
