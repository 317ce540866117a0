//! Driver seam.
//!
//! A driver executes statements and returns raw, unwrapped results. The
//! access layer ([`Database`](crate::Database) and
//! [`Transaction`](crate::Transaction)) sits on top and adds error
//! attribution and the transaction lifecycle. The bundled driver is
//! [`SqliteConn`](crate::SqliteConn).

use crate::core::context::Context;
use crate::core::db::query::Query;
use crate::core::db::result::{ExecResult, Row, Rows};
use crate::core::db::TxOptions;
use crate::core::error::Result;

/// A non-transactional driver handle.
pub trait Conn: Send + Sync + 'static {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>>;

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row>;

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>>;

    fn begin(&self, ctx: &Context, opts: &TxOptions) -> Result<Box<dyn TxConn>>;

    fn ping(&self, ctx: &Context) -> Result<()>;
}

/// A driver transaction handle. The access layer guarantees `commit` or
/// `rollback` is called at most once, and never both.
pub trait TxConn: Send + Sync {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>>;

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row>;

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;
}
