//! Database Module
//!
//! The query surface shared by every backend, organized into focused
//! submodules:
//!
//! - **Queries** (`query.rs`): named statements and their arguments
//! - **Results** (`result.rs`): the `Row`, `Rows` and `ExecResult` capabilities
//! - **Wrapping** (`wrap.rs`): decorators that attribute errors to queries
//! - **Drivers** (`driver.rs`, `connection.rs`): the driver seam and the SQLite driver
//! - **Access layer** (`database.rs`, `transaction.rs`): `Database` and `Transaction`
//!
//! Two implementations of [`Db`] exist: [`Database`] over a live driver, and
//! [`MockDb`](crate::mock::MockDb) for tests. Callers pick one at
//! construction time and code against `&dyn Db`.

pub mod connection;
pub mod database;
pub mod driver;
pub mod query;
pub mod result;
pub mod transaction;
mod wrap;

pub use connection::*;
pub use database::Database;
pub use driver::{Conn, TxConn};
pub use query::*;
pub use result::*;
pub use transaction::Transaction;

use crate::core::context::Context;
use crate::core::error::Result;

/// The query surface of a backend handle.
pub trait Db: Send + Sync {
    /// Runs a statement that returns rows.
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>>;

    /// Runs a statement expected to return at most one row. Never fails
    /// itself; any error, including [`Error::NoRows`](crate::Error::NoRows),
    /// surfaces on [`Row::scan`].
    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row>;

    /// Runs a statement that modifies data.
    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>>;

    /// Starts a transaction. Nested transactions are not supported.
    fn begin(&self, ctx: &Context, opts: TxOptions) -> Result<Box<dyn Tx>>;

    fn ping(&self, ctx: &Context) -> Result<()>;
}

/// A transaction handle: the `Db` surface plus one-shot completion.
pub trait Tx: Db {
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

/// How a transaction acquires its locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxBehavior {
    #[default]
    Deferred,
    Immediate,
    Exclusive,
}

impl TxBehavior {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            TxBehavior::Deferred => "BEGIN DEFERRED",
            TxBehavior::Immediate => "BEGIN IMMEDIATE",
            TxBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// Options passed to [`Db::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub behavior: TxBehavior,
    /// Reject writes for the lifetime of the transaction.
    pub read_only: bool,
}

impl TxOptions {
    pub fn read_only() -> Self {
        TxOptions {
            read_only: true,
            ..TxOptions::default()
        }
    }

    pub fn immediate() -> Self {
        TxOptions {
            behavior: TxBehavior::Immediate,
            ..TxOptions::default()
        }
    }
}
