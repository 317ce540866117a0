//! Named-query database access.
//!
//! Every statement is a [`Query`]: a name, a statement and its arguments.
//! Backends implement [`Db`]. [`Database`] runs queries against SQLite and
//! attributes every failure to the query that caused it; [`MockDb`] answers
//! queries from scripted hooks so code can be tested without a database.
//!
//! ```
//! use qdb::{dests, values, Context, Database, Db, Query};
//!
//! let db = Database::open_in_memory()?;
//! let ctx = Context::background();
//! db.exec(&ctx, &Query::new("create", "CREATE TABLE people (name TEXT, age INTEGER)"))?;
//! db.exec(
//!     &ctx,
//!     &Query::with_args("insert", "INSERT INTO people VALUES (?1, ?2)", values!["Abby", 20]),
//! )?;
//!
//! let (mut name, mut age) = (String::new(), 0u8);
//! db.query_row(&ctx, &Query::new("oldest", "SELECT name, age FROM people"))
//!     .scan(dests![name, age])?;
//! assert_eq!((name.as_str(), age), ("Abby", 20));
//! # Ok::<(), qdb::Error>(())
//! ```

// Core infrastructure modules
pub mod core;

pub mod config;
pub mod logging;
pub mod mock;

pub use crate::config::{Config, DatabaseConfig, LoggingConfig};
pub use crate::core::context::{CancelHandle, Context};
pub use crate::core::convert::{assign_row, ConversionError, ConvertErrorKind, ScanDest};
pub use crate::core::db::{
    expect_rows_affected, Conn, Database, Db, ExecResult, Query, Row, Rows, SqliteConn,
    StatementType, Transaction, TransactionState, Tx, TxBehavior, TxConn, TxOptions,
};
pub use crate::core::error::{Error, QueryError, Result};
pub use crate::core::value::{format_timestamp, Value};
pub use crate::mock::{HookHandle, HookRegistry, MockDb, MockError};
