//! SQLite Driver Module
//!
//! Connection setup, transaction control and statement execution on top of
//! `rusqlite`. Results are read fully while the connection lock is held and
//! handed back as in-memory cursors, so no borrow of the connection outlives
//! a call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params_from_iter, Connection, ErrorCode};
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::core::context::Context;
use crate::core::convert::{assign_row, ScanDest};
use crate::core::db::driver::{Conn, TxConn};
use crate::core::db::query::Query;
use crate::core::db::result::{ExecResult, Row, Rows};
use crate::core::db::TxOptions;
use crate::core::error::{Error, Result};
use crate::core::value::Value;

/// Number of SQLite VM instructions between context checks.
const PROGRESS_OPS: i32 = 1000;

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
}

/// A SQLite driver connection.
///
/// One connection is shared by the handle and any transaction begun on it,
/// so statements issued on the handle while a transaction is open run
/// inside that transaction.
pub struct SqliteConn {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteConn {
    /// Connects to a SQLite database at the specified path, or an
    /// in-memory database for `":memory:"`, with default settings.
    pub fn open(path: &str) -> Result<Self> {
        SqliteConn::open_with(&DatabaseConfig {
            path: path.to_string(),
            ..DatabaseConfig::default()
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        SqliteConn::open(":memory:")
    }

    /// Connects and applies the configured pragmas.
    pub fn open_with(config: &DatabaseConfig) -> Result<Self> {
        let in_memory = config.path == ":memory:";
        let conn = if in_memory {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.path)?
        };

        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        if !in_memory {
            if let Some(mode) = &config.journal_mode {
                let applied: String =
                    conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
                debug!(requested = %mode, applied = %applied, "journal mode set");
            }
        }

        debug!(path = %config.path, "sqlite connection opened");
        Ok(SqliteConn {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn transaction_state(&self) -> TransactionState {
        transaction_state(&lock(&self.conn))
    }
}

fn transaction_state(conn: &Connection) -> TransactionState {
    if conn.is_autocommit() {
        TransactionState::Autocommit
    } else {
        TransactionState::Transaction
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_interrupt(err: &Error) -> bool {
    match err {
        Error::Sqlite(e) => matches!(
            e.as_ref(),
            rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::OperationInterrupted
        ),
        _ => false,
    }
}

/// Runs `call` with the context wired into SQLite's progress handler, so a
/// cancelled or expired context interrupts the statement in flight.
fn with_context<T>(conn: &Connection, ctx: &Context, call: impl FnOnce() -> Result<T>) -> Result<T> {
    if let Some(err) = ctx.err() {
        return Err(err);
    }

    let watched = ctx.clone();
    conn.progress_handler(PROGRESS_OPS, Some(move || watched.is_done()));
    let result = call();
    conn.progress_handler(PROGRESS_OPS, None::<fn() -> bool>);

    result.map_err(|err| match ctx.err() {
        Some(ctx_err) if is_interrupt(&err) => ctx_err,
        _ => err,
    })
}

fn run_query(conn: &Connection, ctx: &Context, query: &Query) -> Result<SqliteRows> {
    with_context(conn, ctx, || {
        let mut stmt = conn.prepare(query.statement())?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(query.args()))?;
        let mut data = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(Value::from(row.get_ref(i)?));
            }
            data.push(values);
        }
        Ok(SqliteRows::new(columns, data))
    })
}

fn run_query_row(conn: &Connection, ctx: &Context, query: &Query) -> SqliteRow {
    let values = run_query(conn, ctx, query)
        .and_then(|rows| rows.data.into_iter().next().ok_or(Error::NoRows));
    SqliteRow { values }
}

fn run_exec(conn: &Connection, ctx: &Context, query: &Query) -> Result<SqliteResult> {
    with_context(conn, ctx, || {
        let mut stmt = conn.prepare(query.statement())?;
        let affected = stmt.execute(params_from_iter(query.args()))?;
        Ok(SqliteResult {
            last_insert_id: conn.last_insert_rowid(),
            rows_affected: i64::try_from(affected).unwrap_or(i64::MAX),
        })
    })
}

impl Conn for SqliteConn {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>> {
        let rows = run_query(&lock(&self.conn), ctx, query)?;
        Ok(Box::new(rows))
    }

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row> {
        Box::new(run_query_row(&lock(&self.conn), ctx, query))
    }

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>> {
        let result = run_exec(&lock(&self.conn), ctx, query)?;
        Ok(Box::new(result))
    }

    fn begin(&self, ctx: &Context, opts: &TxOptions) -> Result<Box<dyn TxConn>> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let conn = lock(&self.conn);
        conn.execute_batch(opts.behavior.begin_sql())?;
        if opts.read_only {
            if let Err(e) = conn.pragma_update(None, "query_only", true) {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback_err, "rollback after failed read-only setup failed");
                }
                return Err(e.into());
            }
        }

        Ok(Box::new(SqliteTx {
            conn: Arc::clone(&self.conn),
            read_only: opts.read_only,
        }))
    }

    fn ping(&self, ctx: &Context) -> Result<()> {
        let conn = lock(&self.conn);
        with_context(&conn, ctx, || {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

/// A SQLite transaction on a shared connection.
struct SqliteTx {
    conn: Arc<Mutex<Connection>>,
    read_only: bool,
}

impl SqliteTx {
    /// Ends the transaction with `sql`. If SQLite refuses to end it (a
    /// deferred constraint failing at COMMIT, or a busy lock) the
    /// transaction is rolled back, so the shared connection always leaves
    /// here in autocommit mode.
    fn finish(&self, sql: &str) -> Result<()> {
        let conn = lock(&self.conn);
        let result = conn.execute_batch(sql).map_err(Error::from);
        if result.is_err() && transaction_state(&conn) == TransactionState::Transaction {
            warn!(statement = sql, "transaction still open after failed finish, rolling back");
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback after failed finish failed");
            }
        }
        if self.read_only {
            conn.pragma_update(None, "query_only", false)?;
        }
        result
    }
}

impl TxConn for SqliteTx {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>> {
        let rows = run_query(&lock(&self.conn), ctx, query)?;
        Ok(Box::new(rows))
    }

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row> {
        Box::new(run_query_row(&lock(&self.conn), ctx, query))
    }

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>> {
        let result = run_exec(&lock(&self.conn), ctx, query)?;
        Ok(Box::new(result))
    }

    fn commit(&self) -> Result<()> {
        self.finish("COMMIT")
    }

    fn rollback(&self) -> Result<()> {
        self.finish("ROLLBACK")
    }
}

/// A fully-read SQLite result set.
struct SqliteRows {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
    current: Option<usize>,
    closed: bool,
}

impl SqliteRows {
    fn new(columns: Vec<String>, data: Vec<Vec<Value>>) -> Self {
        SqliteRows {
            columns,
            data,
            current: None,
            closed: false,
        }
    }
}

impl Rows for SqliteRows {
    fn advance(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.data.len() {
            self.current = Some(next);
            true
        } else {
            self.current = None;
            self.closed = true;
            false
        }
    }

    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match self.current {
            Some(i) if !self.closed => assign_row(&self.data[i], dest),
            _ => Err(Error::NoCurrentRow),
        }
    }

    fn columns(&self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        Ok(())
    }

    fn err(&self) -> Result<()> {
        Ok(())
    }
}

struct SqliteRow {
    values: Result<Vec<Value>>,
}

impl Row for SqliteRow {
    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match &self.values {
            Ok(values) => assign_row(values, dest),
            Err(err) => Err(err.clone()),
        }
    }
}

struct SqliteResult {
    last_insert_id: i64,
    rows_affected: i64,
}

impl ExecResult for SqliteResult {
    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_id)
    }

    fn rows_affected(&self) -> Result<i64> {
        Ok(self.rows_affected)
    }
}
