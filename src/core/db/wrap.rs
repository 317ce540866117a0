//! Error-wrapping decorators.
//!
//! `Database` and `Transaction` wrap every driver result in one of these.
//! Each decorated object owns a single lock around its cached error: a call
//! takes the lock, returns the cached error if one is set, otherwise calls
//! the driver and stores the wrapped failure before returning it. Once an
//! error is cached the driver object is never called again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::convert::ScanDest;
use crate::core::db::query::Query;
use crate::core::db::result::{ExecResult, Row, Rows};
use crate::core::error::{Error, Result};

type ErrorSlot = Mutex<Option<Error>>;

fn lock(slot: &ErrorSlot) -> MutexGuard<'_, Option<Error>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `call` unless an error is already cached; caches its failure.
fn guarded<T>(slot: &ErrorSlot, query: &Arc<Query>, call: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut last_err = lock(slot);
    if let Some(err) = last_err.as_ref() {
        return Err(err.clone());
    }

    match call() {
        Ok(value) => Ok(value),
        Err(err) => {
            let err = err.with_query(query);
            *last_err = Some(err.clone());
            Err(err)
        }
    }
}

/// Wraps a multi-row cursor.
pub(crate) struct WrappedRows {
    query: Arc<Query>,
    rows: Box<dyn Rows>,
    last_err: ErrorSlot,
}

impl Rows for WrappedRows {
    fn advance(&mut self) -> bool {
        let rows = &mut self.rows;
        guarded(&self.last_err, &self.query, || Ok(rows.advance())).unwrap_or(false)
    }

    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        let rows = &mut self.rows;
        guarded(&self.last_err, &self.query, || rows.scan(dest))
    }

    fn columns(&self) -> Result<Vec<String>> {
        guarded(&self.last_err, &self.query, || self.rows.columns())
    }

    fn close(&mut self) -> Result<()> {
        self.rows.close()
    }

    fn err(&self) -> Result<()> {
        guarded(&self.last_err, &self.query, || self.rows.err())
    }
}

/// Wraps a single-row result.
pub(crate) struct WrappedRow {
    query: Arc<Query>,
    row: Box<dyn Row>,
    last_err: ErrorSlot,
}

impl Row for WrappedRow {
    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        let row = &mut self.row;
        guarded(&self.last_err, &self.query, || row.scan(dest))
    }
}

/// Wraps a mutation outcome.
pub(crate) struct WrappedResult {
    query: Arc<Query>,
    result: Box<dyn ExecResult>,
    last_err: ErrorSlot,
}

impl ExecResult for WrappedResult {
    fn last_insert_id(&self) -> Result<i64> {
        guarded(&self.last_err, &self.query, || self.result.last_insert_id())
    }

    fn rows_affected(&self) -> Result<i64> {
        guarded(&self.last_err, &self.query, || self.result.rows_affected())
    }
}

/// Combines a query and the outcome of opening its cursor.
pub(crate) fn wrap_rows(query: &Query, opened: Result<Box<dyn Rows>>) -> Result<Box<dyn Rows>> {
    let query = Arc::new(query.clone());
    match opened {
        Err(err) => Err(err.with_query(&query)),
        Ok(rows) => Ok(Box::new(WrappedRows {
            query,
            rows,
            last_err: Mutex::new(None),
        })),
    }
}

pub(crate) fn wrap_row(query: &Query, row: Box<dyn Row>) -> Box<dyn Row> {
    Box::new(WrappedRow {
        query: Arc::new(query.clone()),
        row,
        last_err: Mutex::new(None),
    })
}

pub(crate) fn wrap_result(
    query: &Query,
    opened: Result<Box<dyn ExecResult>>,
) -> Result<Box<dyn ExecResult>> {
    let query = Arc::new(query.clone());
    match opened {
        Err(err) => Err(err.with_query(&query)),
        Ok(result) => Ok(Box::new(WrappedResult {
            query,
            result,
            last_err: Mutex::new(None),
        })),
    }
}
