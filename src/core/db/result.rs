//! Result capabilities.
//!
//! Every backend hands back results through these three traits, so callers
//! drive a live cursor and a scripted mock cursor the same way.

use crate::core::convert::ScanDest;
use crate::core::error::{Error, Result};

/// A single-row result. Errors from the query itself surface on `scan`.
pub trait Row: Send + Sync {
    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()>;
}

/// A multi-row cursor consumed with `advance` then `scan`.
pub trait Rows: Send + Sync {
    /// Moves to the next row. Returns `false` when exhausted, closed, or
    /// after an error; check [`Rows::err`] to tell them apart.
    fn advance(&mut self) -> bool;

    /// Copies the current row into `dest`.
    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()>;

    fn columns(&self) -> Result<Vec<String>>;

    fn close(&mut self) -> Result<()>;

    /// The error, if any, that ended iteration.
    fn err(&self) -> Result<()>;
}

/// The outcome of a statement that modifies data.
pub trait ExecResult: Send + Sync {
    fn last_insert_id(&self) -> Result<i64>;
    fn rows_affected(&self) -> Result<i64>;
}

/// Checks a mutation's rows-affected count.
///
/// Returns `Ok(true)` when the count matched, `Err(err_if_not)` when it was
/// read but differed, and `Ok(false)` when the count could not be read at
/// all. A failed read does not mean the statement failed, so that case is
/// reported as "unknown" rather than as an error.
pub fn expect_rows_affected(res: &dyn ExecResult, expected: i64, err_if_not: Error) -> Result<bool> {
    match res.rows_affected() {
        Err(_) => Ok(false),
        Ok(count) if count != expected => Err(err_if_not),
        Ok(_) => Ok(true),
    }
}
