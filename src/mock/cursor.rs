//! Scripted result objects.

use crate::core::convert::{assign_row, ScanDest};
use crate::core::db::{ExecResult, Row, Rows};
use crate::core::error::{Error, Result};
use crate::core::value::Value;
use crate::mock::MockError;

/// A cursor over provider-supplied rows.
#[derive(Debug)]
pub struct MockRows {
    values: Vec<Vec<Value>>,
    // Index of the current row; `None` before the first `advance`.
    current: Option<usize>,
    last_err: Option<Error>,
    closed: bool,
}

impl MockRows {
    pub(crate) fn new(values: Vec<Vec<Value>>) -> Self {
        MockRows {
            values,
            current: None,
            last_err: None,
            closed: false,
        }
    }

    fn scan_current(&self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        if self.closed {
            return Err(MockError::Closed.into());
        }
        let row = self
            .current
            .and_then(|idx| self.values.get(idx))
            .ok_or(MockError::NoRowAvailable)?;
        if row.is_empty() {
            return Err(Error::NoRows);
        }
        assign_row(row, dest)
    }
}

impl Rows for MockRows {
    fn advance(&mut self) -> bool {
        if self.closed || self.last_err.is_some() {
            return false;
        }
        let next = self.current.map_or(0, |idx| idx + 1);
        if next < self.values.len() {
            self.current = Some(next);
            true
        } else {
            self.current = Some(self.values.len());
            false
        }
    }

    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        if let Some(err) = &self.last_err {
            return Err(err.clone());
        }
        let res = self.scan_current(dest);
        if let Err(err) = &res {
            self.last_err = Some(err.clone());
        }
        res
    }

    fn columns(&self) -> Result<Vec<String>> {
        if self.closed {
            return Err(MockError::Closed.into());
        }
        let width = self.values.first().map_or(0, Vec::len);
        Ok(vec![String::new(); width])
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn err(&self) -> Result<()> {
        match &self.last_err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// A single scripted row, or the error that replaced it.
#[derive(Debug)]
pub struct MockRow {
    values: Result<Vec<Value>>,
}

impl MockRow {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        MockRow { values: Ok(values) }
    }

    pub(crate) fn failed(err: impl Into<Error>) -> Self {
        MockRow {
            values: Err(err.into()),
        }
    }
}

impl Row for MockRow {
    fn scan(&mut self, dest: &mut [&mut dyn ScanDest]) -> Result<()> {
        match &self.values {
            Err(err) => Err(err.clone()),
            Ok(values) if values.is_empty() => Err(Error::NoRows),
            Ok(values) => assign_row(values, dest),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MockResult {
    last_insert_id: i64,
    rows_affected: i64,
}

impl MockResult {
    pub(crate) fn new((last_insert_id, rows_affected): (i64, i64)) -> Self {
        MockResult {
            last_insert_id,
            rows_affected,
        }
    }
}

impl ExecResult for MockResult {
    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.last_insert_id)
    }

    fn rows_affected(&self) -> Result<i64> {
        Ok(self.rows_affected)
    }
}
