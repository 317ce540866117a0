//! Scripted in-process backend for tests.
//!
//! `MockDb` answers queries by name from a [`HookRegistry`] instead of
//! talking to a database. Its errors are returned as-is, without the
//! query wrapping the live backend applies.

mod cursor;
mod hooks;
mod tx;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::core::context::Context;
use crate::core::db::{Db, ExecResult, Query, Row, Rows, Tx, TxOptions};
use crate::core::error::Result;
use crate::core::value::Value;

pub use cursor::{MockResult, MockRow, MockRows};
pub use hooks::{HookHandle, HookRegistry, QueryHook, ResultProvider, RowProvider, RowsProvider};
pub use tx::MockTx;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    #[error("mockdb: no query hook found")]
    NoHook,

    #[error("mockdb: query hook has no rows provider")]
    RowsProviderAbsent,

    #[error("mockdb: query hook has no row provider")]
    RowProviderAbsent,

    #[error("mockdb: query hook has no result provider")]
    ResultProviderAbsent,

    #[error("mockdb: no rows available")]
    NoRowAvailable,

    #[error("mockdb: rows are closed")]
    Closed,
}

/// A `Db` whose answers come from registered hooks.
#[derive(Clone, Default)]
pub struct MockDb {
    registry: Arc<HookRegistry>,
}

impl MockDb {
    /// Creates a mock with its own empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock over a shared registry.
    pub fn with_registry(registry: Arc<HookRegistry>) -> Self {
        MockDb { registry }
    }

    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Registers all three providers for `name` at once, replacing any
    /// hook already registered under it.
    pub fn add_hook(
        &self,
        name: &str,
        rows: Option<RowsProvider>,
        row: Option<RowProvider>,
        result: Option<ResultProvider>,
    ) -> HookHandle {
        self.registry.register(name, rows, row, result)
    }

    pub fn add_query_hook<F>(&self, name: &str, rows: F) -> HookHandle
    where
        F: Fn() -> Vec<Vec<Value>> + Send + Sync + 'static,
    {
        self.add_hook(name, Some(Box::new(rows)), None, None)
    }

    pub fn add_query_row_hook<F>(&self, name: &str, row: F) -> HookHandle
    where
        F: Fn() -> Vec<Value> + Send + Sync + 'static,
    {
        self.add_hook(name, None, Some(Box::new(row)), None)
    }

    pub fn add_query_result_hook<F>(&self, name: &str, result: F) -> HookHandle
    where
        F: Fn() -> (i64, i64) + Send + Sync + 'static,
    {
        self.add_hook(name, None, None, Some(Box::new(result)))
    }

    pub fn remove_hook(&self, name: &str) {
        self.registry.remove(name);
    }

    pub fn clear_hooks(&self) {
        self.registry.clear();
    }
}

pub(crate) fn dispatch_query(registry: &HookRegistry, query: &Query) -> Result<Box<dyn Rows>> {
    debug!(query = query.name(), "mock query");
    let hook = registry.lookup(query.name()).ok_or(MockError::NoHook)?;
    let provider = hook.rows.as_ref().ok_or(MockError::RowsProviderAbsent)?;
    hook.trigger();
    Ok(Box::new(MockRows::new(provider())))
}

pub(crate) fn dispatch_query_row(registry: &HookRegistry, query: &Query) -> Box<dyn Row> {
    debug!(query = query.name(), "mock query_row");
    let Some(hook) = registry.lookup(query.name()) else {
        return Box::new(MockRow::failed(MockError::NoHook));
    };
    let Some(provider) = hook.row.as_ref() else {
        return Box::new(MockRow::failed(MockError::RowProviderAbsent));
    };
    hook.trigger();
    Box::new(MockRow::new(provider()))
}

pub(crate) fn dispatch_exec(registry: &HookRegistry, query: &Query) -> Result<Box<dyn ExecResult>> {
    debug!(query = query.name(), "mock exec");
    let hook = registry.lookup(query.name()).ok_or(MockError::NoHook)?;
    let provider = hook.result.as_ref().ok_or(MockError::ResultProviderAbsent)?;
    hook.trigger();
    Ok(Box::new(MockResult::new(provider())))
}

impl Db for MockDb {
    fn query(&self, _ctx: &Context, query: &Query) -> Result<Box<dyn Rows>> {
        dispatch_query(&self.registry, query)
    }

    fn query_row(&self, _ctx: &Context, query: &Query) -> Box<dyn Row> {
        dispatch_query_row(&self.registry, query)
    }

    fn exec(&self, _ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>> {
        dispatch_exec(&self.registry, query)
    }

    fn begin(&self, _ctx: &Context, _opts: TxOptions) -> Result<Box<dyn Tx>> {
        Ok(Box::new(MockTx::new(Arc::clone(&self.registry))))
    }

    fn ping(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}
