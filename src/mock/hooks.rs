//! Hook registry for the scripted backend.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::core::value::Value;

/// Produces the rows returned by `query`.
pub type RowsProvider = Box<dyn Fn() -> Vec<Vec<Value>> + Send + Sync>;
/// Produces the single row returned by `query_row`. An empty row means "no rows".
pub type RowProvider = Box<dyn Fn() -> Vec<Value> + Send + Sync>;
/// Produces `(last_insert_id, rows_affected)` for `exec`.
pub type ResultProvider = Box<dyn Fn() -> (i64, i64) + Send + Sync>;

/// Scripted responses for one query name.
pub struct QueryHook {
    name: String,
    triggered: AtomicUsize,
    pub(crate) rows: Option<RowsProvider>,
    pub(crate) row: Option<RowProvider>,
    pub(crate) result: Option<ResultProvider>,
}

impl QueryHook {
    pub(crate) fn trigger(&self) {
        self.triggered.fetch_add(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for QueryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHook")
            .field("name", &self.name)
            .field("triggered", &self.triggered.load(Ordering::SeqCst))
            .field("rows", &self.rows.is_some())
            .field("row", &self.row.is_some())
            .field("result", &self.result.is_some())
            .finish()
    }
}

/// A caller's view of a registered hook.
///
/// The handle stays bound to the hook it was returned for, even after that
/// hook is replaced or removed from the registry.
#[derive(Debug, Clone)]
pub struct HookHandle(Arc<QueryHook>);

impl HookHandle {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of successful dispatches to this hook so far.
    pub fn triggered(&self) -> usize {
        self.0.triggered.load(Ordering::SeqCst)
    }
}

/// Maps query names to hooks.
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<String, Arc<QueryHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook under `name`, replacing any previous one.
    pub fn register(
        &self,
        name: &str,
        rows: Option<RowsProvider>,
        row: Option<RowProvider>,
        result: Option<ResultProvider>,
    ) -> HookHandle {
        let hook = Arc::new(QueryHook {
            name: name.to_string(),
            triggered: AtomicUsize::new(0),
            rows,
            row,
            result,
        });
        trace!(hook = ?hook, "registering hook");

        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        hooks.insert(name.to_string(), Arc::clone(&hook));
        HookHandle(hook)
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        hooks.remove(name).is_some()
    }

    pub fn clear(&self) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up a hook. The returned `Arc` lets providers run after the
    /// registry lock is released.
    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<QueryHook>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
