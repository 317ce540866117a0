use std::sync::Arc;

use crate::core::context::Context;
use crate::core::db::{Db, ExecResult, Query, Row, Rows, Tx, TxOptions};
use crate::core::error::{Error, Result};
use crate::mock::{dispatch_exec, dispatch_query, dispatch_query_row, HookRegistry};

/// A mock transaction. It answers from the same hooks as the `MockDb` that
/// began it; `commit` and `rollback` do nothing.
#[derive(Clone)]
pub struct MockTx {
    registry: Arc<HookRegistry>,
}

impl MockTx {
    pub(crate) fn new(registry: Arc<HookRegistry>) -> Self {
        MockTx { registry }
    }
}

impl Db for MockTx {
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
        Err(Error::AlreadyInTx)
    }

    fn ping(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

impl Tx for MockTx {
    fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDb;

    #[test]
    fn test_tx_shares_hooks_and_rejects_nesting() {
        let db = MockDb::new();
        let hook = db.add_query_result_hook("bump", || (0, 3));
        let ctx = Context::background();

        let tx = db.begin(&ctx, TxOptions::default()).unwrap();
        let res = tx.exec(&ctx, &Query::new("bump", "UPDATE t SET n = n + 1")).unwrap();
        assert_eq!(res.rows_affected().unwrap(), 3);
        assert_eq!(hook.triggered(), 1);

        assert!(matches!(
            tx.begin(&ctx, TxOptions::default()),
            Err(Error::AlreadyInTx)
        ));
        tx.commit().unwrap();
        tx.rollback().unwrap();
        tx.ping(&ctx).unwrap();
    }
}
