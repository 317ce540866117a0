//! Transaction lifecycle.
//!
//! A `Transaction` is OPEN until the first `commit` or `rollback`, then DONE
//! for good. The completion flag sits behind its own lock so concurrent
//! completion attempts reach the driver at most once between them.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::core::context::Context;
use crate::core::db::driver::{Conn, TxConn};
use crate::core::db::query::Query;
use crate::core::db::result::{ExecResult, Row, Rows};
use crate::core::db::wrap::{wrap_result, wrap_row, wrap_rows};
use crate::core::db::{Db, Tx, TxOptions};
use crate::core::error::{Error, Result};

/// A live transaction.
///
/// Dropping it while still open rolls it back.
pub struct Transaction {
    parent: Arc<dyn Conn>,
    tx: Box<dyn TxConn>,
    done: Mutex<bool>,
}

impl Transaction {
    pub(crate) fn new(parent: Arc<dyn Conn>, tx: Box<dyn TxConn>) -> Self {
        Transaction {
            parent,
            tx,
            done: Mutex::new(false),
        }
    }

    pub fn is_done(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, action: &str, op: impl FnOnce(&dyn TxConn) -> Result<()>) -> Result<()> {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        if *done {
            return Err(Error::TxDone);
        }
        *done = true;
        debug!(action, "finishing transaction");
        op(self.tx.as_ref())
    }
}

impl Db for Transaction {
    fn query(&self, ctx: &Context, query: &Query) -> Result<Box<dyn Rows>> {
        debug!(query = query.name(), kind = query.kind().as_str(), "tx query");
        wrap_rows(query, self.tx.query(ctx, query))
    }

    fn query_row(&self, ctx: &Context, query: &Query) -> Box<dyn Row> {
        debug!(query = query.name(), kind = query.kind().as_str(), "tx query_row");
        wrap_row(query, self.tx.query_row(ctx, query))
    }

    fn exec(&self, ctx: &Context, query: &Query) -> Result<Box<dyn ExecResult>> {
        debug!(query = query.name(), kind = query.kind().as_str(), "tx exec");
        wrap_result(query, self.tx.exec(ctx, query))
    }

    fn begin(&self, _ctx: &Context, _opts: TxOptions) -> Result<Box<dyn Tx>> {
        Err(Error::AlreadyInTx)
    }

    fn ping(&self, ctx: &Context) -> Result<()> {
        self.parent.ping(ctx)
    }
}

impl Tx for Transaction {
    fn commit(&self) -> Result<()> {
        self.finish("commit", |tx| tx.commit())
    }

    fn rollback(&self) -> Result<()> {
        self.finish("rollback", |tx| tx.rollback())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let done = self.done.get_mut().unwrap_or_else(PoisonError::into_inner);
        if *done {
            return;
        }
        *done = true;
        warn!("transaction dropped while open, rolling back");
        if let Err(e) = self.tx.rollback() {
            warn!(error = %e, "rollback of dropped transaction failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        pings: AtomicUsize,
    }

    struct FakeConn(Arc<Counters>);
    struct FakeTx(Arc<Counters>);

    impl Conn for FakeConn {
        fn query(&self, _: &Context, _: &Query) -> Result<Box<dyn Rows>> {
            Err(Error::NoRows)
        }
        fn query_row(&self, _: &Context, _: &Query) -> Box<dyn Row> {
            unreachable!("not used")
        }
        fn exec(&self, _: &Context, _: &Query) -> Result<Box<dyn ExecResult>> {
            Err(Error::NoRows)
        }
        fn begin(&self, _: &Context, _: &TxOptions) -> Result<Box<dyn TxConn>> {
            Ok(Box::new(FakeTx(Arc::clone(&self.0))))
        }
        fn ping(&self, _: &Context) -> Result<()> {
            self.0.pings.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl TxConn for FakeTx {
        fn query(&self, _: &Context, _: &Query) -> Result<Box<dyn Rows>> {
            Err(Error::Canceled)
        }
        fn query_row(&self, _: &Context, _: &Query) -> Box<dyn Row> {
            unreachable!("not used")
        }
        fn exec(&self, _: &Context, _: &Query) -> Result<Box<dyn ExecResult>> {
            Err(Error::Canceled)
        }
        fn commit(&self) -> Result<()> {
            self.0.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn rollback(&self) -> Result<()> {
            self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn open_tx(counters: &Arc<Counters>) -> Transaction {
        let parent: Arc<dyn Conn> = Arc::new(FakeConn(Arc::clone(counters)));
        let tx = parent.begin(&Context::background(), &TxOptions::default()).unwrap();
        Transaction::new(parent, tx)
    }

    #[test]
    fn test_commit_then_rollback() {
        let counters = Arc::new(Counters::default());
        let tx = open_tx(&counters);

        tx.commit().unwrap();
        assert!(tx.is_done());
        assert!(matches!(tx.rollback(), Err(Error::TxDone)));
        assert!(matches!(tx.commit(), Err(Error::TxDone)));
        drop(tx);

        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_nested_begin_fails() {
        let counters = Arc::new(Counters::default());
        let tx = open_tx(&counters);
        assert!(matches!(
            tx.begin(&Context::background(), TxOptions::default()),
            Err(Error::AlreadyInTx)
        ));
    }

    #[test]
    fn test_ping_goes_to_parent() {
        let counters = Arc::new(Counters::default());
        let tx = open_tx(&counters);
        tx.ping(&Context::background()).unwrap();
        assert_eq!(counters.pings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tx_errors_are_query_wrapped() {
        let counters = Arc::new(Counters::default());
        let tx = open_tx(&counters);
        let err = tx
            .exec(&Context::background(), &Query::new("touch", "UPDATE t SET x = 1"))
            .err()
            .unwrap();
        match err {
            Error::Query(q) => {
                assert_eq!(q.query_name(), "touch");
                assert!(matches!(q.cause(), Error::Canceled));
            }
            other => panic!("Expected Query error, got {other:?}"),
        }
    }

    #[test]
    fn test_drop_rolls_back_open_transaction() {
        let counters = Arc::new(Counters::default());
        drop(open_tx(&counters));
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_completion_reaches_driver_once() {
        let counters = Arc::new(Counters::default());
        let tx = open_tx(&counters);

        let outcomes: Vec<bool> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let tx = &tx;
                    s.spawn(move || {
                        if i % 2 == 0 {
                            tx.commit().is_ok()
                        } else {
                            tx.rollback().is_ok()
                        }
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let total = counters.commits.load(Ordering::SeqCst) + counters.rollbacks.load(Ordering::SeqCst);
        assert_eq!(total, 1);
    }
}
