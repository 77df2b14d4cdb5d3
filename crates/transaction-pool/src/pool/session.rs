//! The block builder's window into the pool.

use crate::{
    config::SESSION_LEASE_TIMEOUT,
    pool::{
        events::PoolEventKind,
        executables::{ExecutableHeap, ExecutableRef},
        PoolInner, PoolState, ResetRequest,
    },
    validate::PooledTransaction,
};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};
use tracing::{debug, trace};

/// Exclusive lease taken by [`BuildSession`]s.
///
/// While a live, unexpired lease is held, incoming resets are buffered so the
/// builder never observes the promoted queues shifting underneath it. The
/// timeout bounds how long a stalled builder can hold resets back.
#[derive(Debug, Default)]
pub(crate) struct SessionLease {
    state: Mutex<LeaseState>,
    buffered: Mutex<Vec<ResetRequest>>,
}

#[derive(Debug, Default)]
struct LeaseState {
    active: bool,
    started: Option<Instant>,
}

impl SessionLease {
    /// Stamps the lease for a new session.
    pub(crate) fn acquire(&self) {
        let mut state = self.state.lock();
        state.active = true;
        state.started = Some(Instant::now());
    }

    /// Buffers `req` while the lease is live; hands it back otherwise.
    pub(crate) fn defer(&self, req: ResetRequest) -> Option<ResetRequest> {
        let state = self.state.lock();
        let live = state.active
            && state.started.is_some_and(|started| started.elapsed() < SESSION_LEASE_TIMEOUT);
        if live {
            self.buffered.lock().push(req);
            None
        } else {
            Some(req)
        }
    }

    /// Releases the lease and returns everything buffered during it.
    pub(crate) fn release(&self) -> Vec<ResetRequest> {
        let mut state = self.state.lock();
        state.active = false;
        state.started = None;
        drop(state);
        std::mem::take(&mut *self.buffered.lock())
    }
}

/// Exclusive block-building window over a snapshot of the executables set.
///
/// [`TxPool::prepare`] hands one out; the builder then alternates between
/// [`pop`](Self::pop) and one of the removal verbs until it is done. Dropping
/// the session releases the lease and replays any buffered resets.
///
/// [`TxPool::prepare`]: crate::TxPool::prepare
#[derive(Debug)]
pub struct BuildSession<'a> {
    inner: &'a Arc<PoolInner>,
    snapshot: ExecutableHeap,
}

impl<'a> BuildSession<'a> {
    pub(crate) fn new(inner: &'a Arc<PoolInner>) -> Self {
        inner.lease.acquire();
        let snapshot = inner.pool.read().executables.clone();
        trace!(target: "txpool", heads = snapshot.len(), "build session prepared");
        Self { inner, snapshot }
    }

    /// Returns the highest-priced executable transaction.
    ///
    /// Heap entries are positional hints; each candidate is checked against
    /// the live promoted front of its account and stale hints are skipped.
    pub fn pop(&mut self) -> Option<Arc<PooledTransaction>> {
        loop {
            let candidate = self.snapshot.pop_best()?;
            let pool = self.inner.pool.read();
            let Some(account) = pool.registry.get(candidate.sender) else { continue };
            match account.first_promoted() {
                Some(front) if front.hash() == candidate.hash => return Some(front.clone()),
                _ => {
                    trace!(target: "txpool", hash = ?candidate.hash, "skipping stale executable hint");
                }
            }
        }
    }

    /// Removes a successfully executed transaction and surfaces the
    /// account's next promoted head, if any.
    pub fn remove_executed(&mut self, tx: &PooledTransaction) {
        let mut pool = self.inner.pool.write();
        let PoolState { registry, executables } = &mut *pool;
        let Some(account) = registry.get_mut(tx.sender()) else { return };

        let Some(removed) = account.remove_executed(tx.nonce()) else {
            debug!(target: "txpool", hash = ?tx.hash(), "executed transaction not at promoted front");
            return
        };
        self.inner.forget(&removed);

        match account.first_promoted() {
            Some(next) => {
                let head = ExecutableRef::new(next);
                executables.push_head(head.clone());
                self.snapshot.push_head(head);
            }
            None => executables.remove(tx.sender()),
        }
        self.inner.metrics.executed_transactions.increment(1);
    }

    /// Discards a transaction the builder cannot ever apply, along with every
    /// higher-nonce transaction of the same sender, and rewinds the account
    /// to the dropped nonce.
    pub fn drop_tx(&mut self, tx: &PooledTransaction) {
        let mut pool = self.inner.pool.write();
        let PoolState { registry, executables } = &mut *pool;
        let Some(account) = registry.get_mut(tx.sender()) else { return };

        let (from_promoted, from_enqueued) = account.drop_from(tx.nonce());
        let total = from_promoted.len() + from_enqueued.len();
        if total == 0 {
            return
        }

        for dropped in from_promoted {
            let kind = if dropped.hash() == tx.hash() {
                PoolEventKind::Dropped
            } else {
                PoolEventKind::PrunedPromoted
            };
            self.inner.discard(vec![dropped], kind);
        }
        self.inner.discard(from_enqueued, PoolEventKind::PrunedEnqueued);

        match account.first_promoted() {
            Some(head) => executables.push_head(ExecutableRef::new(head)),
            None => executables.remove(tx.sender()),
        }
        self.inner.metrics.dropped_transactions.increment(total as u64);
        debug!(target: "txpool", sender = %tx.sender(), nonce = tx.nonce(), count = total, "dropped transaction chain");
    }

    /// Removes a transaction that failed to apply; its former promoted
    /// descendants are demoted back to enqueued since the gapless chain is
    /// broken.
    pub fn remove_failed(&mut self, tx: &PooledTransaction) {
        let mut pool = self.inner.pool.write();
        let PoolState { registry, executables } = &mut *pool;
        let Some(account) = registry.get_mut(tx.sender()) else { return };

        let outcome = account.remove_failed(tx.nonce());
        let Some(failed) = outcome.failed else { return };

        self.inner.discard(vec![failed], PoolEventKind::Dropped);
        for demoted in &outcome.reenqueued {
            self.inner.events.publish(demoted.hash(), PoolEventKind::Enqueued);
        }
        executables.remove(tx.sender());
        self.inner.metrics.dropped_transactions.increment(1);
    }
}

impl Drop for BuildSession<'_> {
    fn drop(&mut self) {
        self.inner.end_session();
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        test_utils::{add_and_promote, priced_tx, test_tx, TestPoolBuilder, ADDR1, ADDR2, ADDR3},
        TxPool,
    };
    use std::collections::HashMap;

    fn test_pool() -> TxPool {
        TestPoolBuilder::default().build()
    }

    #[test]
    fn pop_and_remove_executed() {
        let pool = test_pool();
        add_and_promote(&pool, test_tx(ADDR1, 0, 1)).unwrap();

        let mut session = pool.prepare();
        let tx = session.pop().unwrap();
        assert_eq!(tx.nonce(), 0);
        session.remove_executed(&tx);
        assert!(session.pop().is_none());
        drop(session);

        let status = pool.status();
        assert_eq!(status.slots_used, 0);
        assert_eq!(status.promoted, 0);
        assert_eq!(pool.inspect(ADDR1).unwrap().next_nonce, 1);
        pool.assert_invariants();
    }

    #[test]
    fn drop_rewinds_account() {
        let pool = test_pool();
        add_and_promote(&pool, test_tx(ADDR1, 0, 1)).unwrap();
        add_and_promote(&pool, test_tx(ADDR1, 1, 1)).unwrap();

        let mut session = pool.prepare();
        let tx = session.pop().unwrap();
        assert_eq!(tx.nonce(), 0);
        session.drop_tx(&tx);
        drop(session);

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 0);
        assert!(account.promoted.is_empty());
        assert!(account.enqueued.is_empty());
        assert_eq!(pool.status().slots_used, 0);
        pool.assert_invariants();
    }

    #[test]
    fn drop_after_executing_part_of_the_chain() {
        let store = crate::test_utils::MockStore::default().with_nonce(ADDR1, 5);
        let pool = TestPoolBuilder::default().with_store(store).build();
        for nonce in [5, 6, 7] {
            add_and_promote(&pool, test_tx(ADDR1, nonce, 1)).unwrap();
        }

        let mut session = pool.prepare();
        let first = session.pop().unwrap();
        assert_eq!(first.nonce(), 5);
        session.remove_executed(&first);

        let second = session.pop().unwrap();
        assert_eq!(second.nonce(), 6);
        session.drop_tx(&second);
        drop(session);

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 6);
        assert!(account.promoted.is_empty());
        assert!(account.enqueued.is_empty());
        assert_eq!(pool.status().slots_used, 0);
        pool.assert_invariants();
    }

    #[test]
    fn remove_failed_demotes_descendants() {
        let store = crate::test_utils::MockStore::default().with_nonce(ADDR1, 9);
        let pool = TestPoolBuilder::default().with_store(store).build();
        add_and_promote(&pool, test_tx(ADDR1, 9, 1)).unwrap();
        add_and_promote(&pool, test_tx(ADDR1, 10, 1)).unwrap();

        let mut session = pool.prepare();
        let tx = session.pop().unwrap();
        assert_eq!(tx.nonce(), 9);
        session.remove_failed(&tx);
        assert!(session.pop().is_none());
        drop(session);

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 9);
        assert!(account.promoted.is_empty());
        assert_eq!(account.enqueued.len(), 1);
        assert_eq!(pool.status().slots_used, 1);
        pool.assert_invariants();
    }

    #[test]
    fn pops_by_price_across_senders() {
        let pool = test_pool();
        add_and_promote(&pool, priced_tx(ADDR1, 1, 0, 1)).unwrap();
        add_and_promote(&pool, priced_tx(ADDR2, 2, 0, 1)).unwrap();
        add_and_promote(&pool, priced_tx(ADDR3, 3, 0, 1)).unwrap();

        let mut session = pool.prepare();
        let mut senders = Vec::new();
        while let Some(tx) = session.pop() {
            senders.push(tx.sender());
            session.remove_executed(&tx);
        }
        assert_eq!(senders, vec![ADDR3, ADDR2, ADDR1]);
        pool.assert_invariants();
    }

    #[test]
    fn pop_skips_stale_hints() {
        let pool = test_pool();
        add_and_promote(&pool, priced_tx(ADDR1, 5, 0, 1)).unwrap();

        let mut session = pool.prepare();
        // the account is reset after the snapshot was taken; the lease makes
        // the reset wait, so force-apply it to simulate an expired lease
        pool.inner().on_reset(crate::pool::ResetRequest {
            nonces: HashMap::from([(ADDR1, 1)]),
        });

        assert!(session.pop().is_none());
        drop(session);
        pool.assert_invariants();
    }

    #[test]
    fn reset_is_buffered_until_session_ends() {
        let pool = test_pool();
        for nonce in 0..3 {
            add_and_promote(&pool, test_tx(ADDR1, nonce, 1)).unwrap();
        }

        let session = pool.prepare();
        let promotes = pool.inner().apply_or_defer_reset(crate::pool::ResetRequest {
            nonces: HashMap::from([(ADDR1, 3)]),
        });
        assert!(promotes.is_empty());
        // untouched while the lease is live
        assert_eq!(pool.status().promoted, 3);

        drop(session);
        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 3);
        assert!(account.promoted.is_empty());
        assert_eq!(pool.status().slots_used, 0);
        pool.assert_invariants();
    }
}
