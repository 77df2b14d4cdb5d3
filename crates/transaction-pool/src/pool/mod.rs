//! Transaction pool internals.
//!
//! Every transaction that clears admission lands in its sender's account
//! queues. An account keeps two of them:
//!
//!  - _Enqueued_: future-nonce transactions, possibly with gaps. Nothing in
//!    here can execute yet.
//!  - _Promoted_: the gapless tail starting at the sender's expected nonce.
//!    Everything in here could execute on the current state, one after the
//!    other.
//!
//! A transaction arriving at exactly the expected nonce triggers a promotion
//! sweep that slides the contiguous enqueued prefix into the promoted queue.
//! The head (lowest nonce) of every promoted queue is additionally tracked in
//! a price-ordered executables set, which is what the block builder consumes
//! through a [`BuildSession`].
//!
//! All writes are funneled through a single dispatcher task consuming three
//! bounded request channels (enqueue, promote, reset), so per-sender state
//! transitions are observed in the order the requests were accepted. Readers
//! (the operator surface, admission prechecks) take short read-only critical
//! sections over the same state.
//!
//! [`BuildSession`]: crate::pool::session::BuildSession

use crate::{
    config::{PoolConfig, SHUTDOWN_DRAIN_DEADLINE},
    error::{PoolError, PoolResult},
    metrics::TxPoolMetrics,
    traits::{Store, TxOrigin},
    validate::{replacement_threshold, PooledTransaction, TransactionValidator},
};
use arbor_primitives::{Address, Transaction, B256};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::{collections::HashMap, fmt, sync::Arc, time::Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

pub(crate) mod account;
pub mod events;
pub(crate) mod executables;
pub(crate) mod listener;
mod session;
pub(crate) mod size;

pub use events::{PoolEvent, PoolEventKind};
pub use listener::EventSubscription;
pub use session::BuildSession;

use account::AccountRegistry;
use executables::{ExecutableHeap, ExecutableRef};
use listener::EventBus;
use session::SessionLease;
use size::SlotGauge;

/// An admitted transaction awaiting placement.
#[derive(Debug)]
pub(crate) struct EnqueueRequest {
    pub(crate) tx: Arc<PooledTransaction>,
}

/// Hint that an account may have contiguous work at its expected nonce.
#[derive(Debug)]
pub(crate) struct PromoteRequest {
    pub(crate) sender: Address,
}

/// Post-block nonces to apply to the pool.
#[derive(Debug)]
pub(crate) struct ResetRequest {
    pub(crate) nonces: HashMap<Address, u64>,
}

/// Registry plus executables set; everything guarded by one lock so a
/// dispatched event is observed atomically.
#[derive(Debug, Default)]
pub(crate) struct PoolState {
    pub(crate) registry: AccountRegistry,
    pub(crate) executables: ExecutableHeap,
}

/// Counts reported by the operator surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Accounts tracked by the registry.
    pub accounts: u64,
    /// Transactions in promoted queues.
    pub promoted: u64,
    /// Transactions in enqueued queues.
    pub enqueued: u64,
    /// Occupied slots.
    pub slots_used: u64,
    /// Slot capacity.
    pub max_slots: u64,
    /// Live event subscribers.
    pub subscribers: u64,
}

/// Snapshot of one account's queues.
#[derive(Debug, Clone)]
pub struct AccountTransactions {
    /// The account's expected nonce.
    pub next_nonce: u64,
    /// Promoted transactions in nonce order.
    pub promoted: Vec<Arc<PooledTransaction>>,
    /// Enqueued transactions in nonce order.
    pub enqueued: Vec<Arc<PooledTransaction>>,
}

/// Transaction pool internals shared between the facade, the dispatcher and
/// build sessions.
pub(crate) struct PoolInner {
    pub(crate) config: PoolConfig,
    store: Arc<dyn Store>,
    validator: TransactionValidator,
    pub(crate) gauge: Arc<SlotGauge>,
    /// Hash lookup of everything currently pooled.
    index: RwLock<FnvHashMap<B256, Arc<PooledTransaction>>>,
    pub(crate) pool: RwLock<PoolState>,
    pub(crate) events: EventBus,
    pub(crate) metrics: TxPoolMetrics,
    promote_tx: mpsc::Sender<PromoteRequest>,
    pub(crate) lease: SessionLease,
}

// === impl PoolInner ===

impl PoolInner {
    pub(crate) fn new(
        config: PoolConfig,
        store: Arc<dyn Store>,
        validator: TransactionValidator,
        gauge: Arc<SlotGauge>,
        events: EventBus,
        metrics: TxPoolMetrics,
        promote_tx: mpsc::Sender<PromoteRequest>,
    ) -> Self {
        Self {
            config,
            store,
            validator,
            gauge,
            index: RwLock::new(Default::default()),
            pool: RwLock::new(Default::default()),
            events,
            metrics,
            promote_tx,
            lease: SessionLease::default(),
        }
    }

    /// Runs a transaction through admission: validation, duplicate check,
    /// replacement precheck and slot accounting.
    ///
    /// On success the transaction is indexed and charged but not yet placed;
    /// the caller hands it to the dispatcher as an [`EnqueueRequest`].
    pub(crate) fn admit(
        &self,
        origin: TxOrigin,
        tx: Transaction,
    ) -> PoolResult<Arc<PooledTransaction>> {
        let pooled = match self.validator.validate(origin, tx) {
            Ok(pooled) => Arc::new(pooled),
            Err(err) => {
                self.metrics.invalid_transactions.increment(1);
                return Err(err)
            }
        };
        let hash = pooled.hash();

        {
            let mut index = self.index.write();
            if index.contains_key(&hash) {
                self.metrics.invalid_transactions.increment(1);
                return Err(PoolError::AlreadyKnown)
            }
            index.insert(hash, pooled.clone());
        }

        // advisory same-nonce check so the caller sees the typed error; the
        // dispatcher re-runs it authoritatively
        if let Err(err) = self.precheck_replacement(&pooled) {
            self.index.write().remove(&hash);
            self.metrics.invalid_transactions.increment(1);
            return Err(err)
        }

        self.gauge.increase(pooled.slots());
        self.metrics.inserted_transactions.increment(1);
        trace!(target: "txpool", ?hash, sender = %pooled.sender(), nonce = pooled.nonce(), "admitted transaction");
        Ok(pooled)
    }

    fn precheck_replacement(&self, tx: &PooledTransaction) -> PoolResult<()> {
        let pool = self.pool.read();
        let Some(account) = pool.registry.get(tx.sender()) else { return Ok(()) };
        if let Some(incumbent) = account.incumbent(tx.nonce()) {
            let threshold =
                replacement_threshold(incumbent.tx.gas_price(), self.config.price_bump);
            if tx.gas_price() < threshold {
                return Err(PoolError::ReplaceUnderpriced)
            }
        }
        Ok(())
    }

    /// Places an admitted transaction into its account's queues.
    ///
    /// Returns a promote request when the transaction landed at the
    /// account's expected nonce.
    pub(crate) fn on_enqueue(&self, req: EnqueueRequest) -> Option<PromoteRequest> {
        let tx = req.tx;
        let sender = tx.sender();
        let mut pool = self.pool.write();
        let PoolState { registry, executables } = &mut *pool;

        let account = match registry.get_or_create(sender, &*self.store) {
            Ok(account) => account,
            Err(err) => {
                warn!(target: "txpool", %err, %sender, "account load failed; dropping transaction");
                self.forget(&tx);
                self.metrics.invalid_transactions.increment(1);
                return None
            }
        };

        if tx.nonce() < account.next_nonce() {
            self.discard(vec![tx], PoolEventKind::PrunedEnqueued);
            self.metrics.pruned_transactions.increment(1);
            return None
        }

        if let Some(incumbent) = account.incumbent(tx.nonce()) {
            let threshold =
                replacement_threshold(incumbent.tx.gas_price(), self.config.price_bump);
            if tx.gas_price() < threshold {
                // lost the race against a better incumbent admitted in between
                debug!(target: "txpool", hash = ?tx.hash(), "replacement underpriced at placement");
                self.forget(&tx);
                return None
            }

            let was_promoted = incumbent.promoted;
            let Some(old) = account.replace(tx.clone()) else {
                warn!(target: "txpool", hash = ?tx.hash(), "incumbent vanished during replacement");
                self.forget(&tx);
                return None
            };
            let head_replaced =
                was_promoted && account.first_promoted().is_some_and(|f| f.hash() == tx.hash());
            if head_replaced {
                executables.push_head(ExecutableRef::new(&tx));
            }

            self.index.write().remove(&old.hash());
            self.gauge.decrease(old.slots());
            self.events.publish(old.hash(), PoolEventKind::Replaced);
            self.events.publish(
                tx.hash(),
                if was_promoted { PoolEventKind::Promoted } else { PoolEventKind::Enqueued },
            );
            self.metrics.replaced_transactions.increment(1);
            trace!(target: "txpool", old = ?old.hash(), new = ?tx.hash(), "replaced transaction");
            return None
        }

        let nonce = tx.nonce();
        let hash = tx.hash();
        account.enqueue(tx);
        self.events.publish(hash, PoolEventKind::Enqueued);

        (nonce == account.next_nonce()).then_some(PromoteRequest { sender })
    }

    /// Slides the account's contiguous enqueued prefix into promoted.
    pub(crate) fn on_promote(&self, req: PromoteRequest) {
        let mut pool = self.pool.write();
        let PoolState { registry, executables } = &mut *pool;
        let Some(account) = registry.get_mut(req.sender) else { return };

        let was_empty = account.promoted_len() == 0;
        let outcome = account.promote(Instant::now());

        if !outcome.dropped.is_empty() {
            self.metrics.pruned_transactions.increment(outcome.dropped.len() as u64);
            self.discard(outcome.dropped, PoolEventKind::PrunedEnqueued);
        }
        if outcome.promoted.is_empty() {
            trace!(target: "txpool", sender = %req.sender, "nothing to promote");
            return
        }

        if was_empty {
            if let Some(head) = account.first_promoted() {
                executables.push_head(ExecutableRef::new(head));
            }
        }
        for tx in &outcome.promoted {
            self.events.publish(tx.hash(), PoolEventKind::Promoted);
        }
        self.metrics.promoted_transactions.increment(outcome.promoted.len() as u64);
        trace!(target: "txpool", sender = %req.sender, count = outcome.promoted.len(), "promoted transactions");
    }

    /// Applies freshly committed per-account nonces.
    ///
    /// Returns promote requests for accounts whose enqueued front became
    /// contiguous.
    pub(crate) fn on_reset(&self, req: ResetRequest) -> Vec<PromoteRequest> {
        let mut promotes = Vec::new();
        let mut pool = self.pool.write();
        let PoolState { registry, executables } = &mut *pool;

        for (sender, new_nonce) in req.nonces {
            let Some(account) = registry.get_mut(sender) else { continue };

            let outcome = account.prune_below(new_nonce);
            let front_popped = !outcome.promoted.is_empty();
            let pruned = outcome.promoted.len() + outcome.enqueued.len();
            if pruned > 0 {
                self.metrics.pruned_transactions.increment(pruned as u64);
            }
            self.discard(outcome.promoted, PoolEventKind::PrunedPromoted);
            self.discard(outcome.enqueued, PoolEventKind::PrunedEnqueued);

            if front_popped {
                match account.first_promoted() {
                    Some(head) => executables.push_head(ExecutableRef::new(head)),
                    None => executables.remove(sender),
                }
            }
            if account.first_enqueued_nonce() == Some(account.next_nonce()) {
                promotes.push(PromoteRequest { sender });
            }
        }
        promotes
    }

    /// Applies a reset now, or buffers it while a build session holds the
    /// lease.
    pub(crate) fn apply_or_defer_reset(&self, req: ResetRequest) -> Vec<PromoteRequest> {
        match self.lease.defer(req) {
            Some(req) => self.on_reset(req),
            None => {
                debug!(target: "txpool", "reset buffered during build session");
                Vec::new()
            }
        }
    }

    /// Hands a promote request to the dispatcher without blocking.
    pub(crate) fn signal_promote(&self, req: PromoteRequest) {
        if let Err(err) = self.promote_tx.try_send(req) {
            warn!(target: "txpool", %err, "promote request dropped");
            self.metrics.dropped_requests.increment(1);
        }
    }

    /// Replays resets buffered while a build session was live.
    pub(crate) fn end_session(&self) {
        for req in self.lease.release() {
            for promote in self.on_reset(req) {
                self.signal_promote(promote);
            }
        }
    }

    /// Removes the transactions from the lookup index, releases their slots
    /// and emits `kind` for each.
    pub(crate) fn discard(&self, txs: Vec<Arc<PooledTransaction>>, kind: PoolEventKind) {
        if txs.is_empty() {
            return
        }
        let mut index = self.index.write();
        for tx in txs {
            index.remove(&tx.hash());
            self.gauge.decrease(tx.slots());
            self.events.publish(tx.hash(), kind);
        }
    }

    /// Removes a transaction from the lookup index and releases its slots
    /// without emitting an event.
    pub(crate) fn forget(&self, tx: &PooledTransaction) {
        self.index.write().remove(&tx.hash());
        self.gauge.decrease(tx.slots());
    }

    /// Returns the pooled transaction with the given hash.
    pub(crate) fn get(&self, hash: &B256) -> Option<Arc<PooledTransaction>> {
        self.index.read().get(hash).cloned()
    }

    pub(crate) fn contains(&self, hash: &B256) -> bool {
        self.index.read().contains_key(hash)
    }

    pub(crate) fn len(&self) -> usize {
        self.index.read().len()
    }

    pub(crate) fn status(&self) -> PoolStatus {
        let pool = self.pool.read();
        PoolStatus {
            accounts: pool.registry.len() as u64,
            promoted: pool.registry.promoted_count(),
            enqueued: pool.registry.enqueued_count(),
            slots_used: self.gauge.read(),
            max_slots: self.gauge.max(),
            subscribers: self.events.subscribers() as u64,
        }
    }

    pub(crate) fn inspect(&self, sender: Address) -> Option<AccountTransactions> {
        let pool = self.pool.read();
        let account = pool.registry.get(sender)?;
        Some(AccountTransactions {
            next_nonce: account.next_nonce(),
            promoted: account.promoted_iter().cloned().collect(),
            enqueued: account.enqueued_iter().cloned().collect(),
        })
    }

    /// Asserts the structural invariants that must hold after every
    /// dispatched event.
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn assert_invariants(&self) {
        let pool = self.pool.read();
        let index = self.index.read();

        let mut total_slots = 0u64;
        let mut total_txs = 0usize;
        let mut live_heads = 0usize;

        for (sender, account) in pool.registry.iter() {
            let mut prev_nonce = None;
            for tx in account.promoted_iter() {
                assert!(tx.nonce() < account.next_nonce(), "promoted nonce past next_nonce");
                if let Some(prev) = prev_nonce {
                    assert_eq!(tx.nonce(), prev + 1, "promoted nonces must be gapless");
                }
                prev_nonce = Some(tx.nonce());
                assert!(index.contains_key(&tx.hash()), "promoted tx missing from lookup");
                total_slots += tx.slots();
                total_txs += 1;
            }
            for tx in account.enqueued_iter() {
                assert!(tx.nonce() >= account.next_nonce(), "enqueued nonce below next_nonce");
                assert!(index.contains_key(&tx.hash()), "enqueued tx missing from lookup");
                total_slots += tx.slots();
                total_txs += 1;
            }
            match account.first_promoted() {
                Some(front) => {
                    live_heads += 1;
                    let head = pool
                        .executables
                        .head_of(*sender)
                        .expect("account with promoted txs missing from executables");
                    assert_eq!(head.hash, front.hash(), "executables head out of date");
                }
                None => {
                    assert!(
                        !pool.executables.contains_sender(*sender),
                        "executables entry for empty promoted queue"
                    );
                }
            }
        }

        assert_eq!(total_txs, index.len(), "lookup and queues disagree");
        assert_eq!(total_slots, self.gauge.read(), "slot gauge out of sync");
        assert_eq!(live_heads, pool.executables.len(), "stray executables entries");
    }

    pub(crate) fn inspect_all(&self) -> HashMap<Address, AccountTransactions> {
        let pool = self.pool.read();
        pool.registry
            .iter()
            .map(|(sender, account)| {
                (
                    *sender,
                    AccountTransactions {
                        next_nonce: account.next_nonce(),
                        promoted: account.promoted_iter().cloned().collect(),
                        enqueued: account.enqueued_iter().cloned().collect(),
                    },
                )
            })
            .collect()
    }
}

impl fmt::Debug for PoolInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolInner").field("config", &self.config).finish_non_exhaustive()
    }
}

/// The single writer task: consumes the request channels and drives the
/// maintenance timers.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    pub(crate) inner: Arc<PoolInner>,
    pub(crate) enqueue_rx: mpsc::Receiver<EnqueueRequest>,
    pub(crate) promote_rx: mpsc::Receiver<PromoteRequest>,
    pub(crate) reset_rx: mpsc::Receiver<ResetRequest>,
    pub(crate) shutdown: watch::Receiver<bool>,
}

// === impl Dispatcher ===

impl Dispatcher {
    pub(crate) async fn run(mut self) {
        let now = tokio::time::Instant::now();
        let mut prune =
            tokio::time::interval_at(now + self.inner.config.prune_tick, self.inner.config.prune_tick);
        let mut clip = tokio::time::interval_at(
            now + self.inner.config.clipping_tick,
            self.inner.config.clipping_tick,
        );
        prune.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        clip.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        self.drain();
                        return
                    }
                }
                Some(req) = self.promote_rx.recv() => self.inner.on_promote(req),
                Some(req) = self.enqueue_rx.recv() => {
                    if let Some(promote) = self.inner.on_enqueue(req) {
                        self.inner.signal_promote(promote);
                    }
                }
                Some(req) = self.reset_rx.recv() => {
                    for promote in self.inner.apply_or_defer_reset(req) {
                        self.inner.signal_promote(promote);
                    }
                }
                _ = prune.tick() => self.inner.prune_stale_accounts(),
                _ = clip.tick() => self.inner.clip_memory_eater(),
            }
        }
    }

    /// Closes the request channels and works off what is already buffered,
    /// bounded by [`SHUTDOWN_DRAIN_DEADLINE`].
    pub(crate) fn drain(&mut self) {
        self.enqueue_rx.close();
        self.promote_rx.close();
        self.reset_rx.close();

        let deadline = Instant::now() + SHUTDOWN_DRAIN_DEADLINE;
        loop {
            if Instant::now() >= deadline {
                warn!(target: "txpool", "drain deadline hit; discarding buffered requests");
                return
            }
            // promote requests first so placements keep unlocking work
            if let Ok(req) = self.promote_rx.try_recv() {
                self.inner.on_promote(req);
                continue
            }
            if let Ok(req) = self.enqueue_rx.try_recv() {
                if let Some(promote) = self.inner.on_enqueue(req) {
                    self.inner.on_promote(promote);
                }
                continue
            }
            if let Ok(req) = self.reset_rx.try_recv() {
                for promote in self.inner.apply_or_defer_reset(req) {
                    self.inner.on_promote(promote);
                }
                continue
            }
            break
        }
        debug!(target: "txpool", "dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{
            add_and_promote, add_direct, priced_tx, test_tx, MockSigner, MockStore, ADDR1,
        },
        PoolConfig, TxPool,
    };
    use arbor_primitives::U256;

    fn test_pool() -> TxPool {
        crate::test_utils::TestPoolBuilder::default().build()
    }

    fn pool_with_store(store: Arc<MockStore>) -> TxPool {
        TxPool::new(PoolConfig::default(), store, Arc::new(MockSigner::default()))
    }

    #[test]
    fn enqueue_higher_nonce_parks_tx() {
        let pool = test_pool();

        let promote = add_direct(&pool, test_tx(ADDR1, 10, 1)).unwrap();
        assert!(promote.is_none());

        let status = pool.status();
        assert_eq!(status.slots_used, 1);
        assert_eq!(status.enqueued, 1);
        assert_eq!(status.promoted, 0);
        pool.assert_invariants();
    }

    #[test]
    fn low_nonce_tx_is_pruned_at_placement() {
        let store = Arc::new(MockStore::default().with_nonce(ADDR1, 20));
        let pool = pool_with_store(store.clone());

        // baseline: the account is created against nonce 20
        add_and_promote(&pool, test_tx(ADDR1, 20, 1)).unwrap();
        assert_eq!(pool.status().promoted, 1);

        // a stale tx clears validation against a store that moved backwards,
        // but the account's baseline wins at placement
        store.set_nonce(ADDR1, 0);
        let promote = add_direct(&pool, test_tx(ADDR1, 10, 1)).unwrap();
        assert!(promote.is_none());

        let status = pool.status();
        assert_eq!(status.slots_used, 1);
        assert_eq!(status.enqueued, 0);
        assert_eq!(status.promoted, 1);
        pool.assert_invariants();
    }

    #[test]
    fn expected_nonce_signals_promotion() {
        let pool = test_pool();

        let promote = add_direct(&pool, test_tx(ADDR1, 0, 1)).unwrap().unwrap();
        assert_eq!(promote.sender, ADDR1);

        // nothing moves until the promote request is handled
        let status = pool.status();
        assert_eq!(status.enqueued, 1);
        assert_eq!(status.promoted, 0);

        pool.inner().on_promote(promote);
        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 1);
        assert_eq!(account.promoted.len(), 1);
        assert!(account.enqueued.is_empty());
        pool.assert_invariants();
    }

    #[test]
    fn promotion_sweep_takes_contiguous_prefix() {
        let pool = test_pool();

        let first = add_direct(&pool, test_tx(ADDR1, 0, 1)).unwrap();
        for nonce in 1..5 {
            assert!(add_direct(&pool, test_tx(ADDR1, nonce, 1)).unwrap().is_none());
        }
        assert!(add_direct(&pool, test_tx(ADDR1, 9, 1)).unwrap().is_none());

        pool.inner().on_promote(first.unwrap());

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 5);
        assert_eq!(account.promoted.len(), 5);
        assert_eq!(account.enqueued.len(), 1);
        pool.assert_invariants();
    }

    #[test]
    fn stray_promote_request_is_noop() {
        let pool = test_pool();

        pool.inner().on_promote(PromoteRequest { sender: ADDR1 });
        assert_eq!(pool.status().accounts, 0);

        add_direct(&pool, test_tx(ADDR1, 10, 1)).unwrap();
        pool.inner().on_promote(PromoteRequest { sender: ADDR1 });

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.enqueued.len(), 1);
        assert!(account.promoted.is_empty());
        pool.assert_invariants();
    }

    #[test]
    fn replacement_requires_price_bump() {
        let pool = test_pool();

        add_direct(&pool, priced_tx(ADDR1, 100, 1, 1)).unwrap();

        // 109 < 100 * 110%
        let err = add_direct(&pool, priced_tx(ADDR1, 109, 1, 1)).unwrap_err();
        assert_eq!(err, PoolError::ReplaceUnderpriced);

        let replacement = priced_tx(ADDR1, 110, 1, 1);
        let replacement_hash = crate::test_utils::pooled(replacement.clone()).hash();
        add_direct(&pool, replacement).unwrap();

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.enqueued.len(), 1);
        assert_eq!(account.enqueued[0].hash(), replacement_hash);
        assert_eq!(account.enqueued[0].gas_price(), U256::from(110u64));
        assert_eq!(pool.status().slots_used, 1);
        pool.assert_invariants();
    }

    #[test]
    fn replacing_promoted_head_refreshes_executables() {
        let pool = test_pool();

        add_and_promote(&pool, priced_tx(ADDR1, 100, 0, 1)).unwrap();
        add_direct(&pool, priced_tx(ADDR1, 110, 0, 1)).unwrap();

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.promoted.len(), 1);
        assert_eq!(account.promoted[0].gas_price(), U256::from(110u64));
        assert_eq!(pool.status().slots_used, 1);
        // assert_invariants checks the executables head against the front
        pool.assert_invariants();
    }

    #[test]
    fn reset_prunes_promoted() {
        let pool = test_pool();

        for nonce in 0..5 {
            add_and_promote(&pool, test_tx(ADDR1, nonce, 1)).unwrap();
        }
        assert_eq!(pool.status().promoted, 5);

        let promotes =
            pool.inner().on_reset(ResetRequest { nonces: HashMap::from([(ADDR1, 5)]) });
        assert!(promotes.is_empty());

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 5);
        assert!(account.promoted.is_empty());
        assert_eq!(pool.status().slots_used, 0);
        pool.assert_invariants();
    }

    #[test]
    fn reset_triggers_promotion() {
        let pool = test_pool();

        for nonce in [8, 9, 10] {
            assert!(add_direct(&pool, test_tx(ADDR1, nonce, 1)).unwrap().is_none());
        }

        let promotes =
            pool.inner().on_reset(ResetRequest { nonces: HashMap::from([(ADDR1, 9)]) });
        assert_eq!(promotes.len(), 1);
        for promote in promotes {
            pool.inner().on_promote(promote);
        }

        let account = pool.inspect(ADDR1).unwrap();
        assert_eq!(account.next_nonce, 11);
        assert!(account.enqueued.is_empty());
        assert_eq!(account.promoted.len(), 2);
        assert_eq!(pool.status().slots_used, 2);
        pool.assert_invariants();
    }

    #[test]
    fn reset_ignores_unknown_accounts() {
        let pool = test_pool();
        let promotes =
            pool.inner().on_reset(ResetRequest { nonces: HashMap::from([(ADDR1, 9)]) });
        assert!(promotes.is_empty());
        assert_eq!(pool.status().accounts, 0);
    }

    #[test]
    fn duplicate_hash_is_rejected() {
        let pool = test_pool();

        let tx = test_tx(ADDR1, 0, 1);
        add_direct(&pool, tx.clone()).unwrap();
        let err = pool.inner().admit(TxOrigin::Local, tx).unwrap_err();
        assert_eq!(err, PoolError::AlreadyKnown);
    }

    #[test]
    fn lookup_tracks_pooled_transactions() {
        let pool = test_pool();

        let tx = test_tx(ADDR1, 0, 1);
        let hash = crate::test_utils::pooled(tx.clone()).hash();
        add_direct(&pool, tx).unwrap();

        assert!(pool.contains(&hash));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&hash).unwrap().nonce(), 0);
    }
}
