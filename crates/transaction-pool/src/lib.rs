#![warn(missing_debug_implementations, missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Arbor's transaction pool implementation.
//!
//! The pool is a bounded staging area between transaction intake (local
//! submissions and peer gossip) and the block builder. Incoming transactions
//! are validated against committed state, then placed into per-sender queues
//! by a single dispatcher task:
//!
//!  - transactions with a nonce gap wait in their sender's _enqueued_ queue;
//!  - gapless transactions are _promoted_ and become executable;
//!  - the promoted head of every account competes in a price-ordered
//!    executables set consumed by the block builder through a
//!    [`BuildSession`].
//!
//! New blocks feed back into the pool via [`TxPool::reset_accounts`], which
//! discards everything the chain already executed. Two maintenance tasks
//! bound memory: stale accounts lose their backlog after an idle window, and
//! slot occupancy above a threshold triggers eviction of the largest hoards.
//!
//! Everything observable after admission is published on the pool's event
//! bus; [`TxPool::add_tx`] itself only reports admission errors.

pub mod error;

mod config;
mod maintain;
mod metrics;
mod traits;
mod validate;

pub mod pool;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    PoolConfig, DEFAULT_CLIPPING_THRESHOLD, DEFAULT_CLIPPING_TICK, DEFAULT_MAX_SLOTS,
    DEFAULT_PRICE_BUMP, DEFAULT_PRICE_LIMIT, DEFAULT_PROMOTE_OUTDATE, DEFAULT_PRUNE_TICK,
};
pub use metrics::describe;
pub use pool::{
    AccountTransactions, BuildSession, EventSubscription, PoolEvent, PoolEventKind, PoolStatus,
};
pub use traits::{SignerError, Store, StoreError, TxOrigin, TxSigner};
pub use validate::PooledTransaction;

use crate::{
    error::{PoolError, PoolResult},
    metrics::TxPoolMetrics,
    pool::{Dispatcher, EnqueueRequest, PoolInner, ResetRequest},
    validate::TransactionValidator,
};
use alloy_rlp::Decodable;
use arbor_primitives::{Address, Transaction, B256};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt, sync::Arc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// The transaction pool.
///
/// Cheap to share: every handle works against the same inner state. The
/// dispatcher task must be started with [`TxPool::start`] before admitted
/// transactions make progress.
pub struct TxPool {
    inner: Arc<PoolInner>,
    enqueue_tx: mpsc::Sender<EnqueueRequest>,
    reset_tx: mpsc::Sender<ResetRequest>,
    dispatcher: Mutex<Option<Dispatcher>>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

// === impl TxPool ===

impl TxPool {
    /// Creates a new pool over the given state reader and signer.
    pub fn new(config: PoolConfig, store: Arc<dyn Store>, signer: Arc<dyn TxSigner>) -> Self {
        let (enqueue_tx, enqueue_rx) = mpsc::channel(config::REQUEST_CHANNEL_CAPACITY);
        let (promote_tx, promote_rx) = mpsc::channel(config::REQUEST_CHANNEL_CAPACITY);
        let (reset_tx, reset_rx) = mpsc::channel(config::REQUEST_CHANNEL_CAPACITY);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let metrics = TxPoolMetrics::default();
        let gauge = Arc::new(pool::size::SlotGauge::new(config.max_slots));
        let events = pool::listener::EventBus::new(metrics.dropped_events.clone());
        let validator =
            TransactionValidator::new(store.clone(), signer, gauge.clone(), &config);

        let inner = Arc::new(PoolInner::new(
            config, store, validator, gauge, events, metrics, promote_tx,
        ));
        let dispatcher = Dispatcher {
            inner: inner.clone(),
            enqueue_rx,
            promote_rx,
            reset_rx,
            shutdown: shutdown_rx,
        };

        Self {
            inner,
            enqueue_tx,
            reset_tx,
            dispatcher: Mutex::new(Some(dispatcher)),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Spawns the dispatcher task onto the current tokio runtime.
    ///
    /// Idempotent; only the first call spawns.
    pub fn start(&self) {
        if let Some(dispatcher) = self.dispatcher.lock().take() {
            *self.handle.lock() = Some(tokio::spawn(dispatcher.run()));
        }
    }

    /// Signals shutdown and waits for the dispatcher to drain.
    pub async fn close(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Validates and admits a transaction.
    ///
    /// On success the transaction is queued for placement; whether it ends up
    /// enqueued or promoted is observable through [`TxPool::subscribe`]. May
    /// block while the dispatcher's intake channel is full. A pool that was
    /// already closed rejects everything with
    /// [`TxPoolOverflow`](PoolError::TxPoolOverflow).
    pub async fn add_tx(&self, origin: TxOrigin, tx: Transaction) -> PoolResult<()> {
        let pooled = self.inner.admit(origin, tx)?;
        if self.enqueue_tx.send(EnqueueRequest { tx: pooled.clone() }).await.is_err() {
            warn!(target: "txpool", hash = ?pooled.hash(), "pool closed; rejecting transaction");
            self.inner.forget(&pooled);
            return Err(PoolError::TxPoolOverflow)
        }
        Ok(())
    }

    /// Feeds a raw gossip payload into the pool.
    ///
    /// Non-sealing nodes discard gossip outright; malformed payloads and
    /// admission rejections are logged, never surfaced.
    pub async fn add_gossip(&self, raw: &[u8]) {
        if !self.inner.config.sealing {
            return
        }
        let tx = match Transaction::decode(&mut &raw[..]) {
            Ok(tx) => tx,
            Err(err) => {
                debug!(target: "txpool", %err, "dropping malformed gossip transaction");
                return
            }
        };
        if let Err(err) = self.add_tx(TxOrigin::Gossip, tx).await {
            debug!(target: "txpool", %err, "gossip transaction rejected");
        }
    }

    /// Applies the per-account nonces of a freshly committed block.
    ///
    /// Obsolete transactions are pruned and newly contiguous ones promoted;
    /// all of it is observable through subscriptions.
    pub async fn reset_accounts(&self, nonces: HashMap<Address, u64>) {
        if nonces.is_empty() {
            return
        }
        if self.reset_tx.send(ResetRequest { nonces }).await.is_err() {
            warn!(target: "txpool", "pool closed; reset discarded");
        }
    }

    /// Opens an event subscription; an empty filter receives every kind.
    pub fn subscribe(&self, kinds: &[PoolEventKind]) -> EventSubscription {
        self.inner.events.subscribe(kinds)
    }

    /// Cancels the subscription with the given id.
    pub fn cancel_subscription(&self, id: u64) -> bool {
        self.inner.events.cancel(id)
    }

    /// Takes the build lease and snapshots the executables set.
    ///
    /// The builder is expected to be a single consumer; resets arriving while
    /// the session is live are buffered and applied when it ends.
    pub fn prepare(&self) -> BuildSession<'_> {
        BuildSession::new(&self.inner)
    }

    /// Counts, occupancy and subscribers.
    pub fn status(&self) -> PoolStatus {
        self.inner.status()
    }

    /// Queue contents of one sender.
    pub fn inspect(&self, sender: Address) -> Option<AccountTransactions> {
        self.inner.inspect(sender)
    }

    /// Queue contents of every sender.
    pub fn inspect_all(&self) -> HashMap<Address, AccountTransactions> {
        self.inner.inspect_all()
    }

    /// Returns the pooled transaction with the given hash.
    pub fn get(&self, hash: &B256) -> Option<Arc<PooledTransaction>> {
        self.inner.get(hash)
    }

    /// Whether a transaction with the given hash is pooled.
    pub fn contains(&self, hash: &B256) -> bool {
        self.inner.contains(hash)
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the pool holds no transactions.
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Asserts the pool's structural invariants; panics on violation.
    ///
    /// Available to tests only.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn assert_invariants(&self) {
        self.inner.assert_invariants();
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<PoolInner> {
        &self.inner
    }
}

impl fmt::Debug for TxPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxPool").field("inner", &self.inner).finish_non_exhaustive()
    }
}
