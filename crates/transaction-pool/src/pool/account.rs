use crate::{
    traits::{Store, StoreError},
    validate::PooledTransaction,
};
use arbor_primitives::Address;
use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap, VecDeque},
    sync::Arc,
    time::Instant,
};

/// Per-sender transaction queues.
///
/// `enqueued` holds future-nonce transactions keyed by nonce; `promoted` is
/// the gapless, executable tail starting at the sender's expected nonce.
/// After every dispatched event the following holds: every promoted nonce is
/// `< next_nonce` and consecutive, every enqueued nonce is `>= next_nonce`,
/// and there is at most one transaction per nonce across both queues.
#[derive(Debug)]
pub(crate) struct AccountQueue {
    next_nonce: u64,
    enqueued: BTreeMap<u64, Arc<PooledTransaction>>,
    promoted: VecDeque<Arc<PooledTransaction>>,
    last_promoted: Instant,
}

/// Result of a promotion sweep.
#[derive(Debug, Default)]
pub(crate) struct PromoteOutcome {
    /// Transactions moved into the promoted queue, in nonce order.
    pub(crate) promoted: Vec<Arc<PooledTransaction>>,
    /// Stale sub-`next_nonce` entries discarded along the way.
    pub(crate) dropped: Vec<Arc<PooledTransaction>>,
}

/// Result of applying a post-block nonce to the queues.
#[derive(Debug, Default)]
pub(crate) struct PruneOutcome {
    pub(crate) promoted: Vec<Arc<PooledTransaction>>,
    pub(crate) enqueued: Vec<Arc<PooledTransaction>>,
}

/// Result of removing a failed head from the promoted queue.
#[derive(Debug, Default)]
pub(crate) struct RemoveFailedOutcome {
    pub(crate) failed: Option<Arc<PooledTransaction>>,
    /// Former promoted descendants pushed back into enqueued.
    pub(crate) reenqueued: Vec<Arc<PooledTransaction>>,
}

/// A same-nonce transaction already held by the account.
#[derive(Debug)]
pub(crate) struct Incumbent {
    pub(crate) tx: Arc<PooledTransaction>,
    /// Whether the incumbent sits in the promoted queue.
    pub(crate) promoted: bool,
}

impl AccountQueue {
    pub(crate) fn new(next_nonce: u64) -> Self {
        Self {
            next_nonce,
            enqueued: BTreeMap::new(),
            promoted: VecDeque::new(),
            last_promoted: Instant::now(),
        }
    }

    pub(crate) const fn next_nonce(&self) -> u64 {
        self.next_nonce
    }

    pub(crate) const fn last_promoted(&self) -> Instant {
        self.last_promoted
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn set_last_promoted(&mut self, at: Instant) {
        self.last_promoted = at;
    }

    pub(crate) fn enqueued_len(&self) -> usize {
        self.enqueued.len()
    }

    pub(crate) fn promoted_len(&self) -> usize {
        self.promoted.len()
    }

    pub(crate) fn combined_len(&self) -> usize {
        self.enqueued.len() + self.promoted.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.enqueued.is_empty() && self.promoted.is_empty()
    }

    pub(crate) fn first_promoted(&self) -> Option<&Arc<PooledTransaction>> {
        self.promoted.front()
    }

    pub(crate) fn first_enqueued_nonce(&self) -> Option<u64> {
        self.enqueued.keys().next().copied()
    }

    pub(crate) fn enqueued_iter(&self) -> impl Iterator<Item = &Arc<PooledTransaction>> {
        self.enqueued.values()
    }

    pub(crate) fn promoted_iter(&self) -> impl Iterator<Item = &Arc<PooledTransaction>> {
        self.promoted.iter()
    }

    /// Returns the transaction currently occupying `nonce`, if any.
    pub(crate) fn incumbent(&self, nonce: u64) -> Option<Incumbent> {
        if let Some(tx) = self.enqueued.get(&nonce) {
            return Some(Incumbent { tx: tx.clone(), promoted: false })
        }
        let front = self.promoted.front()?;
        if nonce < front.nonce() || nonce >= self.next_nonce {
            return None
        }
        let idx = (nonce - front.nonce()) as usize;
        self.promoted.get(idx).map(|tx| Incumbent { tx: tx.clone(), promoted: true })
    }

    /// Swaps `tx` in at its nonce, returning the displaced incumbent.
    ///
    /// The caller is responsible for having checked the price bump.
    pub(crate) fn replace(&mut self, tx: Arc<PooledTransaction>) -> Option<Arc<PooledTransaction>> {
        let nonce = tx.nonce();
        if self.enqueued.contains_key(&nonce) {
            return self.enqueued.insert(nonce, tx)
        }
        let front_nonce = self.promoted.front()?.nonce();
        if nonce < front_nonce || nonce >= self.next_nonce {
            return None
        }
        let idx = (nonce - front_nonce) as usize;
        let slot = self.promoted.get_mut(idx)?;
        Some(std::mem::replace(slot, tx))
    }

    /// Inserts a transaction into the enqueued queue.
    ///
    /// Must not be called while another transaction occupies the nonce.
    pub(crate) fn enqueue(&mut self, tx: Arc<PooledTransaction>) {
        debug_assert!(tx.nonce() >= self.next_nonce);
        let prev = self.enqueued.insert(tx.nonce(), tx);
        debug_assert!(prev.is_none(), "enqueue over an incumbent");
    }

    /// Slides every gapless enqueued transaction into the promoted queue.
    ///
    /// Stale entries below `next_nonce` encountered along the way are
    /// discarded rather than allowed to wedge the account.
    pub(crate) fn promote(&mut self, now: Instant) -> PromoteOutcome {
        let mut outcome = PromoteOutcome::default();
        while let Some((&nonce, _)) = self.enqueued.first_key_value() {
            if nonce > self.next_nonce {
                break
            }
            let Some((_, tx)) = self.enqueued.pop_first() else { break };
            if nonce < self.next_nonce {
                outcome.dropped.push(tx);
                continue
            }
            self.next_nonce += 1;
            self.promoted.push_back(tx.clone());
            outcome.promoted.push(tx);
        }
        if !outcome.promoted.is_empty() {
            self.last_promoted = now;
        }
        outcome
    }

    /// Discards everything below `new_nonce` and raises the expected nonce.
    pub(crate) fn prune_below(&mut self, new_nonce: u64) -> PruneOutcome {
        let mut outcome = PruneOutcome::default();
        while let Some(front) = self.promoted.front() {
            if front.nonce() >= new_nonce {
                break
            }
            if let Some(tx) = self.promoted.pop_front() {
                outcome.promoted.push(tx);
            }
        }
        let keep = self.enqueued.split_off(&new_nonce);
        let drained = std::mem::replace(&mut self.enqueued, keep);
        outcome.enqueued = drained.into_values().collect();
        self.next_nonce = self.next_nonce.max(new_nonce);
        outcome
    }

    /// Discards `nonce` and every higher-nonce transaction from both queues
    /// and rewinds the expected nonce to `nonce`.
    pub(crate) fn drop_from(
        &mut self,
        nonce: u64,
    ) -> (Vec<Arc<PooledTransaction>>, Vec<Arc<PooledTransaction>>) {
        let split =
            self.promoted.iter().position(|tx| tx.nonce() >= nonce).unwrap_or(self.promoted.len());
        let from_promoted: Vec<_> = self.promoted.split_off(split).into();
        let from_enqueued: Vec<_> = self.enqueued.split_off(&nonce).into_values().collect();
        self.next_nonce = nonce;
        (from_promoted, from_enqueued)
    }

    /// Removes the failed promoted head and demotes its former descendants
    /// back into the enqueued queue; the account has to see a fresh
    /// transaction at `nonce` before any of them can execute.
    pub(crate) fn remove_failed(&mut self, nonce: u64) -> RemoveFailedOutcome {
        let mut outcome = RemoveFailedOutcome::default();
        match self.promoted.front() {
            Some(front) if front.nonce() == nonce => {}
            _ => return outcome,
        }
        outcome.failed = self.promoted.pop_front();
        outcome.reenqueued = self.promoted.drain(..).collect();
        for tx in &outcome.reenqueued {
            self.enqueued.insert(tx.nonce(), tx.clone());
        }
        self.next_nonce = nonce;
        outcome
    }

    /// Removes the executed promoted head if it matches `nonce`.
    pub(crate) fn remove_executed(&mut self, nonce: u64) -> Option<Arc<PooledTransaction>> {
        match self.promoted.front() {
            Some(front) if front.nonce() == nonce => self.promoted.pop_front(),
            _ => None,
        }
    }

    /// Drains the whole enqueued queue.
    pub(crate) fn clear_enqueued(&mut self) -> Vec<Arc<PooledTransaction>> {
        std::mem::take(&mut self.enqueued).into_values().collect()
    }
}

/// All per-sender queues, created lazily on first contact.
#[derive(Debug, Default)]
pub(crate) struct AccountRegistry {
    accounts: HashMap<Address, AccountQueue>,
}

impl AccountRegistry {
    pub(crate) fn get(&self, sender: Address) -> Option<&AccountQueue> {
        self.accounts.get(&sender)
    }

    pub(crate) fn get_mut(&mut self, sender: Address) -> Option<&mut AccountQueue> {
        self.accounts.get_mut(&sender)
    }

    /// Returns the sender's queue, reading the committed nonce from the
    /// store on first contact.
    pub(crate) fn get_or_create(
        &mut self,
        sender: Address,
        store: &dyn Store,
    ) -> Result<&mut AccountQueue, StoreError> {
        match self.accounts.entry(sender) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let nonce = store.nonce(sender)?;
                Ok(entry.insert(AccountQueue::new(nonce)))
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.accounts.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Address, &AccountQueue)> {
        self.accounts.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&Address, &mut AccountQueue)> {
        self.accounts.iter_mut()
    }

    pub(crate) fn promoted_count(&self) -> u64 {
        self.accounts.values().map(|a| a.promoted_len() as u64).sum()
    }

    pub(crate) fn enqueued_count(&self) -> u64 {
        self.accounts.values().map(|a| a.enqueued_len() as u64).sum()
    }
}
