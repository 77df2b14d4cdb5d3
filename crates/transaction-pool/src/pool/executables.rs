use crate::validate::PooledTransaction;
use arbor_primitives::{Address, B256, U256};
use fnv::FnvHashMap;
use std::{cmp::Ordering, collections::BTreeSet, time::Instant};

/// Positional hint into an account's promoted queue.
///
/// The canonical transaction lives in the [`AccountQueue`]; a ref only
/// carries enough to order heads and to detect staleness at pop time by
/// comparing against the live promoted front.
///
/// [`AccountQueue`]: crate::pool::account::AccountQueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExecutableRef {
    pub(crate) gas_price: U256,
    pub(crate) nonce: u64,
    pub(crate) arrived: Instant,
    pub(crate) sender: Address,
    pub(crate) hash: B256,
}

impl ExecutableRef {
    pub(crate) fn new(tx: &PooledTransaction) -> Self {
        Self {
            gas_price: tx.gas_price(),
            nonce: tx.nonce(),
            arrived: tx.timestamp(),
            sender: tx.sender(),
            hash: tx.hash(),
        }
    }
}

impl PartialOrd for ExecutableRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExecutableRef {
    fn cmp(&self, other: &Self) -> Ordering {
        // "greater" schedules earlier: higher price, then lower nonce, then
        // earlier arrival; sender + hash break the remaining ties so distinct
        // refs never compare equal inside the set
        self.gas_price
            .cmp(&other.gas_price)
            .then_with(|| other.nonce.cmp(&self.nonce))
            .then_with(|| other.arrived.cmp(&self.arrived))
            .then_with(|| other.sender.cmp(&self.sender))
            .then_with(|| other.hash.cmp(&self.hash))
    }
}

/// Price-ordered set of the current promoted head of every account.
///
/// Holds exactly one entry per account with a non-empty promoted queue.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecutableHeap {
    scored: BTreeSet<ExecutableRef>,
    by_sender: FnvHashMap<Address, ExecutableRef>,
}

impl ExecutableHeap {
    /// Replaces the account's entry with `head`.
    pub(crate) fn push_head(&mut self, head: ExecutableRef) {
        if let Some(old) = self.by_sender.insert(head.sender, head.clone()) {
            self.scored.remove(&old);
        }
        self.scored.insert(head);
    }

    /// Removes the account's entry, if any.
    pub(crate) fn remove(&mut self, sender: Address) {
        if let Some(old) = self.by_sender.remove(&sender) {
            self.scored.remove(&old);
        }
    }

    /// Removes and returns the highest-priced head.
    pub(crate) fn pop_best(&mut self) -> Option<ExecutableRef> {
        let best = self.scored.pop_last()?;
        self.by_sender.remove(&best.sender);
        Some(best)
    }

    pub(crate) fn len(&self) -> usize {
        self.scored.len()
    }

    pub(crate) fn contains_sender(&self, sender: Address) -> bool {
        self.by_sender.contains_key(&sender)
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn head_of(&self, sender: Address) -> Option<&ExecutableRef> {
        self.by_sender.get(&sender)
    }

    #[cfg(test)]
    pub(crate) fn peek_best(&self) -> Option<&ExecutableRef> {
        self.scored.last()
    }
}
