//! Events describing status changes of pooled transactions.

use arbor_primitives::B256;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Wrapper around a transaction hash and the event that happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolEvent {
    /// The hash of the transaction this event is about.
    pub hash: B256,
    /// What happened to it.
    pub kind: PoolEventKind,
}

/// Status changes of a pooled transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PoolEventKind {
    /// Transaction entered its sender's enqueued queue.
    Enqueued,
    /// Transaction became executable.
    Promoted,
    /// Transaction was removed from the enqueued queue without executing.
    PrunedEnqueued,
    /// Transaction was removed from the promoted queue without executing.
    PrunedPromoted,
    /// Transaction was replaced by a better-priced one at the same nonce.
    Replaced,
    /// Transaction was discarded by the block builder.
    Dropped,
}
