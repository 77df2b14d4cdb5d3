//! Transaction pool metrics.

use metrics::{describe_counter, register_counter, Counter};

pub(crate) struct TxPoolMetrics {
    /// Transactions that cleared admission.
    pub(crate) inserted_transactions: Counter,
    /// Transactions rejected during admission.
    pub(crate) invalid_transactions: Counter,
    /// Transactions moved to the promoted queue.
    pub(crate) promoted_transactions: Counter,
    /// Transactions pruned from either queue without executing.
    pub(crate) pruned_transactions: Counter,
    /// Same-nonce replacements.
    pub(crate) replaced_transactions: Counter,
    /// Transactions removed after successful execution.
    pub(crate) executed_transactions: Counter,
    /// Transactions discarded by the block builder.
    pub(crate) dropped_transactions: Counter,
    /// Internal requests lost on a saturated channel.
    pub(crate) dropped_requests: Counter,
    /// Events lost to lagging subscribers.
    pub(crate) dropped_events: Counter,
}

impl Default for TxPoolMetrics {
    /// Initialize TxPoolMetrics struct and register them
    fn default() -> Self {
        Self {
            inserted_transactions: register_counter!("transaction_pool.inserted_transactions"),
            invalid_transactions: register_counter!("transaction_pool.invalid_transactions"),
            promoted_transactions: register_counter!("transaction_pool.promoted_transactions"),
            pruned_transactions: register_counter!("transaction_pool.pruned_transactions"),
            replaced_transactions: register_counter!("transaction_pool.replaced_transactions"),
            executed_transactions: register_counter!("transaction_pool.executed_transactions"),
            dropped_transactions: register_counter!("transaction_pool.dropped_transactions"),
            dropped_requests: register_counter!("transaction_pool.dropped_requests"),
            dropped_events: register_counter!("transaction_pool.dropped_events"),
        }
    }
}

/// Describe transaction pool metrics
pub fn describe() {
    describe_counter!(
        "transaction_pool.inserted_transactions",
        "Number of transactions inserted in the pool"
    );
    describe_counter!("transaction_pool.invalid_transactions", "Number of invalid transactions");
    describe_counter!(
        "transaction_pool.promoted_transactions",
        "Number of transactions promoted to the executable queue"
    );
    describe_counter!(
        "transaction_pool.pruned_transactions",
        "Number of transactions pruned without executing"
    );
    describe_counter!(
        "transaction_pool.replaced_transactions",
        "Number of same-nonce transaction replacements"
    );
    describe_counter!(
        "transaction_pool.executed_transactions",
        "Number of transactions removed after execution"
    );
    describe_counter!(
        "transaction_pool.dropped_transactions",
        "Number of transactions discarded by the block builder"
    );
    describe_counter!(
        "transaction_pool.dropped_requests",
        "Number of internal requests lost on saturated channels"
    );
    describe_counter!(
        "transaction_pool.dropped_events",
        "Number of events lost to lagging subscribers"
    );
}
