use std::time::Duration;

/// Default minimum accepted gas price.
pub const DEFAULT_PRICE_LIMIT: u64 = 1;

/// Default slot capacity of the whole pool.
pub const DEFAULT_MAX_SLOTS: u64 = 4096;

/// Default percentage a replacement must outbid the incumbent by.
pub const DEFAULT_PRICE_BUMP: u64 = 10;

/// Default cadence of the stale-account prune task.
pub const DEFAULT_PRUNE_TICK: Duration = Duration::from_secs(30);

/// Default age after which a promotion-less account is considered stale.
pub const DEFAULT_PROMOTE_OUTDATE: Duration = Duration::from_secs(180);

/// Default cadence of the memory clipping task.
pub const DEFAULT_CLIPPING_TICK: Duration = Duration::from_secs(60);

/// Default slot occupancy above which clipping starts evicting.
pub const DEFAULT_CLIPPING_THRESHOLD: u64 = 2000;

/// Capacity of each dispatcher request channel.
pub const REQUEST_CHANNEL_CAPACITY: usize = 4096;

/// Per-subscriber event buffer size.
pub const EVENT_CHANNEL_CAPACITY: usize = 2048;

/// How long the dispatcher keeps draining requests after a shutdown signal.
pub const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(5);

/// How long a build-session lease blocks reset application.
pub const SESSION_LEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration options for the transaction pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum acceptable gas price.
    pub price_limit: u64,
    /// Locally submitted transactions may go below `price_limit`.
    pub local_price_bypass: bool,
    /// Total slot capacity.
    pub max_slots: u64,
    /// Required price bump over an incumbent same-nonce transaction, in percent.
    pub price_bump: u64,
    /// Whether this node seals blocks; gossip is discarded otherwise.
    pub sealing: bool,
    /// Cadence of the stale-account prune task.
    pub prune_tick: Duration,
    /// Accounts without a promotion for this long have their enqueued
    /// transactions pruned.
    pub promote_outdate: Duration,
    /// Cadence of the memory clipping task.
    pub clipping_tick: Duration,
    /// Slot occupancy above which clipping evicts enqueued queues.
    pub clipping_threshold: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            price_limit: DEFAULT_PRICE_LIMIT,
            local_price_bypass: false,
            max_slots: DEFAULT_MAX_SLOTS,
            price_bump: DEFAULT_PRICE_BUMP,
            sealing: false,
            prune_tick: DEFAULT_PRUNE_TICK,
            promote_outdate: DEFAULT_PROMOTE_OUTDATE,
            clipping_tick: DEFAULT_CLIPPING_TICK,
            clipping_threshold: DEFAULT_CLIPPING_THRESHOLD,
        }
    }
}
