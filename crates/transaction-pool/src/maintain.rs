//! Periodic pool upkeep driven by the dispatcher's timers.

use crate::pool::{events::PoolEventKind, PoolInner, PoolState};
use std::time::Instant;
use tracing::{debug, warn};

impl PoolInner {
    /// Clears the enqueued queues of accounts that have not promoted
    /// anything for the configured outdate window.
    ///
    /// Only accounts with an empty promoted queue qualify; a sender that is
    /// actively executing keeps its backlog.
    pub(crate) fn prune_stale_accounts(&self) {
        let now = Instant::now();
        let mut stale = Vec::new();
        {
            let mut pool = self.pool.write();
            for (_, account) in pool.registry.iter_mut() {
                if account.promoted_len() != 0 || account.enqueued_len() == 0 {
                    continue
                }
                if now.duration_since(account.last_promoted()) <= self.config.promote_outdate {
                    continue
                }
                stale.extend(account.clear_enqueued());
            }
        }
        if stale.is_empty() {
            return
        }
        debug!(target: "txpool", count = stale.len(), "pruned stale enqueued transactions");
        self.metrics.pruned_transactions.increment(stale.len() as u64);
        self.discard(stale, PoolEventKind::PrunedEnqueued);
    }

    /// Evicts whole enqueued queues while slot occupancy sits above the
    /// clipping threshold.
    ///
    /// Victims are the accounts holding the most transactions; equal hoards
    /// tie-break to the lowest sender address so eviction stays
    /// deterministic. Promoted queues are never clipped.
    pub(crate) fn clip_memory_eater(&self) {
        while self.gauge.read() > self.config.clipping_threshold {
            let mut pool = self.pool.write();
            let PoolState { registry, .. } = &mut *pool;

            let Some(victim) = registry
                .iter()
                .filter(|(_, account)| account.enqueued_len() > 0)
                .max_by(|(addr_a, a), (addr_b, b)| {
                    a.combined_len().cmp(&b.combined_len()).then_with(|| addr_b.cmp(addr_a))
                })
                .map(|(addr, _)| *addr)
            else {
                return
            };

            let Some(account) = registry.get_mut(victim) else { return };
            let clipped = account.clear_enqueued();
            drop(pool);

            warn!(
                target: "txpool",
                sender = %victim,
                count = clipped.len(),
                "clipping enqueued transactions under memory pressure"
            );
            self.metrics.pruned_transactions.increment(clipped.len() as u64);
            self.discard(clipped, PoolEventKind::PrunedEnqueued);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::PoolConfig,
        test_utils::{add_direct, test_tx, TestPoolBuilder, ADDR1, ADDR2, ADDR3},
        TxPool,
    };
    use std::time::{Duration, Instant};

    fn age_account(pool: &TxPool, sender: arbor_primitives::Address, by: Duration) {
        let inner = pool.inner();
        let mut state = inner.pool.write();
        if let Some(account) = state.registry.get_mut(sender) {
            account.set_last_promoted(Instant::now() - by);
        }
    }

    #[test]
    fn prunes_stale_account_backlog() {
        let pool = TestPoolBuilder::default().build();
        add_direct(&pool, test_tx(ADDR1, 3, 1)).unwrap();

        let outdate = pool.inner().config.promote_outdate;
        age_account(&pool, ADDR1, outdate + Duration::from_secs(1));

        pool.inner().prune_stale_accounts();

        assert_eq!(pool.inspect(ADDR1).unwrap().enqueued.len(), 0);
        assert_eq!(pool.status().slots_used, 0);
        pool.assert_invariants();
    }

    #[test]
    fn keeps_fresh_account_backlog() {
        let pool = TestPoolBuilder::default().build();
        add_direct(&pool, test_tx(ADDR1, 5, 1)).unwrap();

        age_account(&pool, ADDR1, Duration::from_secs(5));
        pool.inner().prune_stale_accounts();

        assert_eq!(pool.inspect(ADDR1).unwrap().enqueued.len(), 1);
        assert_eq!(pool.status().slots_used, 1);
        pool.assert_invariants();
    }

    #[test]
    fn clips_largest_hoard_first() {
        let config = PoolConfig { max_slots: 300, clipping_threshold: 1, ..Default::default() };
        let pool = TestPoolBuilder::default().with_config(config).build();

        add_direct(&pool, test_tx(ADDR1, 1, 1)).unwrap();
        add_direct(&pool, test_tx(ADDR2, 2, 1)).unwrap();
        add_direct(&pool, test_tx(ADDR2, 3, 1)).unwrap();

        pool.inner().clip_memory_eater();

        // the two-transaction hoard goes first, which already clears the bar
        assert_eq!(pool.status().slots_used, 1);
        assert_eq!(pool.inspect(ADDR2).unwrap().enqueued.len(), 0);
        assert_eq!(pool.inspect(ADDR1).unwrap().enqueued.len(), 1);
        pool.assert_invariants();
    }

    #[test]
    fn clipping_ties_break_to_lowest_address() {
        let config = PoolConfig { max_slots: 300, clipping_threshold: 1, ..Default::default() };
        let pool = TestPoolBuilder::default().with_config(config).build();

        add_direct(&pool, test_tx(ADDR1, 1, 1)).unwrap();
        add_direct(&pool, test_tx(ADDR2, 2, 1)).unwrap();
        add_direct(&pool, test_tx(ADDR3, 3, 1)).unwrap();

        pool.inner().clip_memory_eater();

        // eviction repeats until occupancy is back at the threshold,
        // consuming the lowest addresses first
        assert_eq!(pool.status().slots_used, 1);
        assert_eq!(pool.inspect(ADDR1).unwrap().enqueued.len(), 0);
        assert_eq!(pool.inspect(ADDR2).unwrap().enqueued.len(), 0);
        assert_eq!(pool.inspect(ADDR3).unwrap().enqueued.len(), 1);
        pool.assert_invariants();
    }

    #[test]
    fn clipping_spares_promoted_queues() {
        let config = PoolConfig { max_slots: 300, clipping_threshold: 1, ..Default::default() };
        let pool = TestPoolBuilder::default().with_config(config).build();

        crate::test_utils::add_and_promote(&pool, test_tx(ADDR1, 0, 1)).unwrap();
        crate::test_utils::add_and_promote(&pool, test_tx(ADDR1, 1, 1)).unwrap();
        add_direct(&pool, test_tx(ADDR2, 9, 1)).unwrap();

        pool.inner().clip_memory_eater();

        // only the enqueued queue is clippable; occupancy stays above the
        // threshold once nothing else can go
        assert_eq!(pool.inspect(ADDR1).unwrap().promoted.len(), 2);
        assert_eq!(pool.inspect(ADDR2).unwrap().enqueued.len(), 0);
        assert_eq!(pool.status().slots_used, 2);
        pool.assert_invariants();
    }
}
