use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks how many slots of the pool's capacity are occupied.
///
/// Written by the dispatcher and build sessions only; read lock-free by
/// admission checks and the operator surface.
#[derive(Debug)]
pub(crate) struct SlotGauge {
    used: AtomicU64,
    max: u64,
}

impl SlotGauge {
    pub(crate) const fn new(max: u64) -> Self {
        Self { used: AtomicU64::new(0), max }
    }

    /// Currently occupied slots.
    pub(crate) fn read(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    /// Total capacity.
    pub(crate) const fn max(&self) -> u64 {
        self.max
    }

    /// Whether `slots` more would still fit.
    pub(crate) fn fits(&self, slots: u64) -> bool {
        self.read().checked_add(slots).is_some_and(|total| total <= self.max)
    }

    pub(crate) fn increase(&self, slots: u64) {
        self.used.fetch_add(slots, Ordering::Relaxed);
    }

    pub(crate) fn decrease(&self, slots: u64) {
        // saturate rather than wrap if accounting ever drifts
        let mut current = self.used.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_sub(slots);
            match self.used.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_arithmetic() {
        let gauge = SlotGauge::new(10);
        assert_eq!(gauge.read(), 0);
        assert!(gauge.fits(10));
        assert!(!gauge.fits(11));

        gauge.increase(7);
        assert_eq!(gauge.read(), 7);
        assert!(gauge.fits(3));
        assert!(!gauge.fits(4));

        gauge.decrease(3);
        assert_eq!(gauge.read(), 4);
    }

    #[test]
    fn decrease_saturates() {
        let gauge = SlotGauge::new(10);
        gauge.increase(2);
        gauge.decrease(5);
        assert_eq!(gauge.read(), 0);
    }
}
