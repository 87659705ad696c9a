//! Local port allocation.
//!
//! A port counts as free when nothing accepts a TCP connection on it at the
//! moment of probing. This is a point-in-time check, not a reservation: two
//! concurrent invocations can still pick the same port.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::{Error, Result};
use crate::port::outbound::probe::PortProbe;

/// Finds unused ports within a fixed inclusive range.
pub struct PortAllocator {
    probe: Arc<dyn PortProbe>,
    low: u16,
    high: u16,
}

impl PortAllocator {
    pub fn new(probe: Arc<dyn PortProbe>, range: RangeInclusive<u16>) -> Self {
        Self {
            probe,
            low: *range.start(),
            high: *range.end(),
        }
    }

    #[must_use]
    pub fn range(&self) -> RangeInclusive<u16> {
        self.low..=self.high
    }

    /// Shuffled candidate order over the whole range.
    fn candidates(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.range().collect();
        ports.shuffle(&mut rand::thread_rng());
        ports
    }

    fn exhausted(&self) -> Error {
        Error::PortExhausted {
            low: self.low,
            high: self.high,
        }
    }

    /// Return the first free port in shuffled order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortExhausted`] when every port in the range is in use.
    pub async fn find_free_port(&self) -> Result<u16> {
        self.find_free_port_excluding(&HashSet::new()).await
    }

    /// Like [`find_free_port`](Self::find_free_port), skipping ports already
    /// handed out to sibling roles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortExhausted`] when no candidate is free.
    pub async fn find_free_port_excluding(&self, exclude: &HashSet<u16>) -> Result<u16> {
        for port in self.candidates() {
            if exclude.contains(&port) {
                continue;
            }
            if !self.probe.in_use(port).await {
                debug!(port, "Selected free port");
                return Ok(port);
            }
        }
        Err(self.exhausted())
    }

    /// Find a free port `p` whose derived companion `p + 1` is free too.
    ///
    /// Used for backends that expose a secondary control-plane port by
    /// convention. Only `p` has to lie inside the range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortExhausted`] when no candidate pair is free.
    pub async fn find_free_port_pair(&self, exclude: &HashSet<u16>) -> Result<u16> {
        for port in self.candidates() {
            let Some(companion) = port.checked_add(1) else {
                continue;
            };
            if exclude.contains(&port) || exclude.contains(&companion) {
                continue;
            }
            if self.probe.in_use(port).await || self.probe.in_use(companion).await {
                continue;
            }
            debug!(port, companion, "Selected free port pair");
            return Ok(port);
        }
        Err(self.exhausted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::ports::SetPortProbe;

    fn allocator(busy: impl IntoIterator<Item = u16>, range: RangeInclusive<u16>) -> PortAllocator {
        PortAllocator::new(Arc::new(SetPortProbe::busy(busy)), range)
    }

    #[tokio::test]
    async fn single_free_port_is_found() {
        let alloc = allocator([50000, 50001, 50003, 50004], 50000..=50004);
        for _ in 0..10 {
            assert_eq!(alloc.find_free_port().await.unwrap(), 50002);
        }
    }

    #[tokio::test]
    async fn fully_occupied_range_is_exhausted() {
        let alloc = allocator(50000..=50004, 50000..=50004);
        let err = alloc.find_free_port().await.unwrap_err();
        assert!(matches!(
            err,
            Error::PortExhausted {
                low: 50000,
                high: 50004
            }
        ));
    }

    #[tokio::test]
    async fn excluded_ports_are_skipped() {
        let alloc = allocator([], 50000..=50001);
        let exclude = HashSet::from([50000]);
        assert_eq!(alloc.find_free_port_excluding(&exclude).await.unwrap(), 50001);
    }

    #[tokio::test]
    async fn pair_requires_companion_free() {
        // 50000 is free but 50001 is busy; 50002 and 50003 are both free.
        let alloc = allocator([50001], 50000..=50002);
        for _ in 0..10 {
            assert_eq!(alloc.find_free_port_pair(&HashSet::new()).await.unwrap(), 50002);
        }
    }

    #[tokio::test]
    async fn pair_respects_exclusions() {
        let alloc = allocator([], 50000..=50001);
        let exclude = HashSet::from([50002]);
        assert_eq!(alloc.find_free_port_pair(&exclude).await.unwrap(), 50000);
    }

    #[tokio::test]
    async fn pair_at_top_of_port_space_is_skipped() {
        let alloc = allocator([], 65535..=65535);
        assert!(matches!(
            alloc.find_free_port_pair(&HashSet::new()).await,
            Err(Error::PortExhausted { .. })
        ));
    }
}
