//! Write stamps that keep a listener from seeing older state after newer.
//!
//! Handlers run outside the store's locks, so a handler that writes can
//! make a newer notification overtake an older one still being fanned out.
//! Every delivery carries the store revision it was read at, and each
//! listener drops anything not newer than what it already received.

use std::sync::atomic::{AtomicU64, Ordering};

/// Store-wide write counter. Bump while holding the lock that guards the
/// written state, and read it under the lock that guards the delivered state.
#[derive(Debug, Default)]
pub(crate) struct Revision(AtomicU64);

impl Revision {
    /// Advances the counter and returns the new revision.
    pub(crate) fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the latest revision.
    pub(crate) fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-listener record of the newest revision handed out.
#[derive(Debug, Default)]
pub(crate) struct DeliveryGate {
    // One past the last delivered revision; zero before the first delivery.
    next: AtomicU64,
}

impl DeliveryGate {
    /// Returns true if `revision` is newer than every earlier claim.
    pub(crate) fn claim(&self, revision: u64) -> bool {
        let next = revision + 1;
        self.next.fetch_max(next, Ordering::AcqRel) < next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_claim_succeeds_even_at_zero() {
        let gate = DeliveryGate::default();
        assert!(gate.claim(0));
        assert!(!gate.claim(0));
    }

    #[test]
    fn older_revisions_are_refused() {
        let gate = DeliveryGate::default();
        assert!(gate.claim(2));
        assert!(!gate.claim(1));
        assert!(!gate.claim(2));
        assert!(gate.claim(5));
    }

    #[test]
    fn revisions_increase() {
        let revision = Revision::default();
        assert_eq!(revision.current(), 0);
        assert_eq!(revision.bump(), 1);
        assert_eq!(revision.bump(), 2);
        assert_eq!(revision.current(), 2);
    }
}
