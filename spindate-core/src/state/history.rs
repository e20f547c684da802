use dashmap::DashSet;

use crate::models::UserId;

/// Append-only set of unordered user pairs that have ever matched, enforcing
/// re-pair prevention. Keyed the same way a normalized-pair history table
/// usually is (`a < b` ordering collapses `(a, b)` and `(b, a)` to one key)
/// but reduced to the boolean "have these two ever matched" fact —
/// per-pair scoring, TTL'd modifiers, and like/follow/skip counters belong
/// to recommendation-quality ranking and are not carried forward.
///
/// Insertion is idempotent and the pair is permanent (no TTL): historical
/// conversation content is not persisted here, but the re-pair ban itself
/// must hold forever — once matched, a pair is never offered to each other
/// again.
pub struct HistoryLedger {
    pairs: DashSet<(UserId, UserId)>,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self {
            pairs: DashSet::new(),
        }
    }

    fn normalize(a: UserId, b: UserId) -> (UserId, UserId) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Write-once, insert-idempotent. Returns `true` if this pair was newly
    /// recorded, `false` if it was already present.
    pub fn record(&self, a: UserId, b: UserId) -> bool {
        self.pairs.insert(Self::normalize(a, b))
    }

    pub fn has_matched(&self, a: UserId, b: UserId) -> bool {
        self.pairs.contains(&Self::normalize(a, b))
    }
}
