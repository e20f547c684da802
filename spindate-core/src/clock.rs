use chrono::{DateTime, Utc};

/// Monotonic-enough time source for the engine.
///
/// Production code reaches for wall-clock time directly via `Utc::now()`;
/// this crate puts one seam behind a trait so tests can assert
/// exact-boundary freshness and vote-window behavior without flaky real
/// sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock, backed by wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Freshness predicate: `now - last_active < heartbeat_fresh` OR (the "new
/// entrant" fallback) `now - waiting_since < new_entrant_fresh`. Without
/// the fallback, two brand-new users who spin simultaneously — and so have
/// no heartbeat yet — could never match.
///
/// A user whose `last_active` is exactly `heartbeat_fresh` old is treated
/// as stale, not fresh — a strict `<` rather than `<=` bound, chosen so the
/// boundary is exact and testable.
pub fn is_fresh(
    last_active: DateTime<Utc>,
    waiting_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    heartbeat_fresh: chrono::Duration,
    new_entrant_fresh: chrono::Duration,
) -> bool {
    if now - last_active < heartbeat_fresh {
        return true;
    }
    match waiting_since {
        Some(ws) => now - ws < new_entrant_fresh,
        None => false,
    }
}

#[cfg(test)]
mod freshness_tests {
    use super::*;

    #[test]
    fn exactly_at_bound_is_not_fresh() {
        let now = Utc::now();
        let last_active = now - chrono::Duration::seconds(10);
        assert!(!is_fresh(
            last_active,
            None,
            now,
            chrono::Duration::seconds(10),
            chrono::Duration::seconds(60)
        ));
    }

    #[test]
    fn just_under_bound_is_fresh() {
        let now = Utc::now();
        let last_active = now - chrono::Duration::milliseconds(9_999);
        assert!(is_fresh(
            last_active,
            None,
            now,
            chrono::Duration::seconds(10),
            chrono::Duration::seconds(60)
        ));
    }

    #[test]
    fn new_entrant_fallback_covers_no_heartbeat_yet() {
        let now = Utc::now();
        let stale_heartbeat = now - chrono::Duration::seconds(30);
        let recent_waiting = Some(now - chrono::Duration::seconds(5));
        assert!(is_fresh(
            stale_heartbeat,
            recent_waiting,
            now,
            chrono::Duration::seconds(10),
            chrono::Duration::seconds(60)
        ));
    }
}
