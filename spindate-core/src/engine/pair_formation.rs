use chrono::Duration;
use uuid::Uuid;

use crate::clock::{is_fresh, Clock};
use crate::compat::compatible;
use crate::models::{MatchId, UserRecord, UserState};

use super::Engine;

/// Outcome of a single Pair Formation Engine invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairFormationResult {
    /// Step 7-9 committed: a match now exists between the initiator and the
    /// returned partner.
    Matched(MatchId),
    /// Step 1/5 lock contention: another invocation is already handling one
    /// of the two users. The caller does nothing further; the next trigger
    /// (another spin, or the Sweeper) will retry.
    Busy,
    /// Step 4: no compatible fresh candidate exists right now.
    NoMatch,
    /// Step 6 double-check failed after acquiring both locks (a concurrent
    /// invocation claimed one of the two users first). Safe to retry.
    Retry,
}

/// Implements the ten-step pairing algorithm: lock the initiator, select a
/// candidate, lock the candidate, double-check both, then commit. Triggered
/// event-driven at the end of `spin` and whenever another resolution could
/// have freed a candidate; idempotent under repeated invocation.
pub async fn try_form_pair<C: Clock>(engine: &Engine<C>, user_id: Uuid) -> PairFormationResult {
    // Step 1: non-blocking per-user lock on the initiator.
    let Some(_initiator_guard) = engine.locks.try_lock(user_id) else {
        return PairFormationResult::Busy;
    };

    // Step 2: re-read and validate.
    let now = engine.now();
    let Some(initiator) = engine.users.get(user_id) else {
        return PairFormationResult::NoMatch;
    };
    if initiator.state != UserState::Waiting || !fresh(engine, &initiator, now) {
        return PairFormationResult::NoMatch;
    }

    // Step 3: select the best candidate among all waiting, fresh,
    // compatible users — fairness DESC, waiting_since ASC, tie broken
    // deterministically on user id.
    let candidates = engine.users.waiting_snapshot();
    let best = candidates
        .into_iter()
        .filter(|c| c.user_id != user_id)
        .filter(|c| fresh(engine, c, now))
        .filter(|c| compatible(&initiator, c, &engine.history))
        .min_by(|a, b| candidate_order(a, b));

    // Step 4: no candidate.
    let Some(candidate) = best else {
        return PairFormationResult::NoMatch;
    };

    // Step 5: non-blocking per-user lock on the candidate.
    let Some(_candidate_guard) = engine.locks.try_lock(candidate.user_id) else {
        return PairFormationResult::Retry;
    };

    // Step 6: double-checked re-validation of both sides.
    let now = engine.now();
    let Some(initiator) = engine.users.get(user_id) else {
        return PairFormationResult::NoMatch;
    };
    let Some(candidate) = engine.users.get(candidate.user_id) else {
        return PairFormationResult::Retry;
    };
    if initiator.state != UserState::Waiting || candidate.state != UserState::Waiting {
        return PairFormationResult::Retry;
    }
    if !fresh(engine, &initiator, now) || !fresh(engine, &candidate, now) {
        return PairFormationResult::Retry;
    }
    if !compatible(&initiator, &candidate, &engine.history) {
        return PairFormationResult::NoMatch;
    }

    // Steps 7-9: atomic unit — match creation, both transitions, history
    // insert. The two held locks make this section exclusive with respect
    // to any other invocation touching either user.
    let match_id = Uuid::new_v4();
    let window = Duration::seconds(engine.config.vote_window_secs);
    engine
        .matches
        .create_active(match_id, initiator.user_id, candidate.user_id, window, now);

    engine
        .users
        .transition_matched(initiator.user_id, match_id, candidate.user_id, now);
    engine
        .users
        .transition_matched(candidate.user_id, match_id, initiator.user_id, now);
    engine.users.transition_vote_window(initiator.user_id, now);
    engine.users.transition_vote_window(candidate.user_id, now);

    engine.history.record(initiator.user_id, candidate.user_id);

    // Step 10: locks released on drop at end of scope.
    PairFormationResult::Matched(match_id)
}

fn fresh<C: Clock>(engine: &Engine<C>, record: &UserRecord, now: chrono::DateTime<chrono::Utc>) -> bool {
    is_fresh(
        record.last_active,
        record.waiting_since,
        now,
        engine.heartbeat_fresh(),
        engine.new_entrant_fresh(),
    )
}

/// `fairness DESC, waiting_since ASC`; a further tie resolves on user id so
/// ordering is deterministic within a cycle.
fn candidate_order(a: &UserRecord, b: &UserRecord) -> std::cmp::Ordering {
    b.fairness
        .cmp(&a.fairness)
        .then_with(|| a.waiting_since.cmp(&b.waiting_since))
        .then_with(|| a.user_id.cmp(&b.user_id))
}
