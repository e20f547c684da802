use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::Clock;
use crate::fairness::fairness_for_wait;
use crate::models::MatchRecord;

use super::outcome::{apply_outcome, classify_votes, VideoDateHandle};
use super::Engine;

/// Tally of one Sweeper cycle, returned for logging/observability — the
/// Sweeper has no caller waiting on it beyond the periodic scheduler.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub expired_resolved: usize,
    pub stale_cancelled: usize,
    pub fairness_refreshed: usize,
    #[serde(skip)]
    pub video_dates: Vec<VideoDateHandle>,
}

/// Runs one sweep cycle: resolves expired vote windows, cancels matches with
/// a disconnected participant, and refreshes fairness for the waiting
/// population. Never forces a transition that would violate an invariant —
/// every write here goes through the same `resolve`/`transition_*`
/// primitives the event path uses, so it can only ever reach a state the
/// event path could also have reached.
pub async fn sweep<C: Clock>(engine: &Engine<C>) -> SweepReport {
    let now = engine.now();
    let mut report = SweepReport::default();

    // Step 1: resolve matches whose vote window has expired.
    for record in engine.matches.expired_active(now) {
        if let Some(handle) = resolve_and_apply(engine, &record, false, now).await {
            report.video_dates.push(handle);
        }
        report.expired_resolved += 1;
    }

    // Step 2: cancel matches where a participant has gone stale, even
    // though the window has not yet expired.
    for record in engine.matches.active_unresolved() {
        if !has_stale_participant(engine, &record, now) {
            continue;
        }
        if let Some(handle) = resolve_and_apply(engine, &record, true, now).await {
            report.video_dates.push(handle);
        }
        report.stale_cancelled += 1;
    }

    // Step 3: stale `waiting` users are left exactly where they are — the
    // Compatibility Filter's freshness predicate already excludes them from
    // candidate selection, and deleting the queue entry here would orphan
    // a match that formed for them moments earlier on another thread.

    // Step 4: refresh fairness for the whole waiting population.
    for user in engine.users.waiting_snapshot() {
        let Some(waiting_since) = user.waiting_since else {
            continue;
        };
        let wait_seconds = (now - waiting_since).num_seconds().max(0);
        let fairness = fairness_for_wait(wait_seconds, engine.config.fairness_max);
        engine.users.set_fairness_if_waiting(user.user_id, fairness);
        report.fairness_refreshed += 1;
    }

    report
}

async fn resolve_and_apply<C: Clock>(
    engine: &Engine<C>,
    record: &MatchRecord,
    cancelled: bool,
    now: DateTime<Utc>,
) -> Option<VideoDateHandle> {
    let outcome = classify_votes(record.user1_vote, record.user2_vote);
    let resolve = engine.matches.resolve(record.match_id, outcome, cancelled, now)?;
    if !resolve.was_resolved_by_us() {
        return None;
    }
    let current = engine.matches.get(record.match_id).unwrap_or_else(|| record.clone());
    // Both Sweeper paths (window expiry and stale-participant cancellation)
    // treat a side with no recorded vote as a silent partner: it goes to
    // idle rather than being respun.
    apply_outcome(engine, &current, resolve.outcome(), true, now).await
}

fn has_stale_participant<C: Clock>(engine: &Engine<C>, record: &MatchRecord, now: DateTime<Utc>) -> bool {
    let heartbeat_fresh = engine.heartbeat_fresh();
    [record.user1_id, record.user2_id].into_iter().any(|user_id| {
        engine
            .users
            .get(user_id)
            .map(|u| now - u.last_active >= heartbeat_fresh)
            .unwrap_or(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FixedClock;
    use crate::clock::SystemClock;
    use crate::config::AppConfig;
    use crate::models::{Gender, GenderPreference, Outcome, UserFacts, UserState, Vote};
    use uuid::Uuid;

    fn facts(gender: Gender) -> UserFacts {
        UserFacts {
            gender: Some(gender),
            gender_preference: GenderPreference::All,
            age: Some(28),
            age_min: None,
            age_max: None,
            cities: vec![],
        }
    }

    #[tokio::test]
    async fn expired_window_resolves_as_idle_idle() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        let engine = Engine::with_clock(AppConfig::default(), clock);
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        engine.users.upsert_facts(u1, facts(Gender::Male), start);
        engine.users.upsert_facts(u2, facts(Gender::Female), start);
        engine.users.transition_waiting(u1, start);
        engine.users.transition_waiting(u2, start);
        let result = super::super::pair_formation::try_form_pair(&engine, u1).await;
        assert!(matches!(
            result,
            super::super::pair_formation::PairFormationResult::Matched(_)
        ));

        // Heartbeats continue (both users stay fresh) while the window lapses.
        engine.clock.advance(chrono::Duration::seconds(61));
        engine.users.heartbeat(u1, engine.now());
        engine.users.heartbeat(u2, engine.now());

        let report = sweep(&engine).await;
        assert_eq!(report.expired_resolved, 1);
        assert_eq!(engine.users.get(u1).unwrap().state, UserState::Idle);
        assert_eq!(engine.users.get(u2).unwrap().state, UserState::Idle);
    }

    #[tokio::test]
    async fn stale_participant_with_a_yes_vote_gets_boosted_and_respun() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        let engine = Engine::with_clock(AppConfig::default(), clock);
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        engine.users.upsert_facts(u1, facts(Gender::Male), start);
        engine.users.upsert_facts(u2, facts(Gender::Female), start);
        engine.users.transition_waiting(u1, start);
        engine.users.transition_waiting(u2, start);
        let result = super::super::pair_formation::try_form_pair(&engine, u1).await;
        let match_id = match result {
            super::super::pair_formation::PairFormationResult::Matched(id) => id,
            other => panic!("expected a match, got {other:?}"),
        };

        engine.matches.try_record_vote(match_id, u1, Vote::Yes, start);

        // u2 never heartbeats again and goes stale; u1 heartbeats and stays fresh.
        engine.clock.advance(chrono::Duration::seconds(11));
        engine.users.heartbeat(u1, engine.now());

        let report = sweep(&engine).await;
        assert_eq!(report.stale_cancelled, 1);

        let rec1 = engine.users.get(u1).unwrap();
        assert_eq!(rec1.state, UserState::Waiting);
        assert_eq!(rec1.fairness, 10);
        let rec2 = engine.users.get(u2).unwrap();
        assert_eq!(rec2.state, UserState::Idle);

        let m = engine.matches.get(match_id).unwrap();
        assert_eq!(m.outcome, Some(Outcome::YesPass));
    }

    #[tokio::test]
    async fn fairness_refresh_matches_the_step_function() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        let engine = Engine::with_clock(AppConfig::default(), clock);
        let u1 = Uuid::new_v4();
        engine.users.upsert_facts(u1, facts(Gender::Male), start);
        engine.users.transition_waiting(u1, start);

        engine.clock.advance(chrono::Duration::seconds(61));
        let report = sweep(&engine).await;
        assert_eq!(report.fairness_refreshed, 1);
        assert_eq!(engine.users.get(u1).unwrap().fairness, 10);
    }
}
