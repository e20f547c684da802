use chrono::{DateTime, Utc};

pub use crate::models::VideoDateHandle;
use crate::models::{MatchRecord, Outcome, UserId, Vote};

use crate::clock::Clock;

use super::Engine;

/// The outcome table, collapsed to a pure function of the two recorded
/// votes. The expiry/disconnect cases (`yes`/`null`, `pass`/`null`,
/// `null`/`null`) fold into the same outcomes as their live-vote
/// counterparts, so both [`super::voting::record_vote`] and
/// [`super::sweeper::sweep`] call through here rather than duplicating the
/// table.
pub fn classify_votes(v1: Option<Vote>, v2: Option<Vote>) -> Outcome {
    match (v1, v2) {
        (Some(Vote::Yes), Some(Vote::Yes)) => Outcome::BothYes,
        (Some(Vote::Yes), Some(Vote::Pass)) | (Some(Vote::Pass), Some(Vote::Yes)) => Outcome::YesPass,
        (Some(Vote::Pass), Some(Vote::Pass)) => Outcome::PassPass,
        (Some(Vote::Yes), None) | (None, Some(Vote::Yes)) => Outcome::YesPass,
        (Some(Vote::Pass), None) | (None, Some(Vote::Pass)) => Outcome::PassPass,
        (None, None) => Outcome::IdleIdle,
    }
}

/// Post-resolution effects, run once per resolved match (the caller only
/// invokes this after `MatchStore::resolve` confirms it owns the
/// transition). Detaches both users, applies the fairness rules,
/// auto-respins the sides that call for it, and — for `both_yes` — hands
/// back a `VideoDateHandle` for the collaborator video-brokerage service
/// to pick up; this core does not manage the call itself.
///
/// `silent_to_idle` distinguishes the two ways a `yes_pass`/`pass_pass`
/// resolution can happen, even though both collapse to the same `Outcome`:
/// a live terminal `pass` recorded mid-window (`record_vote`) respins both
/// sides unconditionally — the partner simply hasn't voted yet, and both
/// users get auto-respun. A Sweeper-driven resolution (window expiry or a
/// stale/disconnected participant) instead sends any side with no
/// recorded vote straight to `idle` without respinning it, because that
/// side never acted at all.
pub async fn apply_outcome<C: Clock>(
    engine: &Engine<C>,
    record: &MatchRecord,
    outcome: Outcome,
    silent_to_idle: bool,
    now: DateTime<Utc>,
) -> Option<VideoDateHandle> {
    let u1 = record.user1_id;
    let u2 = record.user2_id;
    let v1 = record.user1_vote;
    let v2 = record.user2_vote;

    match outcome {
        Outcome::BothYes => {
            detach_idle(engine, u1, now);
            detach_idle(engine, u2, now);
            Some(VideoDateHandle {
                match_id: record.match_id,
                user1_id: u1,
                user2_id: u2,
                created_at: now,
            })
        }
        Outcome::IdleIdle => {
            detach_idle(engine, u1, now);
            detach_idle(engine, u2, now);
            None
        }
        Outcome::YesPass | Outcome::PassPass => {
            respin_side(engine, u1, v1, silent_to_idle, now).await;
            respin_side(engine, u2, v2, silent_to_idle, now).await;
            None
        }
    }
}

fn detach_idle<C: Clock>(engine: &Engine<C>, user_id: UserId, now: DateTime<Utc>) {
    let fairness = engine.users.get(user_id).map(|r| r.fairness).unwrap_or(0);
    engine.users.transition_idle(user_id, fairness, now);
}

/// Auto-respins one side of a resolved match, unless it never voted and
/// the caller is a Sweeper-driven resolution — then it goes to `idle`
/// instead (see `apply_outcome`'s `silent_to_idle` doc). A `yes` vote
/// earns the configured fairness boost (clamped to the cap); a `pass`
/// vote respins at preserved fairness. Re-invokes the Pair Formation
/// Engine immediately afterward, mirroring `spin`'s own respin trigger so
/// a respun user does not wait for the next external event.
async fn respin_side<C: Clock>(
    engine: &Engine<C>,
    user_id: UserId,
    vote: Option<Vote>,
    silent_to_idle: bool,
    now: DateTime<Utc>,
) {
    if vote.is_none() && silent_to_idle {
        detach_idle(engine, user_id, now);
        return;
    }
    let current = engine.users.get(user_id).map(|r| r.fairness).unwrap_or(0);
    let fairness = if matches!(vote, Some(Vote::Yes)) {
        (current + engine.config.fairness_boost).min(engine.config.fairness_max)
    } else {
        current
    };
    engine.users.transition_idle(user_id, fairness, now);
    engine.users.transition_waiting(user_id, now);
    super::pair_formation::try_form_pair(engine, user_id).await;
}
