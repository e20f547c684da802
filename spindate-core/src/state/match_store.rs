use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::models::{MatchId, MatchRecord, MatchStatus, Outcome, UserId, Vote};

/// Per-match state store. Same `DashMap` shape as [`super::user_store::UserStore`],
/// applied to match records instead of a Postgres-backed table: no DB
/// round-trip is needed for this hot path, and historical conversations
/// are not persisted here.
///
/// `DashMap`'s per-shard lock serves as the advisory lock keyed on
/// `match_id`: every mutation below goes through [`Self::with_match_mut`],
/// which holds that shard's guard for the whole critical section so
/// concurrent acknowledgments/votes/resolutions on the same match serialize.
pub struct MatchStore {
    matches: DashMap<MatchId, MatchRecord>,
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStore {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, match_id: MatchId) -> Option<MatchRecord> {
        self.matches.get(&match_id).map(|r| r.clone())
    }

    /// Runs `f` under the per-match advisory lock, returning `None` if the
    /// match does not exist. This is the single choke point every voting
    /// and resolution operation uses so "check then mutate" is atomic.
    pub fn with_match_mut<R>(&self, match_id: MatchId, f: impl FnOnce(&mut MatchRecord) -> R) -> Option<R> {
        self.matches.get_mut(&match_id).map(|mut r| f(&mut r))
    }

    /// Combines match creation and vote-window opening into one atomic
    /// unit: inserts the match already `active` with its vote window
    /// bounds set, since this deployment opens the window at creation
    /// rather than at mutual acknowledge (see DESIGN.md for the rationale).
    pub fn create_active(
        &self,
        match_id: MatchId,
        user_a: UserId,
        user_b: UserId,
        window: Duration,
        now: DateTime<Utc>,
    ) -> MatchRecord {
        let mut record = MatchRecord::new(match_id, user_a, user_b, now);
        record.status = MatchStatus::Active;
        record.vote_window_started_at = Some(now);
        record.vote_window_expires_at = Some(now + window);
        self.matches.insert(match_id, record.clone());
        record
    }

    /// Vote-recording primitive: legal iff `status=active` and
    /// `now < vote_window_expires_at`. Overwrite-until-resolved semantics —
    /// a vote can be changed until the match resolves. A `pass` vote is
    /// terminal and makes `should_resolve=true` regardless of the partner's
    /// vote; a `yes` vote only does once both sides have recorded — the
    /// caller classifies and applies the outcome.
    pub fn try_record_vote(
        &self,
        match_id: MatchId,
        user_id: UserId,
        vote: Vote,
        now: DateTime<Utc>,
    ) -> VoteRecordOutcome {
        let Some(result) = self.with_match_mut(match_id, |m| {
            if m.outcome.is_some() {
                return VoteRecordOutcome::AlreadyResolved(m.outcome);
            }
            if m.status != MatchStatus::Active {
                return VoteRecordOutcome::AlreadyResolved(m.outcome);
            }
            match m.vote_window_expires_at {
                Some(expires) if now >= expires => return VoteRecordOutcome::WindowExpired,
                _ => {}
            }
            if !m.contains(user_id) {
                return VoteRecordOutcome::NotParticipant;
            }
            m.set_vote(user_id, vote);
            m.updated_at = now;
            let should_resolve =
                matches!(vote, Vote::Pass) || (m.user1_vote.is_some() && m.user2_vote.is_some());
            VoteRecordOutcome::Recorded {
                should_resolve,
                user1_vote: m.user1_vote,
                user2_vote: m.user2_vote,
            }
        }) else {
            return VoteRecordOutcome::NotFound;
        };
        result
    }

    /// Terminal resolution: sets `outcome`, flips `status` to `ended` (or
    /// `cancelled` for a disconnect/sweeper-forced resolution), and stamps
    /// `ended_at`. Idempotent — a match already resolved is left untouched;
    /// the return value distinguishes "this call resolved it" from "someone
    /// else already did" so the caller applies outcome side-effects
    /// (fairness, auto-respin, history) exactly once — once set, `outcome`
    /// is terminal and no subsequent write changes it.
    pub fn resolve(
        &self,
        match_id: MatchId,
        outcome: Outcome,
        cancelled: bool,
        now: DateTime<Utc>,
    ) -> Option<ResolveOutcome> {
        self.with_match_mut(match_id, |m| {
            if let Some(existing) = m.outcome {
                return ResolveOutcome::AlreadyResolved(existing);
            }
            m.outcome = Some(outcome);
            m.status = if cancelled {
                MatchStatus::Cancelled
            } else {
                MatchStatus::Ended
            };
            m.ended_at = Some(now);
            m.updated_at = now;
            ResolveOutcome::Resolved(outcome)
        })
    }

    /// Matches whose vote window has expired but are still unresolved —
    /// the first pass of a sweep cycle.
    pub fn expired_active(&self, now: DateTime<Utc>) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .filter(|m| {
                m.status == MatchStatus::Active
                    && m.outcome.is_none()
                    && m.vote_window_expires_at.map(|exp| now >= exp).unwrap_or(false)
            })
            .map(|m| m.clone())
            .collect()
    }

    /// Matches still `active` and unresolved, for the stale-participant
    /// scan — the second pass of a sweep cycle (the caller
    /// cross-references participants' `last_active` against the user
    /// store).
    pub fn active_unresolved(&self) -> Vec<MatchRecord> {
        self.matches
            .iter()
            .filter(|m| m.status == MatchStatus::Active && m.outcome.is_none())
            .map(|m| m.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum VoteRecordOutcome {
    Recorded {
        should_resolve: bool,
        user1_vote: Option<Vote>,
        user2_vote: Option<Vote>,
    },
    AlreadyResolved(Option<Outcome>),
    WindowExpired,
    NotParticipant,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(Outcome),
    AlreadyResolved(Outcome),
}

impl ResolveOutcome {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Resolved(o) | Self::AlreadyResolved(o) => *o,
        }
    }

    pub fn was_resolved_by_us(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_after_expiry_is_rejected() {
        let store = MatchStore::new();
        let now = Utc::now();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let match_id = MatchId::new_v4();
        store.create_active(match_id, a, b, Duration::seconds(60), now);

        let at_expiry = now + Duration::seconds(60);
        let result = store.try_record_vote(match_id, a, Vote::Yes, at_expiry);
        assert!(matches!(result, VoteRecordOutcome::WindowExpired));

        let before_expiry = now + Duration::seconds(59);
        let result = store.try_record_vote(match_id, a, Vote::Yes, before_expiry);
        assert!(matches!(
            result,
            VoteRecordOutcome::Recorded {
                should_resolve: false,
                ..
            }
        ));
    }

    #[test]
    fn pass_vote_is_resolve_ready_even_alone() {
        let store = MatchStore::new();
        let now = Utc::now();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let match_id = MatchId::new_v4();
        store.create_active(match_id, a, b, Duration::seconds(60), now);

        let result = store.try_record_vote(match_id, a, Vote::Pass, now);
        assert!(matches!(
            result,
            VoteRecordOutcome::Recorded {
                should_resolve: true,
                ..
            }
        ));
    }

    #[test]
    fn resolve_is_terminal() {
        let store = MatchStore::new();
        let now = Utc::now();
        let a = UserId::new_v4();
        let b = UserId::new_v4();
        let match_id = MatchId::new_v4();
        store.create_active(match_id, a, b, Duration::seconds(60), now);

        let first = store.resolve(match_id, Outcome::BothYes, false, now).unwrap();
        assert_eq!(first, ResolveOutcome::Resolved(Outcome::BothYes));

        let second = store.resolve(match_id, Outcome::PassPass, false, now).unwrap();
        assert_eq!(second, ResolveOutcome::AlreadyResolved(Outcome::BothYes));
    }
}
