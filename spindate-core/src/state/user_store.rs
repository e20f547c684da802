use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::{MatchId, UserFacts, UserId, UserRecord, UserState};

use super::TransitionResult;

/// Per-user state store, backed by an in-process `DashMap` rather than a
/// Postgres-backed table — an in-process sharded store is the
/// systems-language analogue of a database transaction here. `DashMap`'s
/// per-shard locking gives each user id its own effective lock, so
/// per-user state transitions serialize on an advisory lock keyed on
/// `user_id` without an explicit mutex.
pub struct UserStore {
    users: DashMap<UserId, UserRecord>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<UserRecord> {
        self.users.get(&user_id).map(|r| r.clone())
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.users.contains_key(&user_id)
    }

    /// Ingests the latest profile facts for a user, creating the record on
    /// first contact. The core consumes these facts from the collaborator
    /// profile service; it does not own or validate them.
    pub fn upsert_facts(&self, user_id: UserId, facts: UserFacts, now: DateTime<Utc>) {
        self.users
            .entry(user_id)
            .and_modify(|r| r.facts = facts.clone())
            .or_insert_with(|| UserRecord::new(user_id, facts, now));
    }

    /// Admits a user into the waiting queue. If the user already holds a
    /// live match, this is a no-op that only refreshes `last_active` —
    /// re-spinning must never destroy a match created milliseconds
    /// earlier.
    pub fn transition_waiting(&self, user_id: UserId, now: DateTime<Utc>) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r) => {
                if r.has_live_match() {
                    r.last_active = now;
                    TransitionResult::NoOp
                } else {
                    r.state = UserState::Waiting;
                    r.waiting_since = Some(now);
                    r.match_id = None;
                    r.partner_id = None;
                    r.acknowledged_at = None;
                    r.last_active = now;
                    TransitionResult::Committed
                }
            }
            None => TransitionResult::NotFound,
        }
    }

    /// Transitions a waiting user into a fresh match. Legal only from
    /// `waiting`; fairness is preserved (not touched here).
    pub fn transition_matched(
        &self,
        user_id: UserId,
        match_id: MatchId,
        partner_id: UserId,
        now: DateTime<Utc>,
    ) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r) if r.state == UserState::Waiting => {
                r.state = UserState::Matched;
                r.match_id = Some(match_id);
                r.partner_id = Some(partner_id);
                r.acknowledged_at = None;
                r.last_active = now;
                TransitionResult::Committed
            }
            Some(_) => TransitionResult::NoOp,
            None => TransitionResult::NotFound,
        }
    }

    /// Opens the vote window for a matched pair. Legal only from
    /// `matched`; invoked immediately after `transition_matched` in the
    /// same pair-formation critical section since this deployment opens
    /// the vote window at match creation (see DESIGN.md for the rationale).
    pub fn transition_vote_window(&self, user_id: UserId, now: DateTime<Utc>) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r) if r.state == UserState::Matched => {
                r.state = UserState::VoteWindow;
                r.last_active = now;
                TransitionResult::Committed
            }
            Some(_) => TransitionResult::NoOp,
            None => TransitionResult::NotFound,
        }
    }

    /// Detaches the user from any match and applies the fairness value
    /// decided by the outcome resolver (preserved or boosted). Legal from
    /// any state.
    pub fn transition_idle(&self, user_id: UserId, fairness: u32, now: DateTime<Utc>) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r) => {
                r.state = UserState::Idle;
                r.match_id = None;
                r.partner_id = None;
                r.acknowledged_at = None;
                r.fairness = fairness;
                r.last_active = now;
                TransitionResult::Committed
            }
            None => TransitionResult::NotFound,
        }
    }

    /// Only this operation may update `last_active` — incidental reads
    /// (status polls) must not.
    pub fn heartbeat(&self, user_id: UserId, now: DateTime<Utc>) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r) => {
                r.last_active = now;
                TransitionResult::Committed
            }
            None => TransitionResult::NotFound,
        }
    }

    pub fn acknowledge(&self, user_id: UserId, now: DateTime<Utc>) -> TransitionResult {
        match self.users.get_mut(&user_id) {
            Some(mut r)
                if matches!(r.state, UserState::Matched | UserState::VoteWindow) =>
            {
                if r.acknowledged_at.is_none() {
                    r.acknowledged_at = Some(now);
                }
                TransitionResult::Committed
            }
            Some(_) => TransitionResult::NoOp,
            None => TransitionResult::NotFound,
        }
    }

    /// Snapshot of every currently-`waiting` user, used by the periodic
    /// fairness refresh and by candidate selection.
    pub fn waiting_snapshot(&self) -> Vec<UserRecord> {
        self.users
            .iter()
            .filter(|r| r.state == UserState::Waiting)
            .map(|r| r.clone())
            .collect()
    }

    /// All users currently holding a live match (`matched`/`vote_window`),
    /// used by the Sweeper's staleness pass.
    pub fn live_matched_snapshot(&self) -> Vec<UserRecord> {
        self.users
            .iter()
            .filter(|r| r.has_live_match())
            .map(|r| r.clone())
            .collect()
    }

    /// Refreshes the fairness score in place for a single user, used by the
    /// periodic fairness scorer pass. No-op if the user is no longer
    /// waiting (race with a concurrent match).
    pub fn set_fairness_if_waiting(&self, user_id: UserId, fairness: u32) {
        if let Some(mut r) = self.users.get_mut(&user_id) {
            if r.state == UserState::Waiting {
                r.fairness = fairness;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, GenderPreference};

    fn facts() -> UserFacts {
        UserFacts {
            gender: Some(Gender::Male),
            gender_preference: GenderPreference::All,
            age: Some(28),
            age_min: None,
            age_max: None,
            cities: vec![],
        }
    }

    #[test]
    fn spin_twice_preserves_match() {
        let store = UserStore::new();
        let now = Utc::now();
        let user = UserId::new_v4();
        let partner = UserId::new_v4();
        let match_id = MatchId::new_v4();

        store.upsert_facts(user, facts(), now);
        assert_eq!(store.transition_waiting(user, now), TransitionResult::Committed);
        assert_eq!(
            store.transition_matched(user, match_id, partner, now),
            TransitionResult::Committed
        );

        // A retried spin must not destroy the fresh match.
        let result = store.transition_waiting(user, now + chrono::Duration::seconds(1));
        assert_eq!(result, TransitionResult::NoOp);
        let record = store.get(user).unwrap();
        assert_eq!(record.state, UserState::Matched);
        assert_eq!(record.match_id, Some(match_id));
    }

    #[test]
    fn transition_matched_requires_waiting() {
        let store = UserStore::new();
        let now = Utc::now();
        let user = UserId::new_v4();
        store.upsert_facts(user, facts(), now);

        // Still idle: TransitionMatched must not commit.
        let result = store.transition_matched(user, MatchId::new_v4(), UserId::new_v4(), now);
        assert_eq!(result, TransitionResult::NoOp);
    }

    #[test]
    fn heartbeat_never_created_implicitly_by_reads() {
        let store = UserStore::new();
        let user = UserId::new_v4();
        assert_eq!(store.get(user), None);
        assert_eq!(store.heartbeat(user, Utc::now()), TransitionResult::NotFound);
    }
}
