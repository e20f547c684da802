use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type MatchId = Uuid;

/// The lifecycle state a user occupies in the matching pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Idle,
    Waiting,
    Matched,
    VoteWindow,
    VideoDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Gender preference: `all` or a specific gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPreference {
    All,
    Male,
    Female,
}

impl GenderPreference {
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            Self::All => true,
            Self::Male => gender == Gender::Male,
            Self::Female => gender == Gender::Female,
        }
    }
}

/// The profile facts the core consumes from the collaborator profile
/// service: it consumes these facts and emits state transitions, it does
/// not own profile CRUD. Preference ranges and the city set are optional;
/// an absent bound means unrestricted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFacts {
    pub gender: Option<Gender>,
    pub gender_preference: GenderPreference,
    pub age: Option<i32>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    /// Empty/absent means unrestricted.
    pub cities: Vec<String>,
}

impl UserFacts {
    pub fn age_in_range(&self, other_age: Option<i32>) -> bool {
        match (self.age_min, self.age_max, other_age) {
            (None, None, _) => true,
            (min, max, Some(age)) => {
                min.map(|m| age >= m).unwrap_or(true) && max.map(|m| age <= m).unwrap_or(true)
            }
            // A bound is set but the candidate's age is unknown: treat as
            // unrestricted rather than silently excluding everyone.
            (_, _, None) => true,
        }
    }
}

/// User state record, one per user.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user_id: UserId,
    pub facts: UserFacts,
    pub state: UserState,
    pub match_id: Option<MatchId>,
    pub partner_id: Option<UserId>,
    pub fairness: u32,
    pub waiting_since: Option<DateTime<Utc>>,
    pub last_active: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn new(user_id: UserId, facts: UserFacts, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            facts,
            state: UserState::Idle,
            match_id: None,
            partner_id: None,
            fairness: 0,
            waiting_since: None,
            last_active: now,
            acknowledged_at: None,
        }
    }

    /// Has a live match attached — neither side of a live match is in a
    /// waiting or idle state.
    pub fn has_live_match(&self) -> bool {
        matches!(
            self.state,
            UserState::Matched | UserState::VoteWindow | UserState::VideoDate
        )
    }
}

/// Match lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Paired,
    Active,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Yes,
    Pass,
}

/// Terminal outcome classification for a resolved match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    BothYes,
    YesPass,
    PassPass,
    IdleIdle,
}

/// Match record, keyed by match id. `user1_id`/`user2_id` are kept in
/// stable `min_id, max_id` order so the unordered pair has one canonical
/// representation (mirrors the History Ledger's normalization).
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub status: MatchStatus,
    pub vote_window_started_at: Option<DateTime<Utc>>,
    pub vote_window_expires_at: Option<DateTime<Utc>>,
    pub user1_vote: Option<Vote>,
    pub user2_vote: Option<Vote>,
    pub outcome: Option<Outcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl MatchRecord {
    pub fn new(match_id: MatchId, a: UserId, b: UserId, now: DateTime<Utc>) -> Self {
        let (user1_id, user2_id) = if a < b { (a, b) } else { (b, a) };
        Self {
            match_id,
            user1_id,
            user2_id,
            status: MatchStatus::Paired,
            vote_window_started_at: None,
            vote_window_expires_at: None,
            user1_vote: None,
            user2_vote: None,
            outcome: None,
            created_at: now,
            updated_at: now,
            ended_at: None,
        }
    }

    pub fn partner_of(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.user1_id {
            Some(self.user2_id)
        } else if user_id == self.user2_id {
            Some(self.user1_id)
        } else {
            None
        }
    }

    pub fn vote_of(&self, user_id: UserId) -> Option<Vote> {
        if user_id == self.user1_id {
            self.user1_vote
        } else if user_id == self.user2_id {
            self.user2_vote
        } else {
            None
        }
    }

    pub fn set_vote(&mut self, user_id: UserId, vote: Vote) -> bool {
        if user_id == self.user1_id {
            self.user1_vote = Some(vote);
            true
        } else if user_id == self.user2_id {
            self.user2_vote = Some(vote);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        user_id == self.user1_id || user_id == self.user2_id
    }
}

/// Opaque handoff record for the collaborator video-brokerage service —
/// video call session brokerage is out of scope here; this core emits the
/// handle, it does not manage the call.
#[derive(Debug, Clone, Serialize)]
pub struct VideoDateHandle {
    pub match_id: MatchId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub created_at: DateTime<Utc>,
}
