mod lock_table;
mod outcome;
mod pair_formation;
mod sweeper;
mod voting;

pub use lock_table::LockTable;
pub use outcome::{classify_votes, VideoDateHandle};
pub use pair_formation::PairFormationResult;
pub use sweeper::SweepReport;
pub use voting::{AcknowledgeResult, RecordVoteResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use spindate_shared::{AppError, ErrorCode};

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::models::{MatchId, MatchRecord, MatchStatus, Outcome, UserFacts, UserId, UserState, Vote};
use crate::state::{HistoryLedger, MatchStore, UserStore};

/// Facade bundling the matchmaking core's stores, clock, and configuration
/// behind its procedural contracts — the same shape a service's top-level
/// `AppState` bundles config and infra clients behind one struct, but
/// trimmed to the in-process stores this core actually owns: no DB pool,
/// no RabbitMQ/Redis clients, since the transport/persistence
/// collaborators are out of scope here.
pub struct Engine<C: Clock = SystemClock> {
    pub users: UserStore,
    pub matches: MatchStore,
    pub history: HistoryLedger,
    pub config: AppConfig,
    locks: LockTable,
    clock: C,
}

impl Engine<SystemClock> {
    pub fn new(config: AppConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(config: AppConfig, clock: C) -> Self {
        Self {
            users: UserStore::new(),
            matches: MatchStore::new(),
            history: HistoryLedger::new(),
            config,
            locks: LockTable::new(),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn heartbeat_fresh(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.heartbeat_fresh_secs)
    }

    fn new_entrant_fresh(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.new_entrant_fresh_secs)
    }

    /// `Engine_deadline` — the per-call deadline §5 places on pair
    /// formation and vote resolution. The in-process stores never block on
    /// network I/O the way the reference's database-backed transactions
    /// do, so this fires only if a pathological number of lock-holders
    /// starve the task scheduler; it exists so the deadline named in §6's
    /// configuration table is an enforced contract, not a documented-only
    /// field.
    fn engine_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.engine_deadline_secs)
    }

    /// Admits a user into the queue and immediately attempts a pairing.
    /// The transport layer supplies the caller's current profile facts on
    /// every spin (the core does not itself own profile CRUD) so they are
    /// refreshed here before queue admission runs. A deadline that elapses
    /// mid-pairing degrades to `Busy`: the same "let the next trigger
    /// retry" contract an ordinary lock collision already produces.
    pub async fn spin(&self, user_id: UserId, facts: UserFacts) -> PairFormationResult {
        let now = self.now();
        self.users.upsert_facts(user_id, facts, now);
        self.users.transition_waiting(user_id, now);
        match tokio::time::timeout(self.engine_deadline(), pair_formation::try_form_pair(self, user_id)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%user_id, "pair formation exceeded engine deadline, treating as busy");
                PairFormationResult::Busy
            }
        }
    }

    /// Refreshes a user's liveness timestamp.
    pub fn heartbeat(&self, user_id: UserId) {
        let now = self.now();
        self.users.heartbeat(user_id, now);
    }

    /// Confirms a user has seen their match and is ready to vote.
    pub fn acknowledge(&self, user_id: UserId, match_id: MatchId) -> Result<AcknowledgeResult, AppError> {
        voting::acknowledge(self, user_id, match_id)
    }

    /// Records a user's yes/pass vote for their current match. A deadline
    /// that elapses mid-resolution surfaces as `Conflict` per §7: the
    /// caller's state may have moved on and a retry on the next trigger is
    /// the correct recovery, exactly as for a losing `Conflict` race.
    pub async fn record_vote(
        &self,
        user_id: UserId,
        match_id: MatchId,
        vote: Vote,
    ) -> Result<RecordVoteResult, AppError> {
        match tokio::time::timeout(self.engine_deadline(), voting::record_vote(self, user_id, match_id, vote)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%user_id, %match_id, "vote resolution exceeded engine deadline");
                Err(AppError::new(
                    ErrorCode::Conflict,
                    "vote resolution exceeded the engine deadline, retry",
                ))
            }
        }
    }

    /// Read-only status poll; must not touch `last_active`.
    pub fn get_status(&self, user_id: UserId) -> Result<StatusView, AppError> {
        let record = self
            .users
            .get(user_id)
            .ok_or_else(|| AppError::new(ErrorCode::NotFound, "unknown user"))?;

        let match_view = match record.match_id {
            Some(match_id) => self.matches.get(match_id).map(|m| MatchView::from_record(&m, user_id)),
            None => None,
        };

        Ok(StatusView {
            state: record.state,
            fairness: record.fairness,
            match_view,
        })
    }

    /// Runs one reconciliation pass, invoked by an external scheduler on a
    /// fixed cadence. §5 names a 30s deadline for this "match-wide
    /// scheduling" pass, three times the single-call deadline; a sweep that
    /// overruns it is logged and returns whatever it completed rather than
    /// being cancelled mid-cycle, since an in-flight resolution is never
    /// left half-applied (every write inside it is already terminal).
    pub async fn sweep(&self) -> SweepReport {
        let deadline = self.engine_deadline() * 3;
        match tokio::time::timeout(deadline, sweeper::sweep(self)).await {
            Ok(report) => report,
            Err(_) => {
                tracing::warn!("sweep cycle exceeded the match-wide scheduling deadline");
                SweepReport::default()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: UserState,
    pub fairness: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_view: Option<MatchView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub partner_id: Option<UserId>,
    pub status: MatchStatus,
    pub outcome: Option<Outcome>,
    pub user_vote: Option<Vote>,
    pub partner_vote: Option<Vote>,
    pub vote_window_started_at: Option<DateTime<Utc>>,
    pub vote_window_expires_at: Option<DateTime<Utc>>,
}

impl MatchView {
    fn from_record(m: &MatchRecord, user_id: UserId) -> Self {
        Self {
            match_id: m.match_id,
            partner_id: m.partner_of(user_id),
            status: m.status,
            outcome: m.outcome,
            user_vote: m.vote_of(user_id),
            partner_vote: m.partner_of(user_id).and_then(|p| m.vote_of(p)),
            vote_window_started_at: m.vote_window_started_at,
            vote_window_expires_at: m.vote_window_expires_at,
        }
    }
}
