use chrono::{DateTime, Utc};
use serde::Serialize;
use spindate_shared::{AppError, ErrorCode};

use crate::clock::Clock;
use crate::models::{MatchId, Outcome, UserId, Vote};
use crate::state::match_store::VoteRecordOutcome;

use super::outcome::{apply_outcome, classify_votes};
use super::Engine;

/// Result of an `Acknowledge(user_id, match_id)` call.
#[derive(Debug, Clone, Serialize)]
pub struct AcknowledgeResult {
    pub window_open: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub waiting_for_partner: bool,
}

/// This deployment opens the vote window at match creation, so acknowledge
/// never itself opens anything — it is informational, recording
/// `acknowledged_at` and reporting the window the engine already opened.
/// Legal from `matched` or `vote_window` since the engine advances a user
/// straight to `vote_window` inside the same critical section that creates
/// the match (see `UserStore::transition_vote_window`).
pub fn acknowledge<C: Clock>(
    engine: &Engine<C>,
    user_id: UserId,
    match_id: MatchId,
) -> Result<AcknowledgeResult, AppError> {
    let now = engine.now();

    let user = engine
        .users
        .get(user_id)
        .ok_or_else(|| AppError::new(ErrorCode::NotFound, "unknown user"))?;

    if user.match_id != Some(match_id) {
        return Err(AppError::new(ErrorCode::NotInMatch, "caller is not in that match"));
    }

    if !engine.users.acknowledge(user_id, now).committed() {
        return Err(AppError::new(
            ErrorCode::InvalidTransition,
            "acknowledge is only legal from matched or vote_window",
        ));
    }

    let record = engine
        .matches
        .get(match_id)
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match no longer exists"))?;

    let waiting_for_partner = record.partner_of(user_id).is_some_and(|partner| {
        engine
            .users
            .get(partner)
            .map(|p| p.acknowledged_at.is_none())
            .unwrap_or(false)
    });

    Ok(AcknowledgeResult {
        window_open: record.vote_window_started_at.is_some(),
        expires_at: record.vote_window_expires_at,
        waiting_for_partner,
    })
}

/// Result of a `RecordVote(user_id, match_id, vote)` call.
#[derive(Debug, Clone, Serialize)]
pub struct RecordVoteResult {
    pub resolved: bool,
    pub outcome: Option<Outcome>,
    pub waiting_for_partner: Option<bool>,
}

/// Overwrite-until-resolved: a repeated vote before resolution replaces
/// the caller's prior one. A
/// `pass` vote is terminal and resolves immediately even if the partner
/// has not voted; a `yes` vote resolves only once both sides have
/// recorded. Resolution and its outcome side-effects are applied by
/// exactly one caller, distinguished via `ResolveOutcome::was_resolved_by_us`.
pub async fn record_vote<C: Clock>(
    engine: &Engine<C>,
    user_id: UserId,
    match_id: MatchId,
    vote: Vote,
) -> Result<RecordVoteResult, AppError> {
    let now = engine.now();

    match engine.matches.try_record_vote(match_id, user_id, vote, now) {
        VoteRecordOutcome::NotFound => {
            Err(AppError::new(ErrorCode::MatchNotFound, "match does not exist"))
        }
        VoteRecordOutcome::NotParticipant => {
            Err(AppError::new(ErrorCode::NotInMatch, "caller is not a participant in that match"))
        }
        VoteRecordOutcome::WindowExpired => {
            Err(AppError::new(ErrorCode::WindowExpired, "vote window has expired"))
        }
        VoteRecordOutcome::AlreadyResolved(outcome) => Ok(RecordVoteResult {
            resolved: true,
            outcome,
            waiting_for_partner: None,
        }),
        VoteRecordOutcome::Recorded {
            should_resolve,
            user1_vote,
            user2_vote,
        } => {
            if !should_resolve {
                return Ok(RecordVoteResult {
                    resolved: false,
                    outcome: None,
                    waiting_for_partner: Some(true),
                });
            }

            let outcome = classify_votes(user1_vote, user2_vote);
            let resolve = engine
                .matches
                .resolve(match_id, outcome, false, now)
                .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match vanished during resolution"))?;

            if resolve.was_resolved_by_us() {
                if let Some(record) = engine.matches.get(match_id) {
                    if let Some(handle) = apply_outcome(engine, &record, resolve.outcome(), false, now).await {
                        // Video call brokerage is the collaborator's job: this
                        // core only hands off the match id and participants, the
                        // way a publish-and-forget event would carry it onward.
                        tracing::info!(
                            match_id = %handle.match_id,
                            user1_id = %handle.user1_id,
                            user2_id = %handle.user2_id,
                            "both_yes resolved, emitting video-date handle"
                        );
                    }
                }
            }

            Ok(RecordVoteResult {
                resolved: true,
                outcome: Some(resolve.outcome()),
                waiting_for_partner: None,
            })
        }
    }
}
