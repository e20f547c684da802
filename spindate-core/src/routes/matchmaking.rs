use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use spindate_shared::types::api::ApiResponse;
use spindate_shared::AppResult;

use crate::clock::SystemClock;
use crate::engine::{Engine, PairFormationResult, StatusView};
use crate::models::{UserFacts, Vote};

#[derive(Debug, Deserialize)]
pub struct SpinPayload {
    pub user_id: Uuid,
    pub facts: UserFacts,
}

/// Admits a user into the matching queue and immediately attempts a pair.
/// The candidate-set result is observability only — the caller always gets
/// a success response and polls `status` for the authoritative state.
pub async fn spin(
    State(engine): State<Arc<Engine<SystemClock>>>,
    Json(payload): Json<SpinPayload>,
) -> Json<ApiResponse<SpinResult>> {
    let result = engine.spin(payload.user_id, payload.facts).await;
    Json(ApiResponse::ok(SpinResult::from(result)))
}

#[derive(Debug, serde::Serialize)]
pub struct SpinResult {
    pub matched: bool,
}

impl From<PairFormationResult> for SpinResult {
    fn from(result: PairFormationResult) -> Self {
        Self {
            matched: matches!(result, PairFormationResult::Matched(_)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatPayload {
    pub user_id: Uuid,
}

/// Refreshes a user's liveness timestamp.
pub async fn heartbeat(
    State(engine): State<Arc<Engine<SystemClock>>>,
    Json(payload): Json<HeartbeatPayload>,
) -> Json<ApiResponse<()>> {
    engine.heartbeat(payload.user_id);
    Json(ApiResponse::ok(()))
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgePayload {
    pub user_id: Uuid,
}

/// Confirms a user has seen their match and is ready to vote.
pub async fn acknowledge(
    State(engine): State<Arc<Engine<SystemClock>>>,
    Path(match_id): Path<Uuid>,
    Json(payload): Json<AcknowledgePayload>,
) -> AppResult<Json<ApiResponse<crate::engine::AcknowledgeResult>>> {
    let result = engine.acknowledge(payload.user_id, match_id)?;
    Ok(Json(ApiResponse::ok(result)))
}

#[derive(Debug, Deserialize)]
pub struct VotePayload {
    pub user_id: Uuid,
    pub vote: Vote,
}

/// Records a user's yes/pass vote for their current match.
pub async fn vote(
    State(engine): State<Arc<Engine<SystemClock>>>,
    Path(match_id): Path<Uuid>,
    Json(payload): Json<VotePayload>,
) -> AppResult<Json<ApiResponse<crate::engine::RecordVoteResult>>> {
    let result = engine.record_vote(payload.user_id, match_id, payload.vote).await?;
    Ok(Json(ApiResponse::ok(result)))
}

/// Read-only status poll; does not touch `last_active`.
pub async fn status(
    State(engine): State<Arc<Engine<SystemClock>>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StatusView>>> {
    let view = engine.get_status(user_id)?;
    Ok(Json(ApiResponse::ok(view)))
}
