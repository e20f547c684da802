pub mod health;
pub mod matchmaking;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::clock::SystemClock;
use crate::engine::Engine;

/// The engine's procedural contracts, exposed over HTTP for a transport
/// layer to poll or relay. The transport layer (auth, profile CRUD,
/// push/realtime delivery) is an out-of-scope collaborator — these
/// handlers take `user_id` directly rather than deriving it from a
/// session.
pub fn router(engine: Arc<Engine<SystemClock>>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/spin", post(matchmaking::spin))
        .route("/heartbeat", post(matchmaking::heartbeat))
        .route(
            "/matches/:match_id/acknowledge",
            post(matchmaking::acknowledge),
        )
        .route("/matches/:match_id/vote", post(matchmaking::vote))
        .route("/users/:user_id/status", get(matchmaking::status))
        .with_state(engine)
}
