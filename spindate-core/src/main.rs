use std::sync::Arc;
use std::time::Duration as StdDuration;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use spindate_core::clock::SystemClock;
use spindate_core::{AppConfig, Engine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spindate_shared::middleware::init_tracing("spindate-core");

    let config = AppConfig::load()?;
    let port = config.port;
    let sweep_interval = StdDuration::from_secs(config.sweep_interval_secs);

    let engine = Arc::new(Engine::<SystemClock>::new(config));

    // The Sweeper runs on a fixed cadence, independent of and in addition
    // to the event-driven engine invocations triggered by the routes
    // below: push covers latency, the periodic pull covers safety.
    let sweeper_engine = engine.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            let report = sweeper_engine.sweep().await;
            tracing::debug!(
                expired = report.expired_resolved,
                stale = report.stale_cancelled,
                fairness_refreshed = report.fairness_refreshed,
                video_dates = report.video_dates.len(),
                "sweep cycle complete"
            );
            for handle in &report.video_dates {
                tracing::info!(
                    match_id = %handle.match_id,
                    user1_id = %handle.user1_id,
                    user2_id = %handle.user2_id,
                    "both_yes resolved during sweep, emitting video-date handle"
                );
            }
        }
    });

    let app = spindate_core::routes::router(engine)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "spindate-core starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
