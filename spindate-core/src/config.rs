use serde::Deserialize;

/// Runtime configuration for the matchmaking core.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// `Hfresh` — heartbeat freshness window, in seconds (default 10s).
    #[serde(default = "default_heartbeat_fresh_secs")]
    pub heartbeat_fresh_secs: i64,

    /// Fallback freshness window for brand-new entrants with no heartbeat
    /// yet: `waiting_since` within this many seconds also counts as fresh.
    #[serde(default = "default_new_entrant_fresh_secs")]
    pub new_entrant_fresh_secs: i64,

    /// `W` — vote window duration in seconds (60-90s is the acceptable
    /// range; single value chosen by deployment, see DESIGN.md).
    #[serde(default = "default_vote_window_secs")]
    pub vote_window_secs: i64,

    /// `Fmax` — fairness cap (default 20).
    #[serde(default = "default_fairness_max")]
    pub fairness_max: u32,

    /// `Fboost` — fairness boost applied on a unilateral `yes` (default 10).
    #[serde(default = "default_fairness_boost")]
    pub fairness_boost: u32,

    /// `Sweep_interval` — Sweeper cadence in seconds (default 2s).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// `Engine_deadline` — per-call deadline for engine operations, seconds
    /// (default 10s).
    #[serde(default = "default_engine_deadline_secs")]
    pub engine_deadline_secs: u64,
}

fn default_port() -> u16 {
    3003
}
fn default_heartbeat_fresh_secs() -> i64 {
    10
}
fn default_new_entrant_fresh_secs() -> i64 {
    60
}
fn default_vote_window_secs() -> i64 {
    60
}
fn default_fairness_max() -> u32 {
    20
}
fn default_fairness_boost() -> u32 {
    10
}
fn default_sweep_interval_secs() -> u64 {
    2
}
fn default_engine_deadline_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            heartbeat_fresh_secs: default_heartbeat_fresh_secs(),
            new_entrant_fresh_secs: default_new_entrant_fresh_secs(),
            vote_window_secs: default_vote_window_secs(),
            fairness_max: default_fairness_max(),
            fairness_boost: default_fairness_boost(),
            sweep_interval_secs: default_sweep_interval_secs(),
            engine_deadline_secs: default_engine_deadline_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SPINDATE").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_else(|_| Self::default()))
    }
}
