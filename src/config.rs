/// Service configuration, read from the environment with defaults.
/// Auction policy parameters (increment tiers, anti-snipe window, cooldown)
/// are deliberately configuration rather than constants in the engine.
// region:    --- Imports
use crate::policy::IncrementPolicy;
use chrono::Duration;
// endregion: --- Imports

// region:    --- Config

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Bids landing within this window before end_time extend the auction.
    pub snipe_window: Duration,
    /// How far end_time is pushed out by a late bid.
    pub snipe_extension: Duration,
    /// Minimum spacing between accepted bids per (bidder, listing).
    pub bid_cooldown: Duration,
    /// Bound on waiting for a listing's critical section.
    pub lock_timeout: std::time::Duration,
    /// Max listings finalized per scheduler tick.
    pub finalize_batch_limit: i64,
    pub scheduler_interval: std::time::Duration,
    pub increment_policy: IncrementPolicy,
    /// Optional collaborator endpoints; disabled when unset.
    pub notify_webhook_url: Option<String>,
    pub cache_purge_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let increment_policy = match std::env::var("INCREMENT_TIERS") {
            Ok(spec) => IncrementPolicy::parse(&spec)?,
            Err(_) => IncrementPolicy::default(),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| "DATABASE_URL must be set".to_string())?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000"),
            snipe_window: Duration::seconds(env_parsed("SNIPE_WINDOW_SECS", 300)?),
            snipe_extension: Duration::seconds(env_parsed("SNIPE_EXTENSION_SECS", 300)?),
            bid_cooldown: Duration::milliseconds(env_parsed("BID_COOLDOWN_MS", 2_000)?),
            lock_timeout: std::time::Duration::from_millis(
                env_parsed("LOCK_TIMEOUT_MS", 3_000)? as u64
            ),
            finalize_batch_limit: env_parsed("FINALIZE_BATCH_LIMIT", 100)?,
            scheduler_interval: std::time::Duration::from_secs(
                env_parsed("SCHEDULER_INTERVAL_SECS", 1)? as u64,
            ),
            increment_policy,
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            cache_purge_url: std::env::var("CACHE_PURGE_URL").ok(),
        })
    }

    /// Defaults without touching the environment; used by tests.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            snipe_window: Duration::minutes(5),
            snipe_extension: Duration::minutes(5),
            bid_cooldown: Duration::seconds(2),
            lock_timeout: std::time::Duration::from_secs(3),
            finalize_batch_limit: 100,
            scheduler_interval: std::time::Duration::from_secs(1),
            increment_policy: IncrementPolicy::default(),
            notify_webhook_url: None,
            cache_purge_url: None,
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parsed(name: &str, default: i64) -> Result<i64, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{name} must be an integer, got: {raw}")),
        Err(_) => Ok(default),
    }
}

// endregion: --- Config
