//! Constants for the market-data ingestion core.
//!
//! These values are the enumerated configuration defaults from the design:
//! batcher sizing, reconnect timing, and the fixed-point price scale. They
//! are exported for advanced callers who want to override defaults without
//! threading every constant through [`crate::config::Config`].

/// Fixed-point scale for all stored prices (four decimal places).
pub const PRICE_SCALE: i64 = 10_000;

/// Secret-store name prefix; the full name is `{SECRET_NAME_PREFIX}_<user_id>`.
pub const SECRET_NAME_PREFIX: &str = "mdata_tokens";

/// Token refresh leeway: refresh when within this many seconds of expiry.
pub const TOKEN_REFRESH_LEEWAY_SECS: i64 = 300;

/// Default book for Level-2 subscriptions when unspecified.
pub const DEFAULT_L2_BOOK: &str = "NASDAQ";

/// Default subscription-differ polling interval, in seconds.
pub const DEFAULT_DIFFER_POLL_INTERVAL_SECS: u64 = 5;

/// Watchdog logging interval, in seconds.
pub const WATCHDOG_INTERVAL_SECS: u64 = 60;

/// Watchdog staleness threshold, in seconds, during the trading window.
pub const WATCHDOG_STALE_THRESHOLD_SECS: i64 = 300;

/// REST rate limit: request budget.
pub const REST_RATE_LIMIT_REQUESTS: usize = 120;

/// REST rate limit: budget window, in seconds.
pub const REST_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default upstream streamer WebSocket URL.
pub const DEFAULT_STREAM_WS_URL: &str = "wss://streamer-api.schwab.com/ws";

/// Beque instances, as enumerated by the design.
pub mod beque {
    use std::time::Duration;

    /// L1 batcher: size threshold.
    pub const L1_MAX_BATCH_SIZE: usize = 100;
    /// L1 batcher: max delay between flushes.
    pub const L1_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

    /// L2 batcher: size threshold.
    pub const L2_MAX_BATCH_SIZE: usize = 100;
    /// L2 batcher: max delay between flushes.
    pub const L2_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

    /// Chart batcher: size threshold.
    pub const CHART_MAX_BATCH_SIZE: usize = 50;
    /// Chart batcher: max delay between flushes.
    pub const CHART_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

    /// Default queue capacity multiplier over `max_batch_size`.
    pub const DEFAULT_QUEUE_CAPACITY_MULTIPLIER: usize = 10;
}

/// Reconnect policy constants.
pub mod reconnect {
    /// Base backoff, in seconds, for `min(base * 2^n, cap)`.
    pub const BACKOFF_BASE_SECS: f64 = 0.1;
    /// Backoff cap, in seconds, on weekdays.
    pub const BACKOFF_CAP_SECS: f64 = 30.0;
    /// Fatal threshold for consecutive non-close errors.
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
    /// Fatal threshold for consecutive close events on a weekday.
    pub const MAX_CONSECUTIVE_CLOSES_WEEKDAY: u32 = 5;
    /// Weekend backoff multiplier, in seconds, for `min(cap, mult * n)`.
    pub const WEEKEND_BACKOFF_MULT_SECS: f64 = 5.0;
    /// Weekend backoff cap, in seconds.
    pub const WEEKEND_BACKOFF_CAP_SECS: f64 = 30.0;
}

/// Security-id resolver cache sizing.
pub mod cache {
    /// Bounded LRU capacity for the symbol→id resolver cache.
    pub const SECURITY_ID_CACHE_CAPACITY: usize = 4096;
}
