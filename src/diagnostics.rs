//! A point-in-time diagnostic snapshot of the running ingestion core.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `get_message_stats`, which
//! reports per-stream message counts, the last-message timestamp, and
//! connection health for an operator-facing status endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::beque::BequeStatsSnapshot;
use crate::supervisor::{ConnectionState, Watchdog};

/// Batcher counters for one stream kind, reported alongside the connection
/// state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StreamStats {
    pub label: &'static str,
    pub enqueued: u64,
    pub flushed: u64,
    pub flush_count: u64,
    pub flush_errors: u64,
    pub queue_size: usize,
    pub seconds_since_last_flush: Option<i64>,
    pub is_running: bool,
}

impl StreamStats {
    fn from_snapshot(label: &'static str, snapshot: BequeStatsSnapshot) -> Self {
        Self {
            label,
            enqueued: snapshot.enqueued,
            flushed: snapshot.flushed,
            flush_count: snapshot.flush_count,
            flush_errors: snapshot.flush_errors,
            queue_size: snapshot.queue_size,
            seconds_since_last_flush: snapshot.seconds_since_last_flush,
            is_running: snapshot.is_running,
        }
    }
}

/// A full diagnostic snapshot, suitable for serializing to an operator
/// status endpoint or a periodic log line.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub connection_state: String,
    pub is_connected: bool,
    pub total_messages: u64,
    pub last_message_time: Option<DateTime<Utc>>,
    pub idle_seconds: Option<i64>,
    pub is_stale: bool,
    pub l1: StreamStats,
    pub l2: StreamStats,
    pub chart: StreamStats,
}

impl Snapshot {
    pub fn capture(
        state: ConnectionState,
        watchdog: &Watchdog,
        l1: BequeStatsSnapshot,
        l2: BequeStatsSnapshot,
        chart: BequeStatsSnapshot,
    ) -> Self {
        let idle_seconds = watchdog.idle_seconds();
        let is_stale = idle_seconds
            .map(|secs| secs >= crate::constants::WATCHDOG_STALE_THRESHOLD_SECS)
            .unwrap_or(false);

        Self {
            connection_state: connection_state_label(state).to_string(),
            is_connected: matches!(state, ConnectionState::Running),
            total_messages: watchdog.total_messages(),
            last_message_time: watchdog.last_message_time(),
            idle_seconds,
            is_stale,
            l1: StreamStats::from_snapshot("l1", l1),
            l2: StreamStats::from_snapshot("l2", l2),
            chart: StreamStats::from_snapshot("chart", chart),
        }
    }
}

fn connection_state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::LoggingIn => "logging_in",
        ConnectionState::Subscribing => "subscribing",
        ConnectionState::Running => "running",
        ConnectionState::Reconnecting => "reconnecting",
        ConnectionState::Stopped => "stopped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_flag_trips_past_threshold() {
        let watchdog = Watchdog::default();
        watchdog.touch();
        let snapshot = Snapshot::capture(
            ConnectionState::Running,
            &watchdog,
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
        );
        assert!(!snapshot.is_stale);
    }

    #[test]
    fn reports_total_messages_and_connection_flag() {
        let watchdog = Watchdog::default();
        watchdog.touch();
        watchdog.touch();
        let snapshot = Snapshot::capture(
            ConnectionState::Running,
            &watchdog,
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
        );
        assert_eq!(snapshot.total_messages, 2);
        assert!(snapshot.is_connected);
        assert!(snapshot.last_message_time.is_some());

        let disconnected = Snapshot::capture(
            ConnectionState::Reconnecting,
            &watchdog,
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
            BequeStatsSnapshot::default(),
        );
        assert!(!disconnected.is_connected);
    }
}
