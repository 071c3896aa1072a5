//! Level-1 (top-of-book) quote sample.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enums::SecurityStatus;
use super::price::Price;

/// A single Level-1 quote sample. Append-only, partitioned by day on
/// `timestamp`. See spec.md §3's invariant: if both `bid_price` and
/// `ask_price` are present, `ask_price >= bid_price`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LevelOneSample {
    pub security_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub bid_price: Option<i64>,
    pub bid_size: Option<i64>,
    pub ask_price: Option<i64>,
    pub ask_size: Option<i64>,
    pub last_price: Option<i64>,
    pub last_size: Option<i64>,
    pub mark_price: Option<i64>,
    pub daily_high: Option<i64>,
    pub daily_low: Option<i64>,
    pub daily_open: Option<i64>,
    pub prev_close: Option<i64>,
    pub daily_volume: Option<i64>,
    pub net_change_pct: Option<f64>,
    pub security_status: Option<SecurityStatus>,
    pub quote_time: Option<i64>,
    pub trade_time: Option<i64>,
    pub is_realtime: bool,
}

impl LevelOneSample {
    /// Whether this sample satisfies the L1 invariant: when both sides are
    /// present, the ask must not be below the bid.
    pub fn satisfies_invariants(&self) -> bool {
        match (self.bid_price, self.ask_price) {
            (Some(bid), Some(ask)) => ask >= bid,
            _ => true,
        }
    }

    /// Convenience accessor returning bid/ask as [`Price`] when present.
    pub fn bid(&self) -> Option<Price> {
        self.bid_price.map(Price::from_scaled)
    }

    /// Convenience accessor returning the ask as [`Price`] when present.
    pub fn ask(&self) -> Option<Price> {
        self.ask_price.map(Price::from_scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(bid: Option<i64>, ask: Option<i64>) -> LevelOneSample {
        LevelOneSample {
            security_id: Uuid::nil(),
            timestamp: Utc::now(),
            bid_price: bid,
            bid_size: None,
            ask_price: ask,
            ask_size: None,
            last_price: None,
            last_size: None,
            mark_price: None,
            daily_high: None,
            daily_low: None,
            daily_open: None,
            prev_close: None,
            daily_volume: None,
            net_change_pct: None,
            security_status: None,
            quote_time: None,
            trade_time: None,
            is_realtime: true,
        }
    }

    #[test]
    fn ask_must_not_be_below_bid() {
        assert!(sample(Some(1_001_200), Some(1_001_500)).satisfies_invariants());
        assert!(!sample(Some(1_001_500), Some(1_001_200)).satisfies_invariants());
        assert!(sample(Some(1_001_200), None).satisfies_invariants());
        assert!(sample(None, None).satisfies_invariants());
    }
}
