//! OHLCV chart candle.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enums::Timeframe;

/// An OHLCV candle, upserted keyed by `(security_id, timestamp, timeframe)`,
/// partitioned by day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChartCandle {
    pub id: Uuid,
    pub security_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub open_price: i64,
    pub high_price: i64,
    pub low_price: i64,
    pub close_price: i64,
    pub volume: i64,
    pub trade_count: Option<i64>,
    pub vwap: Option<i64>,
    pub is_regular_hours: bool,
}

impl ChartCandle {
    /// Whether this candle satisfies the design's invariants: `high >= low`,
    /// all four OHLC prices strictly positive, and non-negative volume.
    pub fn satisfies_invariants(&self) -> bool {
        self.high_price >= self.low_price
            && self.open_price > 0
            && self.high_price > 0
            && self.low_price > 0
            && self.close_price > 0
            && self.volume >= 0
    }

    /// The natural upsert key for this candle.
    pub fn key(&self) -> (Uuid, DateTime<Utc>, Timeframe) {
        (self.security_id, self.timestamp, self.timeframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: i64, high: i64, low: i64, close: i64, volume: i64) -> ChartCandle {
        ChartCandle {
            id: Uuid::nil(),
            security_id: Uuid::nil(),
            timestamp: Utc::now(),
            timeframe: Timeframe::OneMinute,
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            volume,
            trade_count: None,
            vwap: None,
            is_regular_hours: true,
        }
    }

    #[test]
    fn validates_ohlcv() {
        assert!(candle(100, 110, 90, 105, 1000).satisfies_invariants());
        assert!(!candle(100, 90, 110, 105, 1000).satisfies_invariants());
        assert!(!candle(0, 110, 90, 105, 1000).satisfies_invariants());
        assert!(!candle(100, 110, 90, 105, -1).satisfies_invariants());
        assert!(candle(100, 110, 90, 105, 0).satisfies_invariants());
    }
}
