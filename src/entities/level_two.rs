//! Level-2 (depth-of-book) order-book sample.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enums::OrderSide;

/// A single Level-2 depth sample for one side/price-level. Append-only,
/// unique by `(security, timestamp, side, price_level)`, partitioned by day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LevelTwoSample {
    pub security_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price_level: i64,
    pub size: i64,
    pub order_count: i64,
    pub level_index: i32,
    pub market_maker_id: Option<String>,
    pub mic_id: Option<String>,
    pub quote_time: Option<i64>,
}

impl LevelTwoSample {
    /// Whether this sample satisfies the L2 invariants: strictly positive
    /// price level, size, and order count; non-negative level index.
    pub fn satisfies_invariants(&self) -> bool {
        self.price_level > 0 && self.size > 0 && self.order_count > 0 && self.level_index >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(price_level: i64, size: i64, order_count: i64, level_index: i32) -> LevelTwoSample {
        LevelTwoSample {
            security_id: Uuid::nil(),
            timestamp: Utc::now(),
            side: OrderSide::Bid,
            price_level,
            size,
            order_count,
            level_index,
            market_maker_id: None,
            mic_id: None,
            quote_time: None,
        }
    }

    #[test]
    fn rejects_non_positive_fields() {
        assert!(sample(1, 1, 1, 0).satisfies_invariants());
        assert!(!sample(0, 1, 1, 0).satisfies_invariants());
        assert!(!sample(1, 0, 1, 0).satisfies_invariants());
        assert!(!sample(1, 1, 0, 0).satisfies_invariants());
        assert!(!sample(1, 1, 1, -1).satisfies_invariants());
    }
}
