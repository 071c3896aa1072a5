//! Level-2 (depth-of-book) frame decoding.

use serde_json::Value;

use super::{first_number, first_string, frame_items};

/// A loosely-typed L2 entity decoded from one wire item.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLevelTwo {
    pub symbol: String,
    pub side: Option<String>,
    pub price_level: Option<f64>,
    pub size: Option<f64>,
    pub order_count: i64,
    pub level_index: i32,
    pub market_maker_id: Option<String>,
    pub mic_id: Option<String>,
    pub quote_time: Option<i64>,
}

/// Decode every item in a frame into [`RawLevelTwo`] entities.
pub fn decode_frame(msg: &Value) -> Vec<RawLevelTwo> {
    frame_items(msg).into_iter().filter_map(decode_item).collect()
}

fn decode_item(item: &Value) -> Option<RawLevelTwo> {
    let symbol = first_string(item, &["symbol", "SYMBOL", "key", "KEY"])?.to_ascii_uppercase();
    let side = first_string(item, &["side", "SIDE"]).map(|s| s.to_ascii_uppercase());
    let side = side.filter(|s| s == "BID" || s == "ASK");

    Some(RawLevelTwo {
        symbol,
        side,
        price_level: first_number(item, &["price", "PRICE", "priceLevel", "PRICE_LEVEL"]),
        size: first_number(item, &["size", "SIZE"]),
        order_count: first_number(item, &["orderCount", "ORDER_COUNT"]).unwrap_or(0.0) as i64,
        level_index: first_number(item, &["levelIndex", "LEVEL_INDEX"]).unwrap_or(0.0) as i32,
        market_maker_id: first_string(item, &["marketMaker", "MMID"]),
        mic_id: first_string(item, &["micId", "MIC"]),
        quote_time: first_number(item, &["quoteTime", "QUOTE_TIME"]).map(|n| n as i64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unrecognized_side() {
        let msg = json!({"content": [{"symbol": "aapl", "side": "MID", "price": 1.0, "size": 1.0}]});
        let decoded = decode_frame(&msg);
        assert_eq!(decoded[0].side, None);
    }

    #[test]
    fn decodes_known_sides_case_insensitively() {
        let msg = json!({"content": [{"symbol": "aapl", "side": "bid", "price": 190.1, "size": 200.0}]});
        let decoded = decode_frame(&msg);
        assert_eq!(decoded[0].side.as_deref(), Some("BID"));
    }
}
