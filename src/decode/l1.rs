//! Level-1 (top-of-book) frame decoding.

use serde_json::Value;

use super::{first_number, first_string, frame_items};

/// A loosely-typed L1 entity decoded from one wire item. Prices are raw
/// `f64` at this stage; scaling to fixed-point happens in
/// [`crate::flush::l1`] once a security id is known.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLevelOne {
    pub symbol: String,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub last_price: Option<f64>,
    pub bid_size: Option<f64>,
    pub ask_size: Option<f64>,
    pub last_size: Option<f64>,
    pub mark_price: Option<f64>,
    pub daily_high: Option<f64>,
    pub daily_low: Option<f64>,
    pub daily_open: Option<f64>,
    pub prev_close: Option<f64>,
    pub daily_volume: Option<f64>,
    pub net_change_pct: Option<f64>,
    pub quote_time: Option<i64>,
    pub trade_time: Option<i64>,
    pub security_status: Option<String>,
    pub is_realtime: bool,
}

/// Decode every item in a frame into [`RawLevelOne`] entities. Items missing
/// a symbol are dropped, matching the original's `if not symbol: continue`.
pub fn decode_frame(msg: &Value) -> Vec<RawLevelOne> {
    frame_items(msg).into_iter().filter_map(decode_item).collect()
}

fn decode_item(item: &Value) -> Option<RawLevelOne> {
    let symbol = first_string(item, &["symbol", "SYMBOL", "key", "KEY"])?.to_ascii_uppercase();

    Some(RawLevelOne {
        symbol,
        bid_price: first_number(item, &["bidPrice", "BID_PRICE", "BID"]),
        ask_price: first_number(item, &["askPrice", "ASK_PRICE", "ASK"]),
        last_price: first_number(item, &["lastPrice", "LAST_PRICE", "LAST"]),
        bid_size: first_number(item, &["bidSize", "BID_SIZE"]),
        ask_size: first_number(item, &["askSize", "ASK_SIZE"]),
        last_size: first_number(item, &["lastSize", "LAST_SIZE"]),
        mark_price: first_number(item, &["mark", "MARK", "MARK_PRICE"]),
        daily_high: first_number(item, &["highPrice", "HIGH_PRICE", "HIGH"]),
        daily_low: first_number(item, &["lowPrice", "LOW_PRICE", "LOW"]),
        daily_open: first_number(item, &["openPrice", "OPEN_PRICE", "OPEN"]),
        prev_close: first_number(item, &["closePrice", "PREV_CLOSE", "CLOSE"]),
        daily_volume: first_number(item, &["totalVolume", "VOLUME", "TOTAL_VOLUME"]),
        net_change_pct: first_number(item, &["netPercentChange", "NET_CHANGE_PCT", "netChangePct"]),
        quote_time: first_number(item, &["quoteTime", "QUOTE_TIME"]).map(|n| n as i64),
        trade_time: first_number(item, &["tradeTime", "TRADE_TIME"]).map(|n| n as i64),
        security_status: first_string(item, &["securityStatus", "SECURITY_STATUS"]),
        is_realtime: item
            .get("isRealtime")
            .or_else(|| item.get("IS_REAL_TIME"))
            .and_then(Value::as_bool)
            .unwrap_or(true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_camel_case_frame() {
        let msg = json!({
            "content": [{
                "symbol": "aapl",
                "bidPrice": 190.12,
                "askPrice": 190.15,
                "totalVolume": 1000000,
            }]
        });
        let decoded = decode_frame(&msg);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].symbol, "AAPL");
        assert_eq!(decoded[0].bid_price, Some(190.12));
        assert_eq!(decoded[0].daily_volume, Some(1_000_000.0));
    }

    #[test]
    fn decodes_net_change_pct_under_either_field_name() {
        let msg = json!({
            "content": [
                {"symbol": "aapl", "netPercentChange": 1.25},
                {"symbol": "msft", "NET_CHANGE_PCT": -0.5},
            ]
        });
        let decoded = decode_frame(&msg);
        assert_eq!(decoded[0].net_change_pct, Some(1.25));
        assert_eq!(decoded[1].net_change_pct, Some(-0.5));
    }

    #[test]
    fn decodes_legacy_upper_case_frame_and_drops_symbolless_items() {
        let msg = json!({
            "content": [
                {"SYMBOL": "msft", "BID_PRICE": "402.1", "ASK": 402.2},
                {"BID_PRICE": 1.0},
            ]
        });
        let decoded = decode_frame(&msg);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].symbol, "MSFT");
        assert_eq!(decoded[0].bid_price, Some(402.1));
        assert_eq!(decoded[0].ask_price, Some(402.2));
    }
}
