//! OHLCV chart frame decoding, including the raw-timestamp heuristic.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::{first_number, first_string, frame_items};
use crate::entities::Timeframe;

/// A loosely-typed chart entity decoded from one wire item.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChart {
    pub symbol: String,
    pub open_price: Option<f64>,
    pub high_price: Option<f64>,
    pub low_price: Option<f64>,
    pub close_price: Option<f64>,
    pub volume: Option<f64>,
    pub trade_count: Option<f64>,
    pub vwap: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub timeframe: Timeframe,
}

/// Decode every item in a frame into [`RawChart`] entities.
pub fn decode_frame(msg: &Value) -> Vec<RawChart> {
    frame_items(msg).into_iter().filter_map(decode_item).collect()
}

fn decode_item(item: &Value) -> Option<RawChart> {
    let symbol = first_string(item, &["symbol", "SYMBOL", "key", "KEY"])?.to_ascii_uppercase();
    let timeframe_raw = first_string(item, &["timeframe", "TIMEFRAME"]).unwrap_or_else(|| "1m".to_string());

    Some(RawChart {
        symbol,
        open_price: first_number(item, &["openPrice", "OPEN_PRICE", "OPEN", "open"]),
        high_price: first_number(item, &["highPrice", "HIGH_PRICE", "HIGH", "high"]),
        low_price: first_number(item, &["lowPrice", "LOW_PRICE", "LOW", "low"]),
        close_price: first_number(item, &["closePrice", "CLOSE_PRICE", "CLOSE", "close"]),
        volume: first_number(item, &["volume", "VOLUME", "totalVolume", "TOTAL_VOLUME"]),
        trade_count: first_number(item, &["tradeCount", "TRADE_COUNT"]),
        vwap: first_number(item, &["vwap", "VWAP"]),
        timestamp: parse_chart_timestamp(item.get("timestamp").or_else(|| item.get("TIMESTAMP"))),
        timeframe: Timeframe::parse_or_default(&timeframe_raw),
    })
}

/// Parse a chart candle's timestamp, tolerant of numeric seconds, numeric
/// milliseconds, and ISO-8601 strings. Numbers greater than `1e11` are
/// assumed to be milliseconds (a second-precision Unix timestamp doesn't
/// cross that threshold until the year 5138). Anything unparseable falls
/// back to "now" rather than rejecting the whole candle.
fn parse_chart_timestamp(raw: Option<&Value>) -> DateTime<Utc> {
    let Some(raw) = raw else {
        return Utc::now();
    };

    if let Some(n) = raw.as_f64() {
        return from_epoch_heuristic(n);
    }

    if let Some(s) = raw.as_str() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return dt.with_timezone(&Utc);
        }
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Utc.from_utc_datetime(&naive);
        }
        if let Ok(n) = s.parse::<f64>() {
            return from_epoch_heuristic(n);
        }
    }

    Utc::now()
}

fn from_epoch_heuristic(n: f64) -> DateTime<Utc> {
    let seconds = if n > 1e11 { n / 1000.0 } else { n };
    Utc.timestamp_opt(seconds.trunc() as i64, ((seconds.fract()) * 1e9) as u32)
        .single()
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn treats_large_numbers_as_milliseconds() {
        let seconds_ts = parse_chart_timestamp(Some(&json!(1_700_000_000)));
        let millis_ts = parse_chart_timestamp(Some(&json!(1_700_000_000_000i64)));
        assert_eq!(seconds_ts.timestamp(), millis_ts.timestamp());
    }

    #[test]
    fn falls_back_to_iso8601() {
        let dt = parse_chart_timestamp(Some(&json!("2024-01-15T09:30:00Z")));
        assert_eq!(dt.timestamp(), 1705311000);
    }

    #[test]
    fn falls_back_to_now_on_garbage() {
        let before = Utc::now();
        let dt = parse_chart_timestamp(Some(&json!("not-a-timestamp")));
        assert!(dt >= before);
    }

    #[test]
    fn decodes_full_candle() {
        let msg = json!({"content": [{
            "symbol": "aapl", "open": 190.0, "high": 191.0, "low": 189.5,
            "close": 190.5, "volume": 1000, "timeframe": "1m",
            "timestamp": 1_700_000_000,
        }]});
        let decoded = decode_frame(&msg);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].timeframe, Timeframe::OneMinute);
    }
}
