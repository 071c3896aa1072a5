//! Shared enum types referenced by the data model (spec.md §3 and the
//! original `db/models/enums.py`). Only the subset that the ingestion
//! pipeline itself touches is carried here — option-chain and
//! transaction-history enums from the original model layer are out of
//! scope for this core and intentionally omitted.

use serde::{Deserialize, Serialize};

/// Security asset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Equity,
    Etf,
    Cef,
    Adr,
    Index,
}

/// Security asset subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetSubType {
    Coe,
    Prf,
    Adr,
    Gdr,
    Cef,
    Etf,
    Etn,
    Uit,
    War,
    Rgt,
}

/// Trading status of a security, as reported on an L1 quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum SecurityStatus {
    Normal,
    Halted,
    Closed,
    Suspended,
}

/// Order-book side for a Level-2 sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Bid,
    Ask,
}

impl OrderSide {
    /// Parse a side from a case-insensitive wire string; unrecognized values
    /// are not a side at all (the decoder drops such rows).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "BID" => Some(Self::Bid),
            "ASK" => Some(Self::Ask),
            _ => None,
        }
    }
}

/// OHLCV candle timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinute,
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "30m")]
    ThirtyMinute,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    /// Parse a timeframe from its wire string, case- and alias-tolerant.
    /// Unknown values default to one minute, matching the original's
    /// `except ValueError: Timeframe.ONE_MINUTE` fallback.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "1m" | "1min" => Self::OneMinute,
            "5m" | "5min" => Self::FiveMinute,
            "15m" | "15min" => Self::FifteenMinute,
            "30m" | "30min" => Self::ThirtyMinute,
            "1h" => Self::OneHour,
            "4h" => Self::FourHour,
            "1d" => Self::OneDay,
            _ => Self::OneMinute,
        }
    }

    /// The wire string for this timeframe.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::FiveMinute => "5m",
            Self::FifteenMinute => "15m",
            Self::ThirtyMinute => "30m",
            Self::OneHour => "1h",
            Self::FourHour => "4h",
            Self::OneDay => "1d",
        }
    }
}

/// The three market-data stream kinds the supervisor and decoder dispatch
/// on, replacing the original's dynamic-dispatch-by-service-name with a
/// closed match (see design note on dynamic handler registration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    LevelOne,
    LevelTwo,
    Chart,
}

impl StreamKind {
    /// Human-readable diagnostic label.
    pub fn label(self) -> &'static str {
        match self {
            Self::LevelOne => "l1",
            Self::LevelTwo => "l2",
            Self::Chart => "chart",
        }
    }
}

/// An L2 order-book source. Only `Nasdaq` and `Nyse` are modeled, per the
/// design's glossary entry for "Book".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Book {
    Nasdaq,
    Nyse,
}

impl Book {
    /// Parse a book name, case-insensitively; unrecognized names default to
    /// NASDAQ per the design's tie-break rule.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "NYSE" => Self::Nyse,
            _ => Self::Nasdaq,
        }
    }

    /// Canonical uppercase string form, as stored in `StreamSubscription.book`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nasdaq => "NASDAQ",
            Self::Nyse => "NYSE",
        }
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subscription category, matching `StreamSubscription.stream_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamType {
    Quotes,
    Level2,
    Ohlcv,
}

impl StreamType {
    /// Canonical string form, as stored in `StreamSubscription.stream_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Level2 => "level2",
            Self::Ohlcv => "ohlcv",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_falls_back_to_one_minute() {
        assert_eq!(Timeframe::parse_or_default("bogus"), Timeframe::OneMinute);
        assert_eq!(Timeframe::parse_or_default("1d"), Timeframe::OneDay);
    }

    #[test]
    fn book_defaults_to_nasdaq() {
        assert_eq!(Book::parse_or_default("nyse"), Book::Nyse);
        assert_eq!(Book::parse_or_default("whatever"), Book::Nasdaq);
    }

    #[test]
    fn order_side_is_case_insensitive() {
        assert_eq!(OrderSide::parse("bid"), Some(OrderSide::Bid));
        assert_eq!(OrderSide::parse("ASK"), Some(OrderSide::Ask));
        assert_eq!(OrderSide::parse("mid"), None);
    }
}
