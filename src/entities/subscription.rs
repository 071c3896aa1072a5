//! Persisted subscription intent.

use uuid::Uuid;

use super::enums::StreamType;

/// A user's desired subscription to one symbol on one stream (and, for
/// Level-2, one book). Unique by `(user, symbol, stream_type, book)`.
/// Managed by users via the (out-of-scope) admin API; read by the Differ.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreamSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub stream_type: String,
    pub book: Option<String>,
    pub is_active: bool,
}

impl StreamSubscription {
    /// The canonical (uppercase) symbol for wire comparisons.
    pub fn canonical_symbol(&self) -> String {
        self.symbol.to_ascii_uppercase()
    }

    /// Typed accessor for `stream_type`, defaulting to [`StreamType::Quotes`]
    /// for any value that doesn't match a known category (defensive against
    /// rows written by a future admin-API version).
    pub fn stream_type(&self) -> StreamType {
        match self.stream_type.as_str() {
            "level2" => StreamType::Level2,
            "ohlcv" => StreamType::Ohlcv,
            _ => StreamType::Quotes,
        }
    }
}
