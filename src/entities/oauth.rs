//! OAuth anti-CSRF state and token custody types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-use anti-CSRF nonce bound to one user. Created on auth-URL
/// mint; consumed and deleted on callback; expired by TTL.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OAuthState {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

/// Time-to-live for an unconsumed OAuth state row.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

impl OAuthState {
    /// Whether this state row has expired and should be treated as unknown.
    pub fn is_expired(&self) -> bool {
        (Utc::now() - self.created_at).num_seconds() > OAUTH_STATE_TTL_SECS
    }
}

/// The custody representation of an OAuth token, as stored (as JSON) in the
/// [`crate::store::secret::SecretStore`] under `{SECRET_NAME_PREFIX}_<user_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBlob {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute access-token expiry, computed at exchange/refresh time.
    pub expires_at: DateTime<Utc>,
    /// Absolute refresh-token expiry, if the upstream reports one.
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl TokenBlob {
    /// Whether the access token is within the refresh leeway of expiry.
    pub fn needs_refresh(&self, leeway_secs: i64) -> bool {
        let leeway = chrono::Duration::seconds(leeway_secs);
        Utc::now() + leeway >= self.expires_at
    }
}

/// Legacy wrapped envelope format the original persisted before the
/// flat-token migration (`{"creation_timestamp": ..., "token": {...}}`).
/// Unwrapped to [`TokenBlob`] on read and rewritten atomically, per the
/// design's one-time migration note.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyWrappedToken {
    #[serde(default)]
    pub creation_timestamp: Option<i64>,
    pub token: TokenBlob,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn needs_refresh_within_leeway() {
        let token = TokenBlob {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_at: Utc::now() + Duration::seconds(100),
            refresh_token_expires_at: None,
            token_type: "Bearer".into(),
            scope: None,
        };
        assert!(token.needs_refresh(300));
        assert!(!token.needs_refresh(10));
    }

    #[test]
    fn oauth_state_expires_after_ttl() {
        let stale = OAuthState {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            state: "s".into(),
            created_at: Utc::now() - Duration::seconds(OAUTH_STATE_TTL_SECS + 1),
        };
        assert!(stale.is_expired());
    }
}
