//! OAuth2 authorization-code lifecycle for the upstream broker API.
//!
//! Grounded on `axiom/mdata/auth.py`'s `SchwabAuthService`: mint an
//! authorize URL with an anti-CSRF state nonce, exchange an authorization
//! code for tokens, and keep the stored token fresh via single-flight
//! refresh. Token custody (`SecretStore`) is deliberately separate from
//! state-nonce custody (`PersistentStore`), mirroring the original's split
//! between Supabase Vault and the relational `oauth_states` table.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::RngCore;
use tokio::sync::Mutex as AsyncMutex;
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::constants::TOKEN_REFRESH_LEEWAY_SECS;
use crate::entities::oauth::LegacyWrappedToken;
use crate::entities::TokenBlob;
use crate::error::{CoreError, Result};
use crate::store::{token_secret_name, PersistentStore, SecretStore};

const AUTHORIZE_URL: &str = "https://api.schwabapi.com/v1/oauth/authorize";
const TOKEN_URL: &str = "https://api.schwabapi.com/v1/oauth/token";

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token_expires_in: Option<i64>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    fn into_blob(self, now: DateTime<Utc>) -> TokenBlob {
        TokenBlob {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: now + chrono::Duration::seconds(self.expires_in),
            refresh_token_expires_at: self
                .refresh_token_expires_in
                .map(|secs| now + chrono::Duration::seconds(secs)),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

/// Manages the authorize/exchange/refresh/custody cycle for one upstream
/// OAuth client, backed by a `PersistentStore` (state nonces) and a
/// `SecretStore` (token blobs).
pub struct TokenLifecycle<P, S> {
    store: Arc<P>,
    secrets: Arc<S>,
    http: reqwest::Client,
    api_key: String,
    app_secret: String,
    callback_url: String,
    refresh_locks: AsyncMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl<P: PersistentStore, S: SecretStore> TokenLifecycle<P, S> {
    pub fn new(config: &Config, store: Arc<P>, secrets: Arc<S>) -> Self {
        Self {
            store,
            secrets,
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            app_secret: config.app_secret.clone(),
            callback_url: config.callback_url.clone(),
            refresh_locks: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Mint a fresh anti-CSRF state nonce for `user_id`, persist it, and
    /// return the full authorize URL to redirect the user to.
    pub async fn mint_authorize_url(&self, user_id: Uuid) -> Result<String> {
        let state = random_url_safe_token(32);
        self.store.upsert_oauth_state(user_id, &state).await?;

        let mut url = Url::parse(AUTHORIZE_URL).map_err(CoreError::Url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.api_key)
            .append_pair("redirect_uri", &self.callback_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "readonly")
            .append_pair("state", &state);
        Ok(url.into())
    }

    /// Consume and validate an OAuth callback's `state` parameter, returning
    /// the owning user id if it's known and unexpired.
    pub async fn consume_state(&self, state: &str) -> Result<Option<Uuid>> {
        self.store.consume_oauth_state(state).await
    }

    /// Exchange an authorization code for tokens and persist them.
    pub async fn exchange_code(&self, user_id: Uuid, code: &str) -> Result<TokenBlob> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.callback_url.as_str()),
        ];
        let token = self.request_token(&params).await?;
        self.save_token(user_id, &token).await?;
        Ok(token)
    }

    /// Load the stored token for `user_id`, transparently migrating a
    /// legacy wrapped envelope (`{"creation_timestamp": ..., "token": {...}}`)
    /// to the flat [`TokenBlob`] shape on read.
    pub async fn load_token(&self, user_id: Uuid) -> Result<Option<TokenBlob>> {
        let name = token_secret_name(user_id);
        let Some(raw) = self.secrets.get(&name).await? else {
            return Ok(None);
        };

        if let Ok(blob) = serde_json::from_str::<TokenBlob>(&raw) {
            return Ok(Some(blob));
        }

        let legacy: LegacyWrappedToken = serde_json::from_str(&raw)
            .map_err(|e| CoreError::AuthFailure(format!("stored token is neither flat nor legacy: {e}")))?;
        self.save_token(user_id, &legacy.token).await?;
        Ok(Some(legacy.token))
    }

    pub async fn save_token(&self, user_id: Uuid, token: &TokenBlob) -> Result<()> {
        let name = token_secret_name(user_id);
        let serialized = serde_json::to_string(token)?;
        self.secrets.put(&name, &serialized).await
    }

    pub async fn delete_token(&self, user_id: Uuid) -> Result<()> {
        let name = token_secret_name(user_id);
        self.secrets.delete(&name).await
    }

    /// Return a token guaranteed not to be within the refresh leeway of
    /// expiry, refreshing it first if necessary. Concurrent callers for the
    /// same `user_id` share one in-flight refresh (single-flight).
    pub async fn ensure_fresh_token(&self, user_id: Uuid) -> Result<TokenBlob> {
        let token = self
            .load_token(user_id)
            .await?
            .ok_or_else(|| CoreError::AuthFailure(format!("no stored token for user {user_id}")))?;

        if !token.needs_refresh(TOKEN_REFRESH_LEEWAY_SECS) {
            return Ok(token);
        }

        let lock = {
            let mut locks = self.refresh_locks.lock().await;
            locks.entry(user_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another caller may have
        // already refreshed while we were waiting.
        let token = self
            .load_token(user_id)
            .await?
            .ok_or_else(|| CoreError::AuthFailure(format!("no stored token for user {user_id}")))?;
        if !token.needs_refresh(TOKEN_REFRESH_LEEWAY_SECS) {
            return Ok(token);
        }

        self.refresh_token(user_id, &token.refresh_token).await
    }

    async fn refresh_token(&self, user_id: Uuid, refresh_token: &str) -> Result<TokenBlob> {
        let params = [("grant_type", "refresh_token"), ("refresh_token", refresh_token)];
        let token = self.request_token(&params).await?;
        self.save_token(user_id, &token).await?;
        Ok(token)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenBlob> {
        let now = Utc::now();
        let resp = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.api_key, Some(&self.app_secret))
            .form(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::AuthFailure(format!("token request failed with {status}: {body}")));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token.into_blob(now))
    }
}

fn random_url_safe_token(bytes: usize) -> String {
    use base64::Engine;
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_tokens_are_url_safe_and_unique() {
        let a = random_url_safe_token(32);
        let b = random_url_safe_token(32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
