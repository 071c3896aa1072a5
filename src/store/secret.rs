//! Secret custody, decoupled from the relational store.
//!
//! Grounded on `mdata/auth.py`'s `store_tokens_in_vault` / `get_tokens_from_vault`
//! / `delete_tokens_from_vault`, which keep OAuth tokens in a secret manager
//! distinct from the Postgres database the rest of the entities live in.
//! The trait is intentionally narrow: callers only ever need to put, get,
//! and delete a single named secret blob.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::constants::SECRET_NAME_PREFIX;
use crate::error::{CoreError, Result};

/// Custody for opaque secret blobs, keyed by a caller-chosen name.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn put(&self, name: &str, value: &str) -> Result<()>;
    async fn get(&self, name: &str) -> Result<Option<String>>;
    async fn delete(&self, name: &str) -> Result<()>;
}

/// The secret name under which a user's token blob is stored.
pub fn token_secret_name(user_id: Uuid) -> String {
    format!("{SECRET_NAME_PREFIX}_{user_id}")
}

/// An in-process `SecretStore`, useful for tests and for deployments that
/// don't yet have a managed secret backend wired up.
#[derive(Default)]
pub struct InMemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn put(&self, name: &str, value: &str) -> Result<()> {
        self.values.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(name).cloned())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.values.lock().remove(name);
        Ok(())
    }
}

/// A `SecretStore` backed by a Vault-compatible KV-v2 HTTP API, mirroring
/// the original's direct REST calls rather than pulling in a full Vault
/// client SDK (none is attested anywhere in the example pack).
pub struct VaultSecretStore {
    http: reqwest::Client,
    base_url: String,
    mount: String,
    token: String,
}

impl VaultSecretStore {
    pub fn new(base_url: impl Into<String>, mount: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            mount: mount.into(),
            token: token.into(),
        }
    }

    fn data_url(&self, name: &str) -> String {
        format!("{}/v1/{}/data/{}", self.base_url.trim_end_matches('/'), self.mount, name)
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    async fn put(&self, name: &str, value: &str) -> Result<()> {
        let body = serde_json::json!({ "data": { "value": value } });
        let resp = self
            .http
            .post(self.data_url(name))
            .header("X-Vault-Token", &self.token)
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Storage(format!(
                "vault put {name} failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(self.data_url(name))
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CoreError::Storage(format!(
                "vault get {name} failed with status {}",
                resp.status()
            )));
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(body
            .pointer("/data/data/value")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let resp = self
            .http
            .delete(self.data_url(name))
            .header("X-Vault-Token", &self.token)
            .send()
            .await?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::Storage(format!(
                "vault delete {name} failed with status {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemorySecretStore::new();
        let name = token_secret_name(Uuid::nil());
        assert!(store.get(&name).await.unwrap().is_none());
        store.put(&name, "blob").await.unwrap();
        assert_eq!(store.get(&name).await.unwrap().as_deref(), Some("blob"));
        store.delete(&name).await.unwrap();
        assert!(store.get(&name).await.unwrap().is_none());
    }
}
