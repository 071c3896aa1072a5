//! Environment configuration.
//!
//! Mirrors the original `axiom/env.py` module-level settings object, but as
//! an explicit struct loaded once at startup rather than a global singleton
//! (see the crate's design notes on avoiding ambient mutable state). Absence
//! of any required value is a [`CoreError::FatalConfig`], matching the
//! design's "absence of any required value is a startup fatal" rule.

use std::env;

use crate::error::{CoreError, Result};

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "development" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(CoreError::FatalConfig(format!(
                "ENVIRONMENT must be one of development|staging|production, got {other:?}"
            ))),
        }
    }
}

/// Fully resolved runtime configuration, loaded once from the process
/// environment. Every field here is enumerated by the design's
/// "Environment configuration" list.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream broker REST/WS API base.
    pub api_url: String,
    /// This application's own public URL (used to build redirect URIs).
    pub app_url: String,
    /// Postgres connection string.
    pub db_url: String,
    /// Verbose diagnostic logging toggle.
    pub debug: bool,
    /// Deployment environment.
    pub environment: Environment,
    /// The single authenticated owner this process streams on behalf of.
    pub owner_id: uuid::Uuid,
    /// Upstream OAuth client id (API key).
    pub api_key: String,
    /// Upstream OAuth client secret (app secret).
    pub app_secret: String,
    /// Upstream OAuth redirect/callback URL.
    pub callback_url: String,
    /// Base URL for the secret-store backend (e.g. a Supabase project URL).
    pub supabase_url: String,
    /// Service-role key for the secret-store backend.
    pub supabase_key: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::FatalConfig`] if any required variable is
    /// missing, empty, or fails to parse.
    pub fn from_env() -> Result<Self> {
        let api_url = require_env("API_URL")?;
        let app_url = require_env("APP_URL")?;
        let db_url = require_env("DB_URL")?;
        let debug = optional_env("DEBUG")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let environment = require_env("ENVIRONMENT")?.parse()?;
        let owner_id_raw = require_env("OWNER_ID")?;
        let owner_id = uuid::Uuid::parse_str(&owner_id_raw).map_err(|e| {
            CoreError::FatalConfig(format!("OWNER_ID is not a valid UUID: {e}"))
        })?;
        let api_key = require_env("SCHWAB_API_KEY")?;
        let app_secret = require_env("SCHWAB_APP_SECRET")?;
        let callback_url = require_env("SCHWAB_CALLBACK_URL")?;
        let supabase_url = require_env("SUPABASE_URL")?;
        let supabase_key = require_env("SUPABASE_SERVICE_ROLE_KEY")?;

        Ok(Self {
            api_url,
            app_url,
            db_url,
            debug,
            environment,
            owner_id,
            api_key,
            app_secret,
            callback_url,
            supabase_url,
            supabase_key,
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        Ok(_) => Err(CoreError::FatalConfig(format!(
            "{name} is set but empty"
        ))),
        Err(_) => Err(CoreError::FatalConfig(format!(
            "missing required environment variable {name}"
        ))),
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_values() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert!("bogus".parse::<Environment>().is_err());
    }
}
