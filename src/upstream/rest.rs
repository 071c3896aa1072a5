//! REST client for the upstream broker API.
//!
//! Grounded on `dhan-rs`'s `client::DhanClient`: a thin `reqwest::Client`
//! wrapper with cached auth headers and `get`/`post` helpers that
//! deserialize success bodies and translate failure bodies into
//! [`CoreError::Api`] / [`CoreError::HttpStatus`]. Generalized here to take
//! a bearer token per-call (since the token can rotate mid-process) and to
//! pass every call through a [`RateLimiter`].

use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::rate_limit::RateLimiter;
use crate::error::{ApiErrorBody, CoreError, Result};

/// A REST client for the upstream broker API, rate-limited and
/// token-agnostic (the caller supplies a fresh bearer token per call via
/// [`crate::auth::TokenLifecycle::ensure_fresh_token`]).
pub struct UpstreamRestClient {
    http: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl UpstreamRestClient {
    pub fn new(base_url: impl Into<String>, limiter: RateLimiter) -> Self {
        let http = reqwest::Client::builder()
            .default_headers(Self::default_headers())
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            limiter,
        }
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str, bearer: &str) -> Result<R> {
        self.limiter.acquire().await;
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let resp = self.http.get(&url).bearer_auth(bearer).send().await?;
        self.handle_response(resp).await
    }

    pub async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, bearer: &str, body: &B) -> Result<R> {
        self.limiter.acquire().await;
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        let resp = self.http.post(&url).bearer_auth(bearer).json(body).send().await?;
        self.handle_response(resp).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    async fn handle_response<R: DeserializeOwned>(&self, resp: reqwest::Response) -> Result<R> {
        let status = resp.status();
        let bytes = resp.bytes().await.unwrap_or_default();
        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(CoreError::Json)
        } else {
            let body = String::from_utf8_lossy(&bytes);
            Err(Self::parse_error_body(status, &body))
        }
    }

    fn parse_error_body(status: reqwest::StatusCode, body: &str) -> CoreError {
        if let Ok(api_err) = serde_json::from_str::<ApiErrorBody>(body) {
            if api_err.error_code.is_some() || api_err.error_message.is_some() {
                return CoreError::Api(api_err);
            }
        }
        CoreError::HttpStatus {
            status,
            body: body.to_owned(),
        }
    }
}
