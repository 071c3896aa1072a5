//! Upstream broker connectivity: the REST client, the streaming session,
//! and the shared rate limiter.

pub mod rate_limit;
pub mod rest;
pub mod stream;

pub use rate_limit::RateLimiter;
pub use rest::UpstreamRestClient;
pub use stream::{StreamFrame, StreamingSession, WsStreamingSession};
