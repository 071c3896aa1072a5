//! Wiring binary: loads configuration, connects to Postgres, ensures a
//! fresh upstream access token, and runs the streaming supervisor until a
//! fatal reconnect failure or a shutdown signal.
//!
//! # Usage
//!
//! ```sh
//! export API_URL=... APP_URL=... DB_URL=... ENVIRONMENT=production \
//!        OWNER_ID=... SCHWAB_API_KEY=... SCHWAB_APP_SECRET=... \
//!        SCHWAB_CALLBACK_URL=... SUPABASE_URL=... SUPABASE_SERVICE_ROLE_KEY=...
//! cargo run --bin axiom-mdata-core --features cli
//! ```

use std::sync::Arc;

use axiom_mdata_core::auth::TokenLifecycle;
use axiom_mdata_core::config::Config;
use axiom_mdata_core::constants::DEFAULT_STREAM_WS_URL;
use axiom_mdata_core::store::{PgStore, VaultSecretStore};
use axiom_mdata_core::supervisor::StreamingSupervisor;
use axiom_mdata_core::upstream::WsStreamingSession;

#[tokio::main]
async fn main() -> axiom_mdata_core::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = Arc::new(PgStore::connect(&config.db_url).await?);
    let secrets = Arc::new(VaultSecretStore::new(&config.supabase_url, "secret", &config.supabase_key));
    let auth = TokenLifecycle::new(&config, store.clone(), secrets);

    tracing::info!(owner_id = %config.owner_id, "refreshing upstream access token");
    let token = auth.ensure_fresh_token(config.owner_id).await?;

    let session = WsStreamingSession::new(DEFAULT_STREAM_WS_URL, token.access_token.clone());
    let mut supervisor = StreamingSupervisor::new(session, store, config.owner_id);

    tracing::info!("starting streaming supervisor");
    supervisor.run().await
}
