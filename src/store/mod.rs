//! Relational persistence for the ingestion core.
//!
//! `PersistentStore` is the seam between the decode/flush pipeline and
//! Postgres, grounded on the original's `axiom/db` session-scoped repository
//! functions (`db/crud.py`-style bulk inserts, `db/models/_partitions.py`'s
//! `ensure_partition_for_timestamp`, and the subscription-table reads in
//! `mdata/differ.py`). Kept as a trait so the flush workers and differ can be
//! exercised against a fake in tests without a live database.

pub mod cache;
pub mod partitions;
pub mod pg;
pub mod secret;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use uuid::Uuid;

use crate::entities::{Book, ChartCandle, LevelOneSample, LevelTwoSample, StreamType};
use crate::error::Result;

pub use pg::PgStore;
pub use secret::{token_secret_name, InMemorySecretStore, SecretStore, VaultSecretStore};

/// The full desired-subscription state for one owner, as read from
/// `stream_subscriptions`. Level-2 symbols are grouped by book since a
/// symbol can be desired on more than one book at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet {
    pub quotes: BTreeSet<String>,
    pub level2: HashMap<Book, BTreeSet<String>>,
    pub ohlcv: BTreeSet<String>,
}

impl DesiredSet {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty() && self.ohlcv.is_empty() && self.level2.values().all(|s| s.is_empty())
    }
}

/// Result of an upsert against a table keyed by a natural key rather than a
/// surrogate id (charts), distinguishing fresh rows from updated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: u64,
    pub updated: u64,
}

/// The persistence seam used by the flush workers, the differ, and the auth
/// module. One implementation (`PgStore`) backs production; tests use a
/// hand-rolled fake.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Resolve a batch of canonical symbols to security ids. Symbols with no
    /// matching active security are simply absent from the result map; the
    /// caller is expected to drop rows it can't resolve (spec.md §4 edge
    /// case: "Unknown symbol").
    async fn resolve_security_ids(&self, symbols: &[String]) -> Result<HashMap<String, Uuid>>;

    /// Bulk-insert Level-1 samples, returning the number of rows inserted.
    /// Callers must `ensure_partition` for the batch's day(s) first.
    async fn insert_level_one(&self, rows: &[LevelOneSample]) -> Result<u64>;

    /// Bulk-insert Level-2 samples, returning the number of rows inserted.
    async fn insert_level_two(&self, rows: &[LevelTwoSample]) -> Result<u64>;

    /// Upsert OHLCV candles keyed by `(security_id, timestamp, timeframe)`.
    async fn upsert_charts(&self, rows: &[ChartCandle]) -> Result<UpsertOutcome>;

    /// Ensure the partition covering `ts` exists for `base_table`.
    async fn ensure_partition(&self, base_table: &str, ts: chrono::DateTime<chrono::Utc>) -> Result<()>;

    /// Load every active subscription for `owner_id`, grouped by stream type.
    async fn load_desired_subscriptions(&self, owner_id: Uuid) -> Result<DesiredSet>;

    /// Flip `is_active` for every subscription matching the given
    /// `(user, stream_type, book, symbol)` tuples. Used by the differ in
    /// incremental mode to record what's currently applied, and by the
    /// out-of-scope admin surface to toggle desire; exposed here because the
    /// differ needs to write back reconciliation outcomes.
    async fn set_subscription_active(
        &self,
        user_id: Uuid,
        stream_type: StreamType,
        book: Option<Book>,
        symbols: &[String],
        active: bool,
    ) -> Result<u64>;

    /// Record a freshly minted anti-CSRF OAuth state nonce for `user_id`.
    async fn upsert_oauth_state(&self, user_id: Uuid, state: &str) -> Result<()>;

    /// Atomically consume (read-and-delete) an OAuth state, returning the
    /// owning user id if the state existed and had not expired.
    async fn consume_oauth_state(&self, state: &str) -> Result<Option<Uuid>>;
}
