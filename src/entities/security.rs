//! Security and exchange reference data.
//!
//! These tables are owned by the external instrument-reference importer
//! (out of scope; spec.md §1) and are read-only from the core's
//! perspective — the core only resolves `symbol -> id`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enums::{AssetSubType, AssetType};

/// A tradable instrument, as imported by the (out-of-scope) securities
/// importer. Only the fields the ingestion core reads are modeled.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Security {
    pub id: Uuid,
    pub symbol: String,
    pub exchange_id: Uuid,
    pub asset_type: AssetType,
    pub asset_sub_type: Option<AssetSubType>,
    pub is_active: bool,
}

/// A trading venue. Read-only to the core.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Exchange {
    pub id: Uuid,
    pub code: String,
    pub mic_code: String,
    pub timezone: String,
    pub currency: String,
}

/// Minimal row shape used when resolving symbols to ids in bulk.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SecurityIdRow {
    pub symbol: String,
    pub id: Uuid,
}

/// Timestamp helper shared by every append-only sample table.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
