//! Level-1 flush: resolve symbols, scale prices, enforce invariants, write.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `_flush_level_one`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::decode::l1::RawLevelOne;
use crate::entities::{enums::SecurityStatus, security::now_utc, LevelOneSample, Price};
use crate::error::Result;
use crate::store::PersistentStore;

const TABLE: &str = "level_one_samples";

/// Convert and persist one L1 batch, dropping rows whose symbol doesn't
/// resolve to a known security and logging how many were dropped (the
/// original logs `Missing security IDs for symbols: [...]` at warn level).
pub async fn flush(store: &Arc<dyn PersistentStore>, batch: Vec<RawLevelOne>) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let symbols: Vec<String> = batch.iter().map(|b| b.symbol.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let resolved = store.resolve_security_ids(&symbols).await?;
    let missing: Vec<&String> = symbols.iter().filter(|s| !resolved.contains_key(*s)).collect();
    if !missing.is_empty() {
        tracing::warn!(symbols = ?missing, "missing security ids for L1 symbols");
    }

    let now = now_utc();
    let mut rows = Vec::with_capacity(batch.len());
    for raw in batch {
        let Some(security_id) = resolved.get(&raw.symbol).copied() else {
            continue;
        };
        let sample = LevelOneSample {
            security_id,
            timestamp: now,
            bid_price: raw.bid_price.and_then(Price::from_f64).map(Price::scaled),
            bid_size: raw.bid_size.map(|v| v as i64),
            ask_price: raw.ask_price.and_then(Price::from_f64).map(Price::scaled),
            ask_size: raw.ask_size.map(|v| v as i64),
            last_price: raw.last_price.and_then(Price::from_f64).map(Price::scaled),
            last_size: raw.last_size.map(|v| v as i64),
            mark_price: raw.mark_price.and_then(Price::from_f64).map(Price::scaled),
            daily_high: raw.daily_high.and_then(Price::from_f64).map(Price::scaled),
            daily_low: raw.daily_low.and_then(Price::from_f64).map(Price::scaled),
            daily_open: raw.daily_open.and_then(Price::from_f64).map(Price::scaled),
            prev_close: raw.prev_close.and_then(Price::from_f64).map(Price::scaled),
            daily_volume: raw.daily_volume.map(|v| v as i64),
            net_change_pct: raw.net_change_pct,
            security_status: raw.security_status.as_deref().and_then(parse_status),
            quote_time: raw.quote_time,
            trade_time: raw.trade_time,
            is_realtime: raw.is_realtime,
        };
        if sample.satisfies_invariants() {
            rows.push(sample);
        }
    }

    if rows.is_empty() {
        tracing::warn!("no valid L1 rows produced from batch");
        return Ok(0);
    }

    store.ensure_partition(TABLE, now).await?;
    let inserted = store.insert_level_one(&rows).await?;
    tracing::info!(count = inserted, "L1 batch flushed");
    Ok(inserted)
}

fn parse_status(raw: &str) -> Option<SecurityStatus> {
    match raw.to_ascii_uppercase().as_str() {
        "NORMAL" => Some(SecurityStatus::Normal),
        "HALTED" => Some(SecurityStatus::Halted),
        "CLOSED" => Some(SecurityStatus::Closed),
        "SUSPENDED" => Some(SecurityStatus::Suspended),
        _ => None,
    }
}
