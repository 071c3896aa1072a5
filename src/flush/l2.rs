//! Level-2 flush: resolve symbols, scale prices, enforce invariants, write.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `_flush_level_two`, including
//! its "enforce model constraints (>0) to avoid DB errors" skip logic.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::decode::l2::RawLevelTwo;
use crate::entities::{enums::OrderSide, security::now_utc, LevelTwoSample, Price};
use crate::error::Result;
use crate::store::PersistentStore;

const TABLE: &str = "level_two_samples";

pub async fn flush(store: &Arc<dyn PersistentStore>, batch: Vec<RawLevelTwo>) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let symbols: Vec<String> = batch.iter().map(|b| b.symbol.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let resolved = store.resolve_security_ids(&symbols).await?;
    let missing: Vec<&String> = symbols.iter().filter(|s| !resolved.contains_key(*s)).collect();
    if !missing.is_empty() {
        tracing::warn!(symbols = ?missing, "missing security ids for L2 symbols");
    }

    let now = now_utc();
    let mut rows = Vec::with_capacity(batch.len());
    let mut skipped = 0u64;
    for raw in batch {
        let Some(security_id) = resolved.get(&raw.symbol).copied() else {
            skipped += 1;
            continue;
        };
        let side = raw
            .side
            .as_deref()
            .and_then(OrderSide::parse)
            .unwrap_or(OrderSide::Bid);
        let price_level = raw.price_level.and_then(Price::from_f64).map(Price::scaled).unwrap_or(0);
        let size = raw.size.map(|v| v as i64).unwrap_or(0);

        let sample = LevelTwoSample {
            security_id,
            timestamp: now,
            side,
            price_level,
            size,
            order_count: raw.order_count,
            level_index: raw.level_index,
            market_maker_id: raw.market_maker_id,
            mic_id: raw.mic_id,
            quote_time: raw.quote_time,
        };
        if sample.satisfies_invariants() {
            rows.push(sample);
        } else {
            skipped += 1;
        }
    }

    if rows.is_empty() {
        tracing::warn!(skipped, "no valid L2 rows produced from batch");
        return Ok(0);
    }

    store.ensure_partition(TABLE, now).await?;
    let inserted = store.insert_level_two(&rows).await?;
    tracing::info!(count = inserted, skipped, "L2 batch flushed");
    Ok(inserted)
}
