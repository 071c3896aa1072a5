//! Chart flush: resolve symbols, scale prices, dedupe by natural key, upsert.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `_flush_charts`, including its
//! "last write wins" dedup-by-key behavior when a batch contains more than
//! one candle for the same `(security, timestamp, timeframe)`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use uuid::Uuid;

use crate::decode::chart::RawChart;
use crate::entities::{ChartCandle, Price};
use crate::error::Result;
use crate::store::{PersistentStore, UpsertOutcome};

const TABLE: &str = "chart_candles";

pub async fn flush(store: &Arc<dyn PersistentStore>, batch: Vec<RawChart>) -> Result<UpsertOutcome> {
    if batch.is_empty() {
        return Ok(UpsertOutcome::default());
    }

    let symbols: Vec<String> = batch.iter().map(|b| b.symbol.clone()).collect::<BTreeSet<_>>().into_iter().collect();
    let resolved = store.resolve_security_ids(&symbols).await?;
    let missing: Vec<&String> = symbols.iter().filter(|s| !resolved.contains_key(*s)).collect();
    if !missing.is_empty() {
        tracing::warn!(symbols = ?missing, "missing security ids for chart symbols");
    }

    let mut normalized: HashMap<(Uuid, chrono::DateTime<chrono::Utc>, crate::entities::Timeframe), ChartCandle> =
        HashMap::new();
    let mut skipped = 0u64;

    for raw in batch {
        let Some(security_id) = resolved.get(&raw.symbol).copied() else {
            skipped += 1;
            continue;
        };

        let open_price = raw.open_price.and_then(Price::from_f64).map(Price::scaled);
        let high_price = raw.high_price.and_then(Price::from_f64).map(Price::scaled);
        let low_price = raw.low_price.and_then(Price::from_f64).map(Price::scaled);
        let close_price = raw.close_price.and_then(Price::from_f64).map(Price::scaled);

        let (Some(open_price), Some(high_price), Some(low_price), Some(close_price)) =
            (open_price, high_price, low_price, close_price)
        else {
            skipped += 1;
            continue;
        };

        let volume = raw.volume.map(|v| v as i64).filter(|v| *v >= 0).unwrap_or(0);

        let candle = ChartCandle {
            id: Uuid::new_v4(),
            security_id,
            timestamp: raw.timestamp,
            timeframe: raw.timeframe,
            open_price,
            high_price,
            low_price,
            close_price,
            volume,
            trade_count: raw.trade_count.map(|v| v as i64),
            vwap: raw.vwap.and_then(Price::from_f64).map(Price::scaled),
            is_regular_hours: true,
        };

        if !candle.satisfies_invariants() {
            skipped += 1;
            continue;
        }

        normalized.insert(candle.key(), candle);
    }

    if normalized.is_empty() {
        tracing::warn!(skipped, "no valid chart rows produced from batch");
        return Ok(UpsertOutcome::default());
    }

    let rows: Vec<ChartCandle> = normalized.into_values().collect();
    let days: BTreeSet<chrono::NaiveDate> = rows.iter().map(|r| r.timestamp.date_naive()).collect();
    for day in days {
        let ts = day.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc();
        store.ensure_partition(TABLE, ts).await?;
    }
    let outcome = store.upsert_charts(&rows).await?;
    tracing::info!(inserted = outcome.inserted, updated = outcome.updated, skipped, "chart batch flushed");
    Ok(outcome)
}
