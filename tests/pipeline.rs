//! Integration test exercising the decode → flush pipeline end to end
//! against an in-memory `PersistentStore` fake, without a live database.
//!
//! Mirrors the teacher's `tests/sandbox.rs` convention of one integration
//! file per concern, but swaps the "skip without real credentials" pattern
//! for a fake since this crate's integration surface is the store, not a
//! live broker (see `tests/store.rs` for the real-database counterpart).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use axiom_mdata_core::decode::{chart, l1, l2};
use axiom_mdata_core::entities::{Book, ChartCandle, LevelOneSample, LevelTwoSample, StreamType};
use axiom_mdata_core::error::Result;
use axiom_mdata_core::flush;
use axiom_mdata_core::store::{DesiredSet, PersistentStore, UpsertOutcome};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

#[derive(Default)]
struct FakeStore {
    securities: HashMap<String, Uuid>,
    l1_rows: Mutex<Vec<LevelOneSample>>,
    l2_rows: Mutex<Vec<LevelTwoSample>>,
    chart_rows: Mutex<Vec<ChartCandle>>,
}

#[async_trait]
impl PersistentStore for FakeStore {
    async fn resolve_security_ids(&self, symbols: &[String]) -> Result<HashMap<String, Uuid>> {
        Ok(symbols.iter().filter_map(|s| self.securities.get(s).map(|id| (s.clone(), *id))).collect())
    }

    async fn insert_level_one(&self, rows: &[LevelOneSample]) -> Result<u64> {
        self.l1_rows.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn insert_level_two(&self, rows: &[LevelTwoSample]) -> Result<u64> {
        self.l2_rows.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn upsert_charts(&self, rows: &[ChartCandle]) -> Result<UpsertOutcome> {
        self.chart_rows.lock().unwrap().extend_from_slice(rows);
        Ok(UpsertOutcome { inserted: rows.len() as u64, updated: 0 })
    }

    async fn ensure_partition(&self, _base_table: &str, _ts: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    async fn load_desired_subscriptions(&self, _owner_id: Uuid) -> Result<DesiredSet> {
        Ok(DesiredSet::default())
    }

    async fn set_subscription_active(
        &self,
        _user_id: Uuid,
        _stream_type: StreamType,
        _book: Option<Book>,
        _symbols: &[String],
        _active: bool,
    ) -> Result<u64> {
        Ok(0)
    }

    async fn upsert_oauth_state(&self, _user_id: Uuid, _state: &str) -> Result<()> {
        Ok(())
    }

    async fn consume_oauth_state(&self, _state: &str) -> Result<Option<Uuid>> {
        Ok(None)
    }
}

fn store_with(symbol: &str) -> std::sync::Arc<dyn PersistentStore> {
    let mut securities = HashMap::new();
    securities.insert(symbol.to_string(), Uuid::new_v4());
    std::sync::Arc::new(FakeStore { securities, ..Default::default() })
}

#[tokio::test]
async fn l1_frame_decodes_and_flushes_valid_rows() {
    let store = store_with("AAPL");
    let frame = json!({
        "data": [{
            "service": "LEVELONE_EQUITY",
            "content": [
                {"key": "AAPL", "BID_PRICE": 150.25, "ASK_PRICE": 150.30, "LAST_PRICE": 150.28},
                {"key": "UNKNOWN_SYMBOL", "BID_PRICE": 1.0, "ASK_PRICE": 2.0},
            ],
        }],
    });

    let batch = l1::decode_frame(&frame);
    assert_eq!(batch.len(), 2);

    let inserted = flush::l1::flush(&store, batch).await.unwrap();
    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn l1_inverted_book_is_dropped_by_invariant() {
    let store = store_with("MSFT");
    let frame = json!({
        "content": [{"key": "MSFT", "bidPrice": 200.0, "askPrice": 199.0}],
    });

    let batch = l1::decode_frame(&frame);
    let inserted = flush::l1::flush(&store, batch).await.unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn l2_frame_defaults_unrecognized_side_to_bid_and_drops_zero_size_rows() {
    let store = store_with("TSLA");
    let frame = json!({
        "content": [
            {"key": "TSLA", "side": "BID", "price": 250.0, "size": 100, "orderCount": 1},
            {"key": "TSLA", "side": "MID", "price": 250.0, "size": 100, "orderCount": 1},
            {"key": "TSLA", "side": "ASK", "price": 251.0, "size": 0, "orderCount": 1},
        ],
    });

    let batch = l2::decode_frame(&frame);
    assert_eq!(batch.len(), 3);

    // row 1 inserts as BID; row 2's unrecognized side decodes to `None` and
    // defaults to BID in the flush step; row 3 is dropped for zero size.
    let inserted = flush::l2::flush(&store, batch).await.unwrap();
    assert_eq!(inserted, 2);
}

#[tokio::test]
async fn chart_batch_dedupes_same_candle_last_write_wins() {
    let store = store_with("NVDA");
    let frame = json!({
        "content": [
            {"key": "NVDA", "timeframe": "1m", "openPrice": 10.0, "highPrice": 12.0, "lowPrice": 9.0, "closePrice": 11.0, "volume": 1000, "timestamp": 1_700_000_000},
            {"key": "NVDA", "timeframe": "1m", "openPrice": 10.0, "highPrice": 13.0, "lowPrice": 9.0, "closePrice": 11.5, "volume": 1200, "timestamp": 1_700_000_000},
        ],
    });

    let batch = chart::decode_frame(&frame);
    assert_eq!(batch.len(), 2);

    let outcome = flush::chart::flush(&store, batch).await.unwrap();
    assert_eq!(outcome.inserted, 1);
}
