//! Postgres-backed `PersistentStore`.
//!
//! Grounded on the original's SQLAlchemy bulk-insert/upsert helpers in
//! `axiom/db`, reworked as explicit `sqlx::query` calls (no ORM is attested
//! anywhere in the example pack; `sqlx` raw queries are the pattern every
//! database-touching example repo uses instead).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use super::cache::BoundedCache;
use super::partitions::PartitionCache;
use super::{DesiredSet, PersistentStore, UpsertOutcome};
use crate::constants::cache::SECURITY_ID_CACHE_CAPACITY;
use crate::entities::{Book, ChartCandle, LevelOneSample, LevelTwoSample, OrderSide, StreamType};
use crate::error::Result;

pub struct PgStore {
    pool: PgPool,
    partitions: PartitionCache,
    security_ids: Mutex<BoundedCache<String, Uuid>>,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            partitions: PartitionCache::new(),
            security_ids: Mutex::new(BoundedCache::new(SECURITY_ID_CACHE_CAPACITY)),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl PersistentStore for PgStore {
    async fn resolve_security_ids(&self, symbols: &[String]) -> Result<HashMap<String, Uuid>> {
        let mut resolved = HashMap::with_capacity(symbols.len());
        let mut misses = Vec::new();
        {
            let cache = self.security_ids.lock();
            for symbol in symbols {
                match cache.get(symbol) {
                    Some(id) => {
                        resolved.insert(symbol.clone(), id);
                    }
                    None => misses.push(symbol.clone()),
                }
            }
        }
        if misses.is_empty() {
            return Ok(resolved);
        }

        let rows: Vec<(String, Uuid)> = sqlx::query_as(
            "SELECT symbol, id FROM securities WHERE symbol = ANY($1) AND is_active = true",
        )
        .bind(&misses)
        .fetch_all(&self.pool)
        .await?;

        let mut cache = self.security_ids.lock();
        for (symbol, id) in rows {
            cache.insert(symbol.clone(), id);
            resolved.insert(symbol, id);
        }
        Ok(resolved)
    }

    async fn insert_level_one(&self, rows: &[LevelOneSample]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for row in rows {
            let result = sqlx::query(
                "INSERT INTO level_one_samples (
                    security_id, timestamp, bid_price, bid_size, ask_price, ask_size,
                    last_price, last_size, mark_price, daily_high, daily_low, daily_open,
                    prev_close, daily_volume, net_change_pct, security_status,
                    quote_time, trade_time, is_realtime
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19)",
            )
            .bind(row.security_id)
            .bind(row.timestamp)
            .bind(row.bid_price)
            .bind(row.bid_size)
            .bind(row.ask_price)
            .bind(row.ask_size)
            .bind(row.last_price)
            .bind(row.last_size)
            .bind(row.mark_price)
            .bind(row.daily_high)
            .bind(row.daily_low)
            .bind(row.daily_open)
            .bind(row.prev_close)
            .bind(row.daily_volume)
            .bind(row.net_change_pct)
            .bind(row.security_status)
            .bind(row.quote_time)
            .bind(row.trade_time)
            .bind(row.is_realtime)
            .execute(&self.pool)
            .await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    async fn insert_level_two(&self, rows: &[LevelTwoSample]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut affected = 0u64;
        for row in rows {
            let side: &str = match row.side {
                OrderSide::Bid => "BID",
                OrderSide::Ask => "ASK",
            };
            let result = sqlx::query(
                "INSERT INTO level_two_samples (
                    security_id, timestamp, side, price_level, size, order_count,
                    level_index, market_maker_id, mic_id, quote_time
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                ON CONFLICT (security_id, timestamp, side, price_level) DO NOTHING",
            )
            .bind(row.security_id)
            .bind(row.timestamp)
            .bind(side)
            .bind(row.price_level)
            .bind(row.size)
            .bind(row.order_count)
            .bind(row.level_index)
            .bind(&row.market_maker_id)
            .bind(&row.mic_id)
            .bind(row.quote_time)
            .execute(&self.pool)
            .await?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }

    async fn upsert_charts(&self, rows: &[ChartCandle]) -> Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();
        for row in rows {
            let result = sqlx::query(
                "INSERT INTO chart_candles (
                    id, security_id, timestamp, timeframe, open_price, high_price,
                    low_price, close_price, volume, trade_count, vwap, is_regular_hours
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
                ON CONFLICT (security_id, timestamp, timeframe) DO UPDATE SET
                    open_price = EXCLUDED.open_price,
                    high_price = EXCLUDED.high_price,
                    low_price = EXCLUDED.low_price,
                    close_price = EXCLUDED.close_price,
                    volume = EXCLUDED.volume,
                    trade_count = EXCLUDED.trade_count,
                    vwap = EXCLUDED.vwap,
                    is_regular_hours = EXCLUDED.is_regular_hours
                RETURNING (xmax = 0) AS inserted",
            )
            .bind(row.id)
            .bind(row.security_id)
            .bind(row.timestamp)
            .bind(row.timeframe)
            .bind(row.open_price)
            .bind(row.high_price)
            .bind(row.low_price)
            .bind(row.close_price)
            .bind(row.volume)
            .bind(row.trade_count)
            .bind(row.vwap)
            .bind(row.is_regular_hours)
            .fetch_one(&self.pool)
            .await?;
            let inserted: bool = result.get("inserted");
            if inserted {
                outcome.inserted += 1;
            } else {
                outcome.updated += 1;
            }
        }
        Ok(outcome)
    }

    async fn ensure_partition(&self, base_table: &str, ts: DateTime<Utc>) -> Result<()> {
        self.partitions.ensure_partition(&self.pool, base_table, ts).await
    }

    async fn load_desired_subscriptions(&self, owner_id: Uuid) -> Result<DesiredSet> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT symbol, stream_type, book FROM stream_subscriptions
             WHERE user_id = $1 AND is_active = true",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut desired = DesiredSet::default();
        for (symbol, stream_type, book) in rows {
            let symbol = symbol.to_ascii_uppercase();
            match stream_type.as_str() {
                "level2" => {
                    let book = book
                        .as_deref()
                        .map(Book::parse_or_default)
                        .unwrap_or(Book::Nasdaq);
                    desired.level2.entry(book).or_default().insert(symbol);
                }
                "ohlcv" => {
                    desired.ohlcv.insert(symbol);
                }
                _ => {
                    desired.quotes.insert(symbol);
                }
            }
        }
        Ok(desired)
    }

    async fn set_subscription_active(
        &self,
        user_id: Uuid,
        stream_type: StreamType,
        book: Option<Book>,
        symbols: &[String],
        active: bool,
    ) -> Result<u64> {
        if symbols.is_empty() {
            return Ok(0);
        }
        let book_str = book.map(Book::as_str);
        let result = sqlx::query(
            "UPDATE stream_subscriptions SET is_active = $1
             WHERE user_id = $2 AND stream_type = $3
               AND symbol = ANY($4)
               AND ($5::text IS NULL OR book = $5)",
        )
        .bind(active)
        .bind(user_id)
        .bind(stream_type.as_str())
        .bind(symbols)
        .bind(book_str)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_oauth_state(&self, user_id: Uuid, state: &str) -> Result<()> {
        // `user_id` is unique; a second mint for the same owner replaces the
        // prior state in one round-trip rather than raising a conflict.
        sqlx::query(
            "INSERT INTO oauth_states (id, user_id, state, created_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id) DO UPDATE SET
                state = EXCLUDED.state,
                created_at = EXCLUDED.created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(state)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_oauth_state(&self, state: &str) -> Result<Option<Uuid>> {
        let row: Option<(Uuid, DateTime<Utc>)> =
            sqlx::query_as("DELETE FROM oauth_states WHERE state = $1 RETURNING user_id, created_at")
                .bind(state)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((user_id, created_at)) => {
                let ttl = chrono::Duration::seconds(crate::entities::oauth::OAUTH_STATE_TTL_SECS);
                if Utc::now() - created_at > ttl {
                    Ok(None)
                } else {
                    Ok(Some(user_id))
                }
            }
            None => Ok(None),
        }
    }
}
