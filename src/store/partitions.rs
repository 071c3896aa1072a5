//! On-demand partition management.
//!
//! Grounded on the original `axiom/db/models/_partitions.py`, which ensures
//! a `DEFAULT` partition and a daily partition exist before any insert that
//! touches a new day, using idempotent `CREATE TABLE IF NOT EXISTS ...
//! PARTITION OF` DDL and a process-local cache so the DDL itself runs at
//! most once per `(table, day)` pair per process — the ORM-event trigger in
//! the original becomes an explicit call from each flush worker here (see
//! design note on partition creation).

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use sqlx::PgPool;

use crate::error::Result;

/// Tracks which partitions this process has already ensured exist, so
/// repeated calls for the same day are a cache hit rather than a DDL call.
pub struct PartitionCache {
    ensured_default: Mutex<HashSet<String>>,
    ensured_day: Mutex<HashSet<(String, NaiveDate)>>,
}

impl PartitionCache {
    pub fn new() -> Self {
        Self {
            ensured_default: Mutex::new(HashSet::new()),
            ensured_day: Mutex::new(HashSet::new()),
        }
    }

    /// Ensure the `DEFAULT` and daily partitions for `base_table` exist for
    /// the UTC day containing `ts`. Idempotent: DDL executes at most once
    /// per process for a given `(base_table, day)`.
    pub async fn ensure_partition(
        &self,
        pool: &PgPool,
        base_table: &str,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        if !self.ensured_default.lock().contains(base_table) {
            let ddl = format!(
                "CREATE TABLE IF NOT EXISTS \"{base_table}_default\" PARTITION OF \"{base_table}\" DEFAULT"
            );
            sqlx::query(&ddl).execute(pool).await?;
            self.ensured_default.lock().insert(base_table.to_string());
        }

        let day = ts.date_naive();
        let key = (base_table.to_string(), day);
        if self.ensured_day.lock().contains(&key) {
            return Ok(());
        }

        let day_start = day.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let day_end = day_start + Duration::days(1);
        let part_name = format!(
            "{base_table}_{:04}_{:02}_{:02}",
            day.format("%Y").to_string().parse::<i32>().unwrap_or(0),
            day.format("%m").to_string().parse::<u32>().unwrap_or(0),
            day.format("%d").to_string().parse::<u32>().unwrap_or(0),
        );
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{part_name}\" PARTITION OF \"{base_table}\" FOR VALUES FROM ('{day_start}') TO ('{day_end}')"
        );
        sqlx::query(&ddl).execute(pool).await?;
        self.ensured_day.lock().insert(key);
        Ok(())
    }
}

impl Default for PartitionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_starts_empty() {
        let cache = PartitionCache::new();
        assert!(cache.ensured_default.lock().is_empty());
        assert!(cache.ensured_day.lock().is_empty());
    }
}
