//! Subscription reconciliation: compares the DB-held desired subscription
//! set against what was last applied to the wire, and produces a plan the
//! supervisor turns into subscribe/unsubscribe calls.
//!
//! Grounded on `axiom/mdata/subscriptions.py`'s role in `streaming.py`
//! (`list_symbols`, `add_symbols`, `remove_symbols` feeding
//! `start_quotes`/`add_symbols`/`remove_symbols` on the stream). Two modes:
//! full-resubscribe (default, atomic — every poll resends the complete
//! desired set) and incremental (send only the delta).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::Book;
use crate::error::Result;
use crate::store::{DesiredSet, PersistentStore};

/// The subscribe/unsubscribe work one reconciliation pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub full_resubscribe: bool,
    pub desired: DesiredSet,
    pub quotes_added: Vec<String>,
    pub quotes_removed: Vec<String>,
    pub level2_added: HashMap<Book, Vec<String>>,
    pub level2_removed: HashMap<Book, Vec<String>>,
    pub ohlcv_added: Vec<String>,
    pub ohlcv_removed: Vec<String>,
}

impl ReconcilePlan {
    fn is_noop(&self) -> bool {
        !self.full_resubscribe
            && self.quotes_added.is_empty()
            && self.quotes_removed.is_empty()
            && self.level2_added.values().all(|v| v.is_empty())
            && self.level2_removed.values().all(|v| v.is_empty())
            && self.ohlcv_added.is_empty()
            && self.ohlcv_removed.is_empty()
    }
}

/// Periodically diffs an owner's desired subscriptions against what was
/// last applied.
pub struct SubscriptionDiffer<P: PersistentStore + ?Sized> {
    store: Arc<P>,
    owner_id: Uuid,
    incremental: bool,
    last_applied: Mutex<DesiredSet>,
}

impl<P: PersistentStore + ?Sized> SubscriptionDiffer<P> {
    pub fn new(store: Arc<P>, owner_id: Uuid) -> Self {
        Self {
            store,
            owner_id,
            incremental: false,
            last_applied: Mutex::new(DesiredSet::default()),
        }
    }

    /// Switch to incremental reconciliation (send only the delta each poll)
    /// instead of the default full-resubscribe.
    pub fn incremental(mut self, enabled: bool) -> Self {
        self.incremental = enabled;
        self
    }

    /// Load the current desired set and diff it against what was last
    /// applied. Returns `None` if nothing changed since the last poll.
    pub async fn poll(&self) -> Result<Option<ReconcilePlan>> {
        let desired = self.store.load_desired_subscriptions(self.owner_id).await?;
        let mut last_applied = self.last_applied.lock().await;

        if desired == *last_applied {
            return Ok(None);
        }

        let plan = if self.incremental {
            diff(&last_applied, &desired)
        } else {
            ReconcilePlan {
                full_resubscribe: true,
                desired: desired.clone(),
                ..Default::default()
            }
        };

        *last_applied = desired;

        if plan.is_noop() {
            Ok(None)
        } else {
            Ok(Some(plan))
        }
    }
}

fn diff(old: &DesiredSet, new: &DesiredSet) -> ReconcilePlan {
    let quotes_added = new.quotes.difference(&old.quotes).cloned().collect();
    let quotes_removed = old.quotes.difference(&new.quotes).cloned().collect();
    let ohlcv_added = new.ohlcv.difference(&old.ohlcv).cloned().collect();
    let ohlcv_removed = old.ohlcv.difference(&new.ohlcv).cloned().collect();

    let mut level2_added = HashMap::new();
    let mut level2_removed = HashMap::new();
    for book in [Book::Nasdaq, Book::Nyse] {
        let empty = Default::default();
        let old_set = old.level2.get(&book).unwrap_or(&empty);
        let new_set = new.level2.get(&book).unwrap_or(&empty);
        level2_added.insert(book, new_set.difference(old_set).cloned().collect());
        level2_removed.insert(book, old_set.difference(new_set).cloned().collect());
    }

    ReconcilePlan {
        full_resubscribe: false,
        desired: new.clone(),
        quotes_added,
        quotes_removed,
        level2_added,
        level2_removed,
        ohlcv_added,
        ohlcv_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex as StdMutex;

    struct FakeStore {
        desired: StdMutex<DesiredSet>,
    }

    #[async_trait]
    impl PersistentStore for FakeStore {
        async fn resolve_security_ids(&self, _symbols: &[String]) -> Result<HashMap<String, Uuid>> {
            Ok(HashMap::new())
        }
        async fn insert_level_one(&self, _rows: &[crate::entities::LevelOneSample]) -> Result<u64> {
            Ok(0)
        }
        async fn insert_level_two(&self, _rows: &[crate::entities::LevelTwoSample]) -> Result<u64> {
            Ok(0)
        }
        async fn upsert_charts(&self, _rows: &[crate::entities::ChartCandle]) -> Result<crate::store::UpsertOutcome> {
            Ok(Default::default())
        }
        async fn ensure_partition(&self, _base_table: &str, _ts: chrono::DateTime<chrono::Utc>) -> Result<()> {
            Ok(())
        }
        async fn load_desired_subscriptions(&self, _owner_id: Uuid) -> Result<DesiredSet> {
            Ok(self.desired.lock().unwrap().clone())
        }
        async fn set_subscription_active(
            &self,
            _user_id: Uuid,
            _stream_type: crate::entities::StreamType,
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

    #[tokio::test]
    async fn second_poll_with_unchanged_desired_set_is_a_noop() {
        let store = Arc::new(FakeStore {
            desired: StdMutex::new(DesiredSet {
                quotes: BTreeSet::from(["AAPL".to_string()]),
                ..Default::default()
            }),
        });
        let differ = SubscriptionDiffer::new(store, Uuid::nil());

        let first = differ.poll().await.unwrap();
        assert!(first.is_some());
        assert!(first.unwrap().full_resubscribe);

        let second = differ.poll().await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn incremental_mode_reports_only_the_delta() {
        let store = Arc::new(FakeStore {
            desired: StdMutex::new(DesiredSet {
                quotes: BTreeSet::from(["AAPL".to_string()]),
                ..Default::default()
            }),
        });
        let differ = SubscriptionDiffer::new(store.clone(), Uuid::nil()).incremental(true);
        differ.poll().await.unwrap();

        *store.desired.lock().unwrap() = DesiredSet {
            quotes: BTreeSet::from(["AAPL".to_string(), "MSFT".to_string()]),
            ..Default::default()
        };
        let plan = differ.poll().await.unwrap().unwrap();
        assert!(!plan.full_resubscribe);
        assert_eq!(plan.quotes_added, vec!["MSFT".to_string()]);
        assert!(plan.quotes_removed.is_empty());
    }
}
