//! Generic bounded batcher ("Beque"): buffers items behind a bounded
//! channel and flushes them either once a size threshold is hit or once a
//! maximum delay has elapsed since the last flush, whichever comes first.
//!
//! Grounded on `axiom/lib/beque.py`'s usage in `streaming.py` (`Beque(
//! max_batch_size=..., flush_interval=..., on_flush=..., name=...)`,
//! `.add()`, `.stop()`, `.stats`) — the Python implementation itself isn't
//! in the retrieved source, so the configuration knobs and lifecycle are
//! taken from how every call site uses it.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::Result;

/// Point-in-time counters for one batcher, exposed for diagnostics.
#[derive(Debug, Default)]
pub struct BequeStats {
    pub enqueued: AtomicU64,
    pub flushed: AtomicU64,
    pub flush_count: AtomicU64,
    pub flush_errors: AtomicU64,
    last_flush_ms: AtomicI64,
}

/// A snapshot of [`BequeStats`] plus the queue/task state at one instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct BequeStatsSnapshot {
    pub enqueued: u64,
    pub flushed: u64,
    pub flush_count: u64,
    pub flush_errors: u64,
    /// Items currently buffered in the channel, awaiting a flush.
    pub queue_size: usize,
    /// Seconds since the last flush attempt, or `None` if none has run yet.
    pub seconds_since_last_flush: Option<i64>,
    /// Whether the background consumer task is still accepting items.
    pub is_running: bool,
}

impl BequeStats {
    fn snapshot(&self) -> BequeStatsSnapshot {
        let last_flush_ms = self.last_flush_ms.load(Ordering::Relaxed);
        BequeStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            flush_count: self.flush_count.load(Ordering::Relaxed),
            flush_errors: self.flush_errors.load(Ordering::Relaxed),
            queue_size: 0,
            seconds_since_last_flush: if last_flush_ms == 0 {
                None
            } else {
                Some((Utc::now().timestamp_millis() - last_flush_ms) / 1000)
            },
            is_running: false,
        }
    }
}

type FlushFn<T> = Arc<dyn Fn(Vec<T>) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// A bounded batcher over items of type `T`. `add` backpressures (awaits)
/// once the channel is full rather than growing unbounded.
pub struct Beque<T: Send + 'static> {
    name: String,
    tx: Option<mpsc::Sender<T>>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<BequeStats>,
}

impl<T: Send + 'static> Beque<T> {
    /// Start a batcher. `max_batch_size` items or `flush_interval` elapsed,
    /// whichever comes first, triggers a call to `on_flush` with the
    /// accumulated batch. The channel capacity is
    /// `max_batch_size * DEFAULT_QUEUE_CAPACITY_MULTIPLIER`.
    pub fn start<F, Fut>(name: impl Into<String>, max_batch_size: usize, flush_interval: Duration, on_flush: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let capacity = max_batch_size.saturating_mul(crate::constants::beque::DEFAULT_QUEUE_CAPACITY_MULTIPLIER).max(1);
        let (tx, rx) = mpsc::channel(capacity);
        let stats = Arc::new(BequeStats::default());
        let flush_fn: FlushFn<T> = Arc::new(move |batch| Box::pin(on_flush(batch)));

        let handle = tokio::spawn(Self::run(
            name.clone(),
            rx,
            max_batch_size,
            flush_interval,
            flush_fn,
            stats.clone(),
        ));

        Self {
            name,
            tx: Some(tx),
            handle: Some(handle),
            stats,
        }
    }

    /// Enqueue one item, backpressuring if the channel is full.
    pub async fn add(&self, item: T) -> Result<()> {
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| crate::error::CoreError::Storage(format!("{} batcher is shut down", self.name)))?;
        tx.send(item)
            .await
            .map_err(|_| crate::error::CoreError::Storage(format!("{} batcher is shut down", self.name)))
    }

    /// A point-in-time snapshot of this batcher's counters, current queue
    /// depth, and whether it's still accepting items.
    pub fn stats(&self) -> BequeStatsSnapshot {
        let mut snapshot = self.stats.snapshot();
        if let Some(tx) = &self.tx {
            snapshot.queue_size = tx.max_capacity() - tx.capacity();
            snapshot.is_running = true;
        }
        snapshot
    }

    /// Stop accepting new items, flush whatever remains, and await the
    /// background task's completion.
    pub async fn stop(mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    async fn run(
        name: String,
        mut rx: mpsc::Receiver<T>,
        max_batch_size: usize,
        flush_interval: Duration,
        on_flush: FlushFn<T>,
        stats: Arc<BequeStats>,
    ) {
        let mut buffer = Vec::with_capacity(max_batch_size);
        let mut ticker = interval(flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; consume it up front

        loop {
            tokio::select! {
                biased;

                item = rx.recv() => {
                    match item {
                        Some(item) => {
                            buffer.push(item);
                            if buffer.len() >= max_batch_size {
                                Self::flush(&name, &mut buffer, &on_flush, &stats).await;
                            }
                        }
                        None => {
                            Self::flush(&name, &mut buffer, &on_flush, &stats).await;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    Self::flush(&name, &mut buffer, &on_flush, &stats).await;
                }
            }
        }
    }

    async fn flush(name: &str, buffer: &mut Vec<T>, on_flush: &FlushFn<T>, stats: &Arc<BequeStats>) {
        if buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(buffer);
        let len = batch.len() as u64;
        stats.last_flush_ms.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        match on_flush(batch).await {
            Ok(()) => {
                stats.flushed.fetch_add(len, Ordering::Relaxed);
                stats.flush_count.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                stats.flush_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(batcher = name, error = %err, batch_size = len, "flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Duration as TokioDuration;

    #[tokio::test]
    async fn flushes_once_size_threshold_hit() {
        let flushed: Arc<Mutex<Vec<Vec<i32>>>> = Arc::new(Mutex::new(Vec::new()));
        let flushed_clone = flushed.clone();
        let beque = Beque::start("test", 3, TokioDuration::from_secs(60), move |batch| {
            let flushed = flushed_clone.clone();
            async move {
                flushed.lock().unwrap().push(batch);
                Ok(())
            }
        });

        for i in 0..3 {
            beque.add(i).await.unwrap();
        }
        tokio::time::sleep(TokioDuration::from_millis(50)).await;
        assert_eq!(flushed.lock().unwrap().len(), 1);
        assert_eq!(flushed.lock().unwrap()[0], vec![0, 1, 2]);
        beque.stop().await;
    }

    #[tokio::test]
    async fn flushes_remaining_items_on_stop() {
        let flushed: Arc<Mutex<Vec<Vec<i32>>>> = Arc::new(Mutex::new(Vec::new()));
        let flushed_clone = flushed.clone();
        let beque = Beque::start("test", 100, TokioDuration::from_secs(60), move |batch| {
            let flushed = flushed_clone.clone();
            async move {
                flushed.lock().unwrap().push(batch);
                Ok(())
            }
        });

        beque.add(1).await.unwrap();
        beque.add(2).await.unwrap();
        beque.stop().await;

        assert_eq!(flushed.lock().unwrap().len(), 1);
        assert_eq!(flushed.lock().unwrap()[0], vec![1, 2]);
    }
}
