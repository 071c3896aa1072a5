//! Connection supervision: the state machine that owns one streaming
//! session, keeps its subscriptions reconciled against the desired set, and
//! reconnects with an exponential, weekday/weekend-aware backoff.
//!
//! Grounded on `axiom/mdata/streaming.py`'s `pump_messages_forever`,
//! `_reconnect`, and `stop`: the consecutive-error/consecutive-close
//! counters, the weekday vs. weekend backoff curves, and the
//! drain-batchers-then-logout shutdown sequence are all carried over from
//! there; `constants::reconnect` holds the numeric knobs.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveTime, Utc, Weekday};
use tokio::sync::Mutex;

use crate::beque::Beque;
use crate::constants::{beque as beque_consts, reconnect, DEFAULT_DIFFER_POLL_INTERVAL_SECS, WATCHDOG_INTERVAL_SECS, WATCHDOG_STALE_THRESHOLD_SECS};
use crate::decode::{chart as decode_chart, l1 as decode_l1, l2 as decode_l2};
use crate::differ::SubscriptionDiffer;
use crate::entities::{Book, StreamType};
use crate::error::Result;
use crate::flush;
use crate::store::PersistentStore;
use crate::upstream::{StreamFrame, StreamingSession};

/// Coarse connection lifecycle state, exposed to [`crate::diagnostics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    LoggingIn,
    Subscribing,
    Running,
    Reconnecting,
    Stopped,
}

/// Tracks the instant of the last inbound frame, in milliseconds since the
/// Unix epoch, plus a running message count, so the watchdog can detect
/// staleness and report throughput without a lock.
#[derive(Debug, Default)]
pub struct Watchdog {
    last_message_ms: AtomicI64,
    total_messages: AtomicU64,
}

impl Watchdog {
    pub(crate) fn touch(&self) {
        self.last_message_ms.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.total_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Seconds since the last inbound frame, or `None` if none has arrived yet.
    pub fn idle_seconds(&self) -> Option<i64> {
        let ms = self.last_message_ms.load(Ordering::Relaxed);
        if ms == 0 {
            return None;
        }
        Some((Utc::now().timestamp_millis() - ms) / 1000)
    }

    /// Total inbound frames observed since this watchdog was created.
    pub fn total_messages(&self) -> u64 {
        self.total_messages.load(Ordering::Relaxed)
    }

    /// The instant of the last inbound frame, or `None` if none has arrived yet.
    pub fn last_message_time(&self) -> Option<chrono::DateTime<Utc>> {
        let ms = self.last_message_ms.load(Ordering::Relaxed);
        if ms == 0 {
            return None;
        }
        chrono::DateTime::from_timestamp_millis(ms)
    }
}

/// Owns a streaming session plus its three flush batchers, and runs the
/// connect/login/subscribe/pump/reconnect loop until [`StreamingSupervisor::stop`]
/// is called.
pub struct StreamingSupervisor<Sess, P>
where
    Sess: StreamingSession,
    P: PersistentStore + 'static,
{
    session: Sess,
    store: Arc<P>,
    owner_id: uuid::Uuid,
    differ: SubscriptionDiffer<P>,
    state: Mutex<ConnectionState>,
    watchdog: Arc<Watchdog>,
    l1_beque: Beque<decode_l1::RawLevelOne>,
    l2_beque: Beque<decode_l2::RawLevelTwo>,
    chart_beque: Beque<decode_chart::RawChart>,
}

impl<Sess, P> StreamingSupervisor<Sess, P>
where
    Sess: StreamingSession,
    P: PersistentStore + 'static,
{
    pub fn new(session: Sess, store: Arc<P>, owner_id: uuid::Uuid) -> Self {
        let differ = SubscriptionDiffer::new(store.clone(), owner_id);

        let l1_store = store.clone();
        let l1_beque = Beque::start("l1", beque_consts::L1_MAX_BATCH_SIZE, beque_consts::L1_FLUSH_INTERVAL, move |batch| {
            let store = l1_store.clone();
            async move { flush::l1::flush(&(store as Arc<dyn PersistentStore>), batch).await.map(|_| ()) }
        });

        let l2_store = store.clone();
        let l2_beque = Beque::start("l2", beque_consts::L2_MAX_BATCH_SIZE, beque_consts::L2_FLUSH_INTERVAL, move |batch| {
            let store = l2_store.clone();
            async move { flush::l2::flush(&(store as Arc<dyn PersistentStore>), batch).await.map(|_| ()) }
        });

        let chart_store = store.clone();
        let chart_beque = Beque::start(
            "chart",
            beque_consts::CHART_MAX_BATCH_SIZE,
            beque_consts::CHART_FLUSH_INTERVAL,
            move |batch| {
                let store = chart_store.clone();
                async move { flush::chart::flush(&(store as Arc<dyn PersistentStore>), batch).await.map(|_| ()) }
            },
        );

        Self {
            session,
            store,
            owner_id,
            differ,
            state: Mutex::new(ConnectionState::Disconnected),
            watchdog: Arc::new(Watchdog::default()),
            l1_beque,
            l2_beque,
            chart_beque,
        }
    }

    pub fn watchdog(&self) -> Arc<Watchdog> {
        self.watchdog.clone()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.lock().await = state;
    }

    /// Run until a fatal error occurs (too many consecutive errors/closes)
    /// or the process is asked to shut down via [`StreamingSupervisor::stop`]'s
    /// caller dropping this future.
    pub async fn run(&mut self) -> Result<()> {
        let mut consecutive_errors: u32 = 0;
        let mut consecutive_closes: u32 = 0;

        loop {
            match self.connect_and_pump().await {
                Ok(()) => {
                    // connection closed cleanly (peer-initiated); treat as a close event.
                    consecutive_closes += 1;
                    consecutive_errors = 0;
                }
                Err(err) if err.is_connection_closed() => {
                    consecutive_closes += 1;
                    consecutive_errors = 0;
                    tracing::warn!(error = %err, "stream closed");
                }
                Err(err) => {
                    consecutive_errors += 1;
                    consecutive_closes = 0;
                    tracing::error!(error = %err, consecutive_errors, "stream error");
                }
            }

            if consecutive_errors >= reconnect::MAX_CONSECUTIVE_ERRORS {
                self.set_state(ConnectionState::Stopped).await;
                return Err(crate::error::CoreError::TransientNetwork(format!(
                    "giving up after {consecutive_errors} consecutive errors"
                )));
            }
            if is_weekday() && consecutive_closes >= reconnect::MAX_CONSECUTIVE_CLOSES_WEEKDAY {
                self.set_state(ConnectionState::Stopped).await;
                return Err(crate::error::CoreError::TransientNetwork(format!(
                    "giving up after {consecutive_closes} consecutive closes on a weekday"
                )));
            }

            self.set_state(ConnectionState::Reconnecting).await;
            let attempt = consecutive_errors.max(consecutive_closes);
            let delay = backoff_delay(attempt);
            tracing::info!(delay_secs = delay.as_secs_f64(), "reconnecting after backoff");
            tokio::time::sleep(delay).await;
        }
    }

    /// One connect → login → subscribe → pump cycle. Returns `Ok(())` when
    /// the peer closes the connection; returns `Err` on any other failure.
    async fn connect_and_pump(&mut self) -> Result<()> {
        self.set_state(ConnectionState::LoggingIn).await;
        self.session.connect().await?;
        self.session.login().await?;

        self.set_state(ConnectionState::Subscribing).await;
        if let Some(plan) = self.differ.poll().await? {
            apply_plan(&mut self.session, &self.store, self.owner_id, &plan).await?;
        }

        self.set_state(ConnectionState::Running).await;
        let mut differ_tick = tokio::time::interval(Duration::from_secs(DEFAULT_DIFFER_POLL_INTERVAL_SECS));
        let mut watchdog_tick = tokio::time::interval(Duration::from_secs(WATCHDOG_INTERVAL_SECS));

        loop {
            tokio::select! {
                frame = self.session.next_frame() => {
                    match frame {
                        None => return Ok(()),
                        Some(Err(err)) => return Err(err),
                        Some(Ok(frame)) => {
                            self.watchdog.touch();
                            self.route_frame(frame).await?;
                        }
                    }
                }
                _ = differ_tick.tick() => {
                    if let Some(plan) = self.differ.poll().await? {
                        apply_plan(&mut self.session, &self.store, self.owner_id, &plan).await?;
                    }
                }
                _ = watchdog_tick.tick() => {
                    let idle = self.watchdog.idle_seconds();
                    tracing::info!(
                        total_messages = self.watchdog.total_messages(),
                        idle_seconds = ?idle,
                        "watchdog tick"
                    );
                    if is_trading_window() {
                        if let Some(idle) = idle {
                            if idle >= WATCHDOG_STALE_THRESHOLD_SECS {
                                tracing::warn!(idle_seconds = idle, "watchdog detected a stale connection, forcing reconnect");
                                return Err(crate::error::CoreError::TransientNetwork(format!(
                                    "watchdog: no messages for {idle}s during the trading window"
                                )));
                            }
                        }
                    }
                }
            }
        }
    }

    async fn route_frame(&self, frame: StreamFrame) -> Result<()> {
        match frame {
            StreamFrame::LevelOne(value) => {
                for row in decode_l1::decode_frame(&value) {
                    self.l1_beque.add(row).await?;
                }
            }
            StreamFrame::LevelTwo(value) => {
                for row in decode_l2::decode_frame(&value) {
                    self.l2_beque.add(row).await?;
                }
            }
            StreamFrame::Chart(value) => {
                for row in decode_chart::decode_frame(&value) {
                    self.chart_beque.add(row).await?;
                }
            }
            StreamFrame::Other(value) => {
                tracing::debug!(frame = %value, "unrouted frame");
            }
        }
        Ok(())
    }

    /// Drain every batcher and log out, in that order, matching the
    /// original's shutdown sequence.
    pub async fn stop(self) -> Result<()> {
        self.l1_beque.stop().await;
        self.l2_beque.stop().await;
        self.chart_beque.stop().await;
        let mut session = self.session;
        session.logout().await
    }
}

async fn apply_plan<Sess: StreamingSession, P: PersistentStore + ?Sized>(
    session: &mut Sess,
    store: &Arc<P>,
    owner_id: uuid::Uuid,
    plan: &crate::differ::ReconcilePlan,
) -> Result<()> {
    if plan.full_resubscribe {
        let desired = &plan.desired;
        let quotes: Vec<String> = desired.quotes.iter().cloned().collect();
        session.subscribe_quotes(&quotes).await?;
        reconcile_active(store, owner_id, StreamType::Quotes, None, &quotes).await;

        let ohlcv: Vec<String> = desired.ohlcv.iter().cloned().collect();
        session.subscribe_charts(&ohlcv).await?;
        reconcile_active(store, owner_id, StreamType::Ohlcv, None, &ohlcv).await;

        for book in [Book::Nasdaq, Book::Nyse] {
            let empty = Default::default();
            let symbols = desired.level2.get(&book).unwrap_or(&empty);
            if !symbols.is_empty() {
                let symbols: Vec<String> = symbols.iter().cloned().collect();
                session.subscribe_level_two(&symbols, book).await?;
                reconcile_active(store, owner_id, StreamType::Level2, Some(book), &symbols).await;
            }
        }
        return Ok(());
    }

    if !plan.quotes_added.is_empty() {
        session.subscribe_quotes(&plan.quotes_added).await?;
        reconcile_active(store, owner_id, StreamType::Quotes, None, &plan.quotes_added).await;
    }
    if !plan.quotes_removed.is_empty() {
        session.unsubscribe_quotes(&plan.quotes_removed).await?;
        reconcile_inactive(store, owner_id, StreamType::Quotes, None, &plan.quotes_removed).await;
    }
    if !plan.ohlcv_added.is_empty() {
        session.subscribe_charts(&plan.ohlcv_added).await?;
        reconcile_active(store, owner_id, StreamType::Ohlcv, None, &plan.ohlcv_added).await;
    }
    if !plan.ohlcv_removed.is_empty() {
        session.unsubscribe_charts(&plan.ohlcv_removed).await?;
        reconcile_inactive(store, owner_id, StreamType::Ohlcv, None, &plan.ohlcv_removed).await;
    }
    for (book, symbols) in &plan.level2_added {
        if !symbols.is_empty() {
            session.subscribe_level_two(symbols, *book).await?;
            reconcile_active(store, owner_id, StreamType::Level2, Some(*book), symbols).await;
        }
    }
    for (book, symbols) in &plan.level2_removed {
        if !symbols.is_empty() {
            session.unsubscribe_level_two(symbols, *book).await?;
            reconcile_inactive(store, owner_id, StreamType::Level2, Some(*book), symbols).await;
        }
    }
    Ok(())
}

/// Mark `symbols` active in the persistent store once they've actually been
/// sent to the wire, reflecting intent per the Differ's reconciliation step.
/// A failure here is logged, not propagated: the wire subscription already
/// succeeded and a stale `is_active` flag corrects itself on the next poll.
async fn reconcile_active<P: PersistentStore + ?Sized>(
    store: &Arc<P>,
    owner_id: uuid::Uuid,
    stream_type: StreamType,
    book: Option<Book>,
    symbols: &[String],
) {
    if let Err(err) = store.set_subscription_active(owner_id, stream_type, book, symbols, true).await {
        tracing::warn!(error = %err, ?stream_type, "failed to reconcile is_active=true");
    }
}

async fn reconcile_inactive<P: PersistentStore + ?Sized>(
    store: &Arc<P>,
    owner_id: uuid::Uuid,
    stream_type: StreamType,
    book: Option<Book>,
    symbols: &[String],
) {
    if let Err(err) = store.set_subscription_active(owner_id, stream_type, book, symbols, false).await {
        tracing::warn!(error = %err, ?stream_type, "failed to reconcile is_active=false");
    }
}

fn is_weekday() -> bool {
    !matches!(Utc::now().weekday(), Weekday::Sat | Weekday::Sun)
}

/// Rough trading-window check used to gate the watchdog's forced reconnect:
/// weekdays, 13:30-20:00 UTC (US equity market hours without pulling in a
/// timezone database).
fn is_trading_window() -> bool {
    if !is_weekday() {
        return false;
    }
    let now = Utc::now().time();
    let open = NaiveTime::from_hms_opt(13, 30, 0).unwrap();
    let close = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
    now >= open && now < close
}

/// `min(base * 2^n, cap)` on weekdays; `min(cap, mult * n)` on weekends,
/// per the design's reconnect policy.
fn backoff_delay(attempt: u32) -> Duration {
    let secs = if is_weekday() {
        (reconnect::BACKOFF_BASE_SECS * 2f64.powi(attempt as i32)).min(reconnect::BACKOFF_CAP_SECS)
    } else {
        (reconnect::WEEKEND_BACKOFF_MULT_SECS * attempt as f64).min(reconnect::WEEKEND_BACKOFF_CAP_SECS)
    };
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_configured_ceiling() {
        let delay = backoff_delay(20);
        let cap = if is_weekday() { reconnect::BACKOFF_CAP_SECS } else { reconnect::WEEKEND_BACKOFF_CAP_SECS };
        assert!(delay.as_secs_f64() <= cap + 0.001);
    }

    #[test]
    fn watchdog_reports_none_before_first_touch() {
        let watchdog = Watchdog::default();
        assert!(watchdog.idle_seconds().is_none());
        watchdog.touch();
        assert!(watchdog.idle_seconds().unwrap() < 2);
    }
}
