/// Stream health tracking and debounced resubscription
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tracing::{debug, error, info, warn};

use crate::broker::SubscriptionControl;
use crate::error::Result;

/// Reference cooldown between stopping and restarting the subscription
pub const DEFAULT_RESUBSCRIBE_COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Resubscribing,
}

impl HealthState {
    pub fn as_str(&self) -> &str {
        match self {
            HealthState::Healthy => "HEALTHY",
            HealthState::Degraded => "DEGRADED",
            HealthState::Resubscribing => "RESUBSCRIBING",
        }
    }
}

/// Reacts to malformed upstream messages by cycling the subscription.
///
/// Purely transport-level: never touches accumulator state. Only one cycle runs
/// at a time; errors reported while Degraded or Resubscribing are ignored.
pub struct StreamHealthMonitor {
    adapter: Arc<dyn SubscriptionControl>,
    symbols: Vec<String>,
    cooldown: Duration,
    state: RwLock<HealthState>,
    wake: Notify,
    resubscribes: AtomicU64,
    errors_ignored: AtomicU64,
}

impl StreamHealthMonitor {
    pub fn new(adapter: Arc<dyn SubscriptionControl>, symbols: Vec<String>, cooldown: Duration) -> Self {
        StreamHealthMonitor {
            adapter,
            symbols,
            cooldown,
            state: RwLock::new(HealthState::Healthy),
            wake: Notify::new(),
            resubscribes: AtomicU64::new(0),
            errors_ignored: AtomicU64::new(0),
        }
    }

    /// Open the initial subscription. A failure leaves the monitor Degraded so
    /// `run` retries it.
    pub async fn start(&self) -> Result<()> {
        match self.adapter.start_subscription(&self.symbols).await {
            Ok(()) => {
                info!("📡 Subscribed to {} trade streams", self.symbols.len());
                Ok(())
            }
            Err(e) => {
                self.mark_degraded().await;
                Err(e)
            }
        }
    }

    pub async fn state(&self) -> HealthState {
        *self.state.read().await
    }

    pub fn resubscribe_count(&self) -> u64 {
        self.resubscribes.load(Ordering::Relaxed)
    }

    pub fn errors_ignored(&self) -> u64 {
        self.errors_ignored.load(Ordering::Relaxed)
    }

    /// Error envelope from the ingestion adapter
    pub async fn report_error(&self, raw: &str) {
        let mut state = self.state.write().await;

        match *state {
            HealthState::Healthy => {
                *state = HealthState::Degraded;
                warn!("⚠️ Malformed stream message, scheduling resubscribe: {}", raw);
                self.wake.notify_one();
            }
            HealthState::Degraded | HealthState::Resubscribing => {
                self.errors_ignored.fetch_add(1, Ordering::Relaxed);
                debug!("Stream error ignored while {}: {}", state.as_str(), raw);
            }
        }
    }

    /// Run one resubscribe cycle if Degraded. Returns whether a cycle completed.
    pub async fn poll(&self) -> Result<bool> {
        {
            let mut state = self.state.write().await;
            if *state != HealthState::Degraded {
                return Ok(false);
            }
            *state = HealthState::Resubscribing;
        }

        info!("🔄 Resubscribing in {:?}", self.cooldown);

        if let Err(e) = self.adapter.stop_subscription().await {
            warn!("Stop subscription failed: {} ({})", e, e.error_code());
        }

        tokio::time::sleep(self.cooldown).await;

        match self.adapter.start_subscription(&self.symbols).await {
            Ok(()) => {
                *self.state.write().await = HealthState::Healthy;
                let count = self.resubscribes.fetch_add(1, Ordering::Relaxed) + 1;
                info!("✅ Stream healthy again (resubscribe #{})", count);
                Ok(true)
            }
            Err(e) => {
                error!("Resubscribe failed: {} ({})", e, e.error_code());
                self.mark_degraded().await;
                Err(e)
            }
        }
    }

    /// Wait for error signals and drive resubscribe cycles until the task is dropped
    pub async fn run(self: Arc<Self>) {
        loop {
            self.wake.notified().await;
            if let Err(e) = self.poll().await {
                debug!("Resubscribe cycle will be retried: {}", e);
            }
        }
    }

    async fn mark_degraded(&self) {
        *self.state.write().await = HealthState::Degraded;
        self.wake.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AggregationEngine, SymbolMode, ThresholdPolicy};
    use crate::error::BarError;
    use crate::types::Trade;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingAdapter {
        starts: AtomicUsize,
        stops: AtomicUsize,
        failing_starts: AtomicUsize,
    }

    impl RecordingAdapter {
        fn failing(n: usize) -> Self {
            let adapter = RecordingAdapter::default();
            adapter.failing_starts.store(n, Ordering::SeqCst);
            adapter
        }
    }

    impl SubscriptionControl for RecordingAdapter {
        fn start_subscription<'a>(&'a self, symbols: &'a [String]) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                assert_eq!(symbols.len(), 2);
                self.starts.fetch_add(1, Ordering::SeqCst);
                let remaining = self.failing_starts.load(Ordering::SeqCst);
                if remaining > 0 {
                    self.failing_starts.store(remaining - 1, Ordering::SeqCst);
                    return Err(BarError::WebSocketError("refused".to_string()));
                }
                Ok(())
            })
        }

        fn stop_subscription(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.stops.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        }
    }

    fn monitor(adapter: Arc<RecordingAdapter>, cooldown_ms: u64) -> Arc<StreamHealthMonitor> {
        Arc::new(StreamHealthMonitor::new(
            adapter,
            vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            Duration::from_millis(cooldown_ms),
        ))
    }

    #[tokio::test]
    async fn test_error_degrades_and_poll_recovers() {
        let adapter = Arc::new(RecordingAdapter::default());
        let monitor = monitor(adapter.clone(), 10);

        assert_eq!(monitor.state().await, HealthState::Healthy);
        assert!(!monitor.poll().await.unwrap());

        monitor.report_error("{\"bad\":true}").await;
        assert_eq!(monitor.state().await, HealthState::Degraded);

        assert!(monitor.poll().await.unwrap());
        assert_eq!(monitor.state().await, HealthState::Healthy);
        assert_eq!(adapter.stops.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.starts.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.resubscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_errors_debounced_during_cycle() {
        let adapter = Arc::new(RecordingAdapter::default());
        let monitor = monitor(adapter.clone(), 100);

        monitor.report_error("first").await;
        let cycle = tokio::spawn({
            let monitor = Arc::clone(&monitor);
            async move { monitor.poll().await }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(monitor.state().await, HealthState::Resubscribing);
        for _ in 0..3 {
            monitor.report_error("storm").await;
        }

        assert!(cycle.await.unwrap().unwrap());
        assert_eq!(adapter.starts.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.errors_ignored(), 3);
        assert_eq!(monitor.state().await, HealthState::Healthy);
        assert!(!monitor.poll().await.unwrap());
    }

    #[tokio::test]
    async fn test_restart_waits_for_cooldown() {
        let adapter = Arc::new(RecordingAdapter::default());
        let monitor = monitor(adapter.clone(), 150);

        monitor.report_error("bad").await;
        let cycle = tokio::spawn({
            let monitor = Arc::clone(&monitor);
            async move { monitor.poll().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(adapter.stops.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.starts.load(Ordering::SeqCst), 0);
        assert_eq!(monitor.state().await, HealthState::Resubscribing);

        assert!(cycle.await.unwrap().unwrap());
        assert_eq!(adapter.starts.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.state().await, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_failed_start_stays_degraded() {
        let adapter = Arc::new(RecordingAdapter::failing(1));
        let monitor = monitor(adapter.clone(), 1);

        monitor.report_error("bad").await;
        assert!(monitor.poll().await.is_err());
        assert_eq!(monitor.state().await, HealthState::Degraded);

        assert!(monitor.poll().await.unwrap());
        assert_eq!(adapter.starts.load(Ordering::SeqCst), 2);
        assert_eq!(monitor.state().await, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_initial_start_failure_degrades() {
        let adapter = Arc::new(RecordingAdapter::failing(1));
        let monitor = monitor(adapter.clone(), 1);

        assert!(monitor.start().await.is_err());
        assert_eq!(monitor.state().await, HealthState::Degraded);
    }

    #[tokio::test]
    async fn test_run_loop_resubscribes_once_and_keeps_accumulators() {
        let adapter = Arc::new(RecordingAdapter::default());
        let monitor = monitor(adapter.clone(), 20);
        let engine = AggregationEngine::new(["BTCUSDT", "ETHUSDT"], ThresholdPolicy::TickCount(10), SymbolMode::Lenient);

        engine.on_trade(Trade::new("BTCUSDT", 1.0, 2.0, 1, 1)).await.unwrap();
        engine.on_trade(Trade::new("ETHUSDT", 3.0, 4.0, 2, 2)).await.unwrap();
        let btc_before = engine.pending("BTCUSDT").await.unwrap();
        let eth_before = engine.pending("ETHUSDT").await.unwrap();

        let runner = tokio::spawn(Arc::clone(&monitor).run());
        monitor.report_error("not a trade").await;

        for _ in 0..100 {
            if monitor.resubscribe_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        runner.abort();

        assert_eq!(adapter.starts.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.state().await, HealthState::Healthy);
        assert_eq!(engine.pending("BTCUSDT").await.unwrap(), btc_before);
        assert_eq!(engine.pending("ETHUSDT").await.unwrap(), eth_before);
        assert_eq!(engine.bars_emitted(), 0);
    }
}
