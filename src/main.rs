/// Main entry point for the activity bar service
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use activity_bars::{
    broker::{BinanceTradeStream, SubscriptionControl},
    config::{load_config, load_symbols, AppConfig},
    data::AggregationEngine,
    health::StreamHealthMonitor,
    sink::{CsvSink, MemorySink},
    FeedEvent, Trade,
};

/// Application state
struct BarService {
    engine: Arc<AggregationEngine>,
    memory: Arc<MemorySink>,
    stream: Arc<BinanceTradeStream>,
    monitor: Arc<StreamHealthMonitor>,
    events: mpsc::UnboundedReceiver<FeedEvent>,
}

impl BarService {
    fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let symbols = load_symbols(&config.symbols_file)?;
        info!("Tracking {} symbols: {}", symbols.len(), symbols.join(", "));

        let memory = Arc::new(MemorySink::new(config.memory.capacity));
        let mut engine = AggregationEngine::new(symbols.clone(), config.policy()?, config.symbol_mode())
            .with_sink(memory.clone());

        if config.csv.enabled {
            std::fs::create_dir_all(&config.csv.directory).with_context(|| {
                format!("Failed to create CSV directory {}", config.csv.directory.display())
            })?;
            engine = engine.with_sink(Arc::new(CsvSink::new(
                config.csv_prefix(),
                config.csv.directory.clone(),
            )));
        }

        let (stream, events) = BinanceTradeStream::new(config.stream.url.clone());
        let stream = Arc::new(stream);
        let monitor = Arc::new(StreamHealthMonitor::new(
            stream.clone(),
            symbols,
            config.resubscribe_cooldown(),
        ));

        Ok(BarService {
            engine: Arc::new(engine),
            memory,
            stream,
            monitor,
            events,
        })
    }

    /// Start streaming and aggregate until Ctrl+C
    async fn run(mut self) -> anyhow::Result<()> {
        // Off the dispatch path so Ctrl+C stays responsive while connecting
        let initial = tokio::spawn({
            let monitor = Arc::clone(&self.monitor);
            async move {
                if let Err(e) = monitor.start().await {
                    error!("Initial subscription failed: {} - retrying", e);
                }
            }
        });
        let health = tokio::spawn(Arc::clone(&self.monitor).run());

        // One single-writer queue per symbol keeps per-symbol order without
        // letting a slow symbol hold up the others
        let mut workers: HashMap<String, (mpsc::UnboundedSender<Trade>, JoinHandle<()>)> = self
            .engine
            .symbols()
            .into_iter()
            .map(|symbol| {
                let worker = spawn_symbol_worker(Arc::clone(&self.engine));
                (symbol, worker)
            })
            .collect();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Ctrl+C received - initiating shutdown");
                    break Ok(());
                }
                event = self.events.recv() => match event {
                    Some(FeedEvent::Trade(trade)) => {
                        if let Some((tx, _)) = workers.get(&trade.symbol) {
                            let _ = tx.send(trade);
                        } else if let Err(e) = self.engine.on_trade(trade).await {
                            // Only strict mode gets here
                            break Err(anyhow::Error::new(e).context("Protocol violation"));
                        }
                    }
                    Some(FeedEvent::ErrorEnvelope(raw)) => {
                        self.monitor.report_error(&raw).await;
                    }
                    None => {
                        warn!("Feed channel closed");
                        break Ok(());
                    }
                },
            }
        };

        initial.abort();
        health.abort();
        if let Err(e) = self.stream.stop_subscription().await {
            warn!("Stop subscription failed: {}", e);
        }

        for (_, (tx, handle)) in workers.drain() {
            drop(tx);
            let _ = handle.await;
        }

        self.shutdown_summary().await;
        result
    }

    async fn shutdown_summary(&self) {
        for symbol in self.engine.symbols() {
            if let Some(pending) = self.engine.pending(&symbol).await {
                if !pending.is_empty() {
                    info!("Discarding partial {} bucket: {} trades", symbol, pending.count);
                }
            }
            info!("{}: {} bars this session", symbol, self.memory.total(&symbol).await);
        }

        info!(
            "Shutdown complete: {} bars emitted, {} untracked trades dropped, {} resubscribes",
            self.engine.bars_emitted(),
            self.engine.trades_dropped(),
            self.monitor.resubscribe_count()
        );
    }
}

fn spawn_symbol_worker(engine: Arc<AggregationEngine>) -> (mpsc::UnboundedSender<Trade>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Trade>();

    let handle = tokio::spawn(async move {
        while let Some(trade) = rx.recv().await {
            if let Err(e) = engine.on_trade(trade).await {
                error!("Trade processing failed: {} ({})", e, e.error_code());
            }
        }
    });

    (tx, handle)
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .unwrap_or_else(|_| "config.toml".to_string());

    let config = load_config(&config_path)
        .with_context(|| format!("Loading {}", config_path))?;
    init_logging(&config);

    info!(
        "Starting activity bar service (run {})",
        uuid::Uuid::new_v4()
    );

    let service = BarService::new(&config)?;
    service.run().await
}
