/// Activity-sampled bar aggregation across a fixed symbol set
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::data::accumulator::{AccumulatorState, SymbolAccumulator};
use crate::data::threshold::ThresholdPolicy;
use crate::error::{BarError, Result};
use crate::sink::BarSink;
use crate::types::{Bar, Trade};

const PROGRESS_LOG_EVERY: usize = 50;

/// Handling of trades for symbols outside the configured set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymbolMode {
    /// Log and drop
    #[default]
    Lenient,
    /// Surface as an error to the caller
    Strict,
}

/// Routes trades to per-symbol accumulators and forwards completed bars to sinks.
///
/// The symbol map is built once and never mutated, so lookups take no lock. Each
/// accumulator has its own mutex: trades for one symbol are serialized, trades for
/// different symbols never wait on each other.
pub struct AggregationEngine {
    policy: ThresholdPolicy,
    mode: SymbolMode,
    accumulators: HashMap<String, Mutex<SymbolAccumulator>>,
    sinks: Vec<Arc<dyn BarSink>>,
    bars_emitted: AtomicU64,
    trades_dropped: AtomicU64,
}

impl AggregationEngine {
    pub fn new<I, S>(symbols: I, policy: ThresholdPolicy, mode: SymbolMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accumulators: HashMap<String, Mutex<SymbolAccumulator>> = symbols
            .into_iter()
            .map(|s| {
                let symbol: String = s.into();
                (symbol.clone(), Mutex::new(SymbolAccumulator::new(symbol)))
            })
            .collect();

        info!(
            "Aggregation engine ready: {} symbols, {} bars @ {}",
            accumulators.len(),
            policy.as_str(),
            policy.value()
        );

        AggregationEngine {
            policy,
            mode,
            accumulators,
            sinks: Vec::new(),
            bars_emitted: AtomicU64::new(0),
            trades_dropped: AtomicU64::new(0),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn BarSink>) -> Self {
        info!("➕ Added {} sink", sink.name());
        self.sinks.push(sink);
        self
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.accumulators.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Process one trade; returns the bar it completed, if any
    pub async fn on_trade(&self, trade: Trade) -> Result<Option<Bar>> {
        let Some(slot) = self.accumulators.get(&trade.symbol) else {
            return self.untracked(trade.symbol);
        };

        let mut accumulator = slot.lock().await;
        let state = *accumulator.add(trade)?;

        if state.count % PROGRESS_LOG_EVERY == 0 {
            debug!("{} pending trades for {}", state.count, accumulator.symbol());
        }

        if !self.policy.should_emit(&state) {
            return Ok(None);
        }

        let bar = accumulator.build_and_reset()?;
        self.bars_emitted.fetch_add(1, Ordering::Relaxed);

        info!(
            "📊 {} bar completed: {} O:{:.2} H:{:.2} L:{:.2} C:{:.2} V:{:.4} ({} trades)",
            self.policy.as_str(),
            bar.symbol,
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume,
            state.count
        );

        // Still holding the symbol's lock: sink appends stay in emission order
        self.deliver(&bar).await;

        Ok(Some(bar))
    }

    /// Snapshot of the pending bucket for a symbol
    pub async fn pending(&self, symbol: &str) -> Option<AccumulatorState> {
        let slot = self.accumulators.get(symbol)?;
        let accumulator = slot.lock().await;
        Some(*accumulator.state())
    }

    pub fn bars_emitted(&self) -> u64 {
        self.bars_emitted.load(Ordering::Relaxed)
    }

    pub fn trades_dropped(&self) -> u64 {
        self.trades_dropped.load(Ordering::Relaxed)
    }

    fn untracked(&self, symbol: String) -> Result<Option<Bar>> {
        match self.mode {
            SymbolMode::Strict => Err(BarError::UntrackedSymbol(symbol)),
            SymbolMode::Lenient => {
                self.trades_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping trade for untracked symbol {}", symbol);
                Ok(None)
            }
        }
    }

    /// A failing sink loses this bar only for itself
    async fn deliver(&self, bar: &Bar) {
        for sink in &self.sinks {
            if let Err(e) = sink.append(&bar.symbol, bar).await {
                warn!(
                    "Sink {} failed for {} bar: {} ({})",
                    sink.name(),
                    bar.symbol,
                    e,
                    e.error_code()
                );
            }
        }
    }
}
