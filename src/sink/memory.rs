/// In-memory bar history - ring buffer of recent bars per symbol
use std::collections::{HashMap, VecDeque};

use futures_util::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::sink::BarSink;
use crate::types::Bar;

#[derive(Default)]
struct SymbolHistory {
    bars: VecDeque<Bar>,
    total: usize,
}

/// Keeps the last `capacity` completed bars of each symbol for downstream readers
pub struct MemorySink {
    capacity: usize,
    history: RwLock<HashMap<String, SymbolHistory>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        MemorySink {
            capacity: capacity.max(1),
            history: RwLock::new(HashMap::new()),
        }
    }

    pub async fn push(&self, symbol: &str, bar: Bar) {
        let mut history = self.history.write().await;
        let entry = history.entry(symbol.to_string()).or_default();

        if entry.bars.len() >= self.capacity {
            entry.bars.pop_front();
        }
        entry.bars.push_back(bar);
        entry.total += 1;

        debug!(
            "Stored bar for {} - total: {}, in-memory: {}",
            symbol,
            entry.total,
            entry.bars.len()
        );
    }

    /// Get recent N bars, oldest first
    pub async fn recent(&self, symbol: &str, n: usize) -> Vec<Bar> {
        let history = self.history.read().await;
        match history.get(symbol) {
            Some(entry) => {
                let skip = entry.bars.len().saturating_sub(n);
                entry.bars.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub async fn last(&self, symbol: &str) -> Option<Bar> {
        let history = self.history.read().await;
        history.get(symbol)?.bars.back().cloned()
    }

    /// Bars ever received for the symbol, including evicted ones
    pub async fn total(&self, symbol: &str) -> usize {
        let history = self.history.read().await;
        history.get(symbol).map(|h| h.total).unwrap_or(0)
    }
}

impl BarSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn append<'a>(&'a self, symbol: &'a str, bar: &'a Bar) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.push(symbol, bar.clone()).await;
            Ok(())
        })
    }
}
