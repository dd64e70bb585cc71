/// Per-symbol trade bucket with incrementally maintained aggregates
use crate::error::{BarError, Result};
use crate::types::{Bar, Trade};

/// Running aggregates of the pending bucket
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AccumulatorState {
    pub count: usize,
    pub quantity: f64,
    pub notional: f64,
}

impl AccumulatorState {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Trades received for one symbol since its last bar
#[derive(Debug)]
pub struct SymbolAccumulator {
    symbol: String,
    trades: Vec<Trade>,
    state: AccumulatorState,
}

impl SymbolAccumulator {
    pub fn new(symbol: String) -> Self {
        SymbolAccumulator {
            symbol,
            trades: Vec::new(),
            state: AccumulatorState::default(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Append a trade and update the running aggregates in O(1)
    pub fn add(&mut self, trade: Trade) -> Result<&AccumulatorState> {
        if trade.symbol != self.symbol {
            return Err(BarError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: trade.symbol,
            });
        }

        self.state.count += 1;
        self.state.quantity += trade.quantity;
        self.state.notional += trade.notional();
        self.trades.push(trade);

        Ok(&self.state)
    }

    /// Build the bar for the pending bucket, then clear it.
    ///
    /// The only way pending trades are dropped. Fails on an empty bucket, which
    /// the engine never asks for: a policy only fires right after an `add`.
    pub fn build_and_reset(&mut self) -> Result<Bar> {
        let (first, last) = match (self.trades.first(), self.trades.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(BarError::EmptyBucket(self.symbol.clone())),
        };

        let mut high = f64::MIN;
        let mut low = f64::MAX;
        let mut volume = 0.0;
        for trade in &self.trades {
            high = high.max(trade.price);
            low = low.min(trade.price);
            volume += trade.quantity;
        }

        let bar = Bar {
            symbol: self.symbol.clone(),
            open: first.price,
            high,
            low,
            close: last.price,
            volume,
            open_timestamp: first.trade_time_ms,
            close_timestamp: last.trade_time_ms,
        };

        self.trades.clear();
        self.state = AccumulatorState::default();

        Ok(bar)
    }
}
