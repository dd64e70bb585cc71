/// Core type definitions for activity-sampled bars
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single executed trade as delivered by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    /// Exchange trade time (ms)
    pub trade_time_ms: i64,
    /// Feed delivery time (ms)
    pub event_time_ms: i64,
}

impl Trade {
    pub fn new(symbol: impl Into<String>, price: f64, quantity: f64, trade_time_ms: i64, event_time_ms: i64) -> Self {
        Trade {
            symbol: symbol.into(),
            price,
            quantity,
            trade_time_ms,
            event_time_ms,
        }
    }

    /// Traded value (price × quantity)
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// OHLCV Bar built from a contiguous group of trades
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_timestamp: i64,
    pub close_timestamp: i64,
}

impl Bar {
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_timestamp)
    }

    pub fn close_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.close_timestamp)
    }

    /// Milliseconds between the first and last trade of the bar
    pub fn span_ms(&self) -> i64 {
        self.close_timestamp - self.open_timestamp
    }
}

/// Event delivered by the ingestion adapter
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Trade(Trade),
    /// Malformed or non-trade message on the multiplexed channel (raw payload kept for logging)
    ErrorEnvelope(String),
}
