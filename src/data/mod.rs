pub mod accumulator;
pub mod aggregator;
pub mod threshold;

pub use accumulator::{AccumulatorState, SymbolAccumulator};
pub use aggregator::{AggregationEngine, SymbolMode};
pub use threshold::{ThresholdConfig, ThresholdPolicy};
