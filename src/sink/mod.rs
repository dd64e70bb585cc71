pub mod csv_sink;
pub mod memory;

pub use csv_sink::CsvSink;
pub use memory::MemorySink;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::types::Bar;

/// Consumer of completed bars
///
/// Appends for one symbol arrive in emission order. Retry policy, if any, belongs
/// to the sink; the engine logs a failure and moves on.
pub trait BarSink: Send + Sync {
    fn name(&self) -> &str;

    fn append<'a>(&'a self, symbol: &'a str, bar: &'a Bar) -> BoxFuture<'a, Result<()>>;
}
