pub mod monitor;

pub use monitor::{HealthState, StreamHealthMonitor, DEFAULT_RESUBSCRIBE_COOLDOWN};
