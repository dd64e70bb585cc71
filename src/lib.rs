pub mod types;
pub mod error;
pub mod data;
pub mod sink;
pub mod broker;
pub mod health;
pub mod config;

pub use types::*;
pub use error::{BarError, Result};
