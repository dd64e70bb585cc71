/// Threshold policies deciding when a bucket of trades becomes a bar
use serde::{Deserialize, Serialize};

use crate::data::accumulator::AccumulatorState;
use crate::error::{BarError, Result};

/// Raw threshold settings as read from configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ThresholdConfig {
    TickCount(u64),
    Volume(f64),
    DollarValue(f64),
}

/// Validated sampling rule shared by every symbol of an engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Emit every N trades
    TickCount(u64),
    /// Emit once cumulative quantity reaches V
    Volume(f64),
    /// Emit once cumulative notional reaches D
    DollarValue(f64),
}

impl ThresholdPolicy {
    pub fn from_config(config: ThresholdConfig) -> Result<Self> {
        match config {
            ThresholdConfig::TickCount(0) => Err(BarError::InvalidThreshold(
                "tick_count must be at least 1".to_string(),
            )),
            ThresholdConfig::TickCount(n) => Ok(ThresholdPolicy::TickCount(n)),
            ThresholdConfig::Volume(v) => positive("volume", v).map(ThresholdPolicy::Volume),
            ThresholdConfig::DollarValue(d) => {
                positive("dollar_value", d).map(ThresholdPolicy::DollarValue)
            }
        }
    }

    /// Evaluated after each trade is added, before any reset.
    pub fn should_emit(&self, state: &AccumulatorState) -> bool {
        match *self {
            ThresholdPolicy::TickCount(n) => state.count as u64 >= n,
            ThresholdPolicy::Volume(v) => state.quantity >= v,
            ThresholdPolicy::DollarValue(d) => state.notional >= d,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ThresholdPolicy::TickCount(_) => "tick",
            ThresholdPolicy::Volume(_) => "volume",
            ThresholdPolicy::DollarValue(_) => "dollar",
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            ThresholdPolicy::TickCount(n) => n as f64,
            ThresholdPolicy::Volume(v) => v,
            ThresholdPolicy::DollarValue(d) => d,
        }
    }
}

impl TryFrom<ThresholdConfig> for ThresholdPolicy {
    type Error = BarError;

    fn try_from(config: ThresholdConfig) -> Result<Self> {
        ThresholdPolicy::from_config(config)
    }
}

fn positive(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BarError::InvalidThreshold(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(count: usize, quantity: f64, notional: f64) -> AccumulatorState {
        AccumulatorState { count, quantity, notional }
    }

    #[test]
    fn test_tick_policy() {
        let policy = ThresholdPolicy::TickCount(3);
        assert!(!policy.should_emit(&state(2, 10.0, 1000.0)));
        assert!(policy.should_emit(&state(3, 0.1, 1.0)));
    }

    #[test]
    fn test_volume_policy_inclusive() {
        let policy = ThresholdPolicy::Volume(1.0);
        assert!(!policy.should_emit(&state(5, 0.99, 1e9)));
        assert!(policy.should_emit(&state(1, 1.0, 0.0)));
        assert!(policy.should_emit(&state(1, 1.5, 0.0)));
    }

    #[test]
    fn test_dollar_policy() {
        let policy = ThresholdPolicy::DollarValue(100_000.0);
        assert!(!policy.should_emit(&state(100, 50.0, 99_999.0)));
        assert!(policy.should_emit(&state(1, 0.1, 100_000.0)));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(ThresholdPolicy::from_config(ThresholdConfig::TickCount(0)).is_err());
        assert!(ThresholdPolicy::from_config(ThresholdConfig::Volume(0.0)).is_err());
        assert!(ThresholdPolicy::from_config(ThresholdConfig::Volume(-1.0)).is_err());
        assert!(ThresholdPolicy::from_config(ThresholdConfig::DollarValue(f64::NAN)).is_err());
        assert!(ThresholdPolicy::from_config(ThresholdConfig::DollarValue(f64::INFINITY)).is_err());
    }

    #[test]
    fn test_config_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            threshold: ThresholdConfig,
        }

        let parsed: Wrapper = toml::from_str("[threshold]\nkind = \"tick_count\"\nvalue = 1000\n").unwrap();
        assert_eq!(parsed.threshold, ThresholdConfig::TickCount(1000));

        let parsed: Wrapper = toml::from_str("[threshold]\nkind = \"dollar_value\"\nvalue = 100000.0\n").unwrap();
        let policy = ThresholdPolicy::try_from(parsed.threshold).unwrap();
        assert_eq!(policy, ThresholdPolicy::DollarValue(100_000.0));
        assert_eq!(policy.as_str(), "dollar");
    }
}
