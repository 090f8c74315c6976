//! Provider tunables.
//!
//! Every provider answers lookups for the [`HaConfigKey`] set. Values are
//! typed ([`HaConfigValue`]); string keys parse with `FromStr` and unknown
//! names fail with [`ProviderError::UnsupportedConfigKey`].

use super::errors::{unsupported_key, ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaConfigKey {
    HealthCheckTimeout,
    ActivityCheckTimeout,
    RecoveryTimeout,
    FenceTimeout,
    MaxActivityCheckInterval,
    MaxActivityChecks,
    ActivityCheckFailureRatio,
    MaxDegradedWaitTimeout,
    MaxRecoveryAttempts,
    RecoveryWaitTimeout,
}

impl HaConfigKey {
    pub const ALL: [HaConfigKey; 10] = [
        Self::HealthCheckTimeout,
        Self::ActivityCheckTimeout,
        Self::RecoveryTimeout,
        Self::FenceTimeout,
        Self::MaxActivityCheckInterval,
        Self::MaxActivityChecks,
        Self::ActivityCheckFailureRatio,
        Self::MaxDegradedWaitTimeout,
        Self::MaxRecoveryAttempts,
        Self::RecoveryWaitTimeout,
    ];
}

impl fmt::Display for HaConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::str::FromStr for HaConfigKey {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.to_string() == s)
            .ok_or_else(|| unsupported_key(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HaConfigValue {
    Duration(Duration),
    Count(u32),
    Ratio(f64),
}

impl HaConfigValue {
    pub fn as_duration(&self, key: HaConfigKey) -> ProviderResult<Duration> {
        match self {
            Self::Duration(d) => Ok(*d),
            _ => Err(invalid(key, "duration")),
        }
    }

    pub fn as_count(&self, key: HaConfigKey) -> ProviderResult<u32> {
        match self {
            Self::Count(c) => Ok(*c),
            _ => Err(invalid(key, "count")),
        }
    }

    pub fn as_ratio(&self, key: HaConfigKey) -> ProviderResult<f64> {
        match self {
            Self::Ratio(r) => Ok(*r),
            _ => Err(invalid(key, "ratio")),
        }
    }
}

fn invalid(key: HaConfigKey, expected: &str) -> ProviderError {
    ProviderError::InvalidConfigValue {
        key: key.to_string(),
        expected: expected.to_string(),
    }
}

/// Per-provider tunables as they appear under `[providers.<name>]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderTunables {
    pub health_check_timeout_ms: u64,
    pub activity_check_timeout_ms: u64,
    pub recovery_timeout_ms: u64,
    pub fence_timeout_ms: u64,
    pub max_activity_check_interval_ms: u64,
    pub max_activity_checks: u32,
    pub activity_check_failure_ratio: f64,
    pub max_degraded_wait_timeout_ms: u64,
    pub max_recovery_attempts: u32,
    pub recovery_wait_timeout_ms: u64,
}

impl Default for ProviderTunables {
    fn default() -> Self {
        Self {
            health_check_timeout_ms: 10_000,
            activity_check_timeout_ms: 60_000,
            recovery_timeout_ms: 60_000,
            fence_timeout_ms: 60_000,
            max_activity_check_interval_ms: 60_000,
            max_activity_checks: 10,
            activity_check_failure_ratio: 0.7,
            max_degraded_wait_timeout_ms: 300_000,
            max_recovery_attempts: 5,
            recovery_wait_timeout_ms: 600_000,
        }
    }
}

impl ProviderTunables {
    pub fn value(&self, key: HaConfigKey) -> HaConfigValue {
        use HaConfigKey::*;
        let ms = |v: u64| HaConfigValue::Duration(Duration::from_millis(v));
        match key {
            HealthCheckTimeout => ms(self.health_check_timeout_ms),
            ActivityCheckTimeout => ms(self.activity_check_timeout_ms),
            RecoveryTimeout => ms(self.recovery_timeout_ms),
            FenceTimeout => ms(self.fence_timeout_ms),
            MaxActivityCheckInterval => ms(self.max_activity_check_interval_ms),
            MaxActivityChecks => HaConfigValue::Count(self.max_activity_checks),
            ActivityCheckFailureRatio => HaConfigValue::Ratio(self.activity_check_failure_ratio),
            MaxDegradedWaitTimeout => ms(self.max_degraded_wait_timeout_ms),
            MaxRecoveryAttempts => HaConfigValue::Count(self.max_recovery_attempts),
            RecoveryWaitTimeout => ms(self.recovery_wait_timeout_ms),
        }
    }

    /// Reject values the control loop cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.activity_check_failure_ratio) {
            return Err(format!(
                "activity_check_failure_ratio must be within [0, 1], got {}",
                self.activity_check_failure_ratio
            ));
        }
        if self.max_activity_checks == 0 {
            return Err("max_activity_checks must be at least 1".to_string());
        }
        let timeouts = [
            ("health_check_timeout_ms", self.health_check_timeout_ms),
            ("activity_check_timeout_ms", self.activity_check_timeout_ms),
            ("recovery_timeout_ms", self.recovery_timeout_ms),
            ("fence_timeout_ms", self.fence_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, v)| *v == 0) {
            return Err(format!("{name} must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing() {
        assert_eq!(
            "MaxRecoveryAttempts".parse::<HaConfigKey>().unwrap(),
            HaConfigKey::MaxRecoveryAttempts
        );
        let err = "MaxCoffeeBreaks".parse::<HaConfigKey>().unwrap_err();
        assert_eq!(
            err,
            ProviderError::UnsupportedConfigKey {
                key: "MaxCoffeeBreaks".to_string()
            }
        );
    }

    #[test]
    fn test_tunable_values_are_typed() {
        let tunables = ProviderTunables::default();
        let timeout = tunables.value(HaConfigKey::HealthCheckTimeout);
        assert_eq!(
            timeout.as_duration(HaConfigKey::HealthCheckTimeout).unwrap(),
            Duration::from_secs(10)
        );
        assert!(timeout.as_count(HaConfigKey::HealthCheckTimeout).is_err());
        assert_eq!(
            tunables
                .value(HaConfigKey::ActivityCheckFailureRatio)
                .as_ratio(HaConfigKey::ActivityCheckFailureRatio)
                .unwrap(),
            0.7
        );
    }

    #[test]
    fn test_validation() {
        assert!(ProviderTunables::default().validate().is_ok());

        let bad_ratio = ProviderTunables {
            activity_check_failure_ratio: 1.5,
            ..Default::default()
        };
        assert!(bad_ratio.validate().is_err());

        let zero_timeout = ProviderTunables {
            fence_timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().unwrap_err().contains("fence_timeout_ms"));
    }
}
