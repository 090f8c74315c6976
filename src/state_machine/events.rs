use serde::{Deserialize, Serialize};
use std::fmt;

/// Events that drive HA state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaEvent {
    Eligible,
    Ineligible,
    Disabled,
    Enabled,
    HealthCheckPassed,
    HealthCheckFailed,
    PerformActivityCheck,
    TooFewActivityCheckSamples,
    PeriodicRecheckResourceActivity,
    ActivityCheckFailureOverThresholdRatio,
    ActivityCheckFailureUnderThresholdRatio,
    /// Declared for completeness; no edge accepts it
    PowerCycle,
    Recovered,
    RetryRecovery,
    RecoveryWaitPeriodTimeout,
    RecoveryOperationThresholdExceeded,
    RetryFencing,
    Fenced,
}

impl HaEvent {
    pub const ALL: [HaEvent; 18] = [
        Self::Eligible,
        Self::Ineligible,
        Self::Disabled,
        Self::Enabled,
        Self::HealthCheckPassed,
        Self::HealthCheckFailed,
        Self::PerformActivityCheck,
        Self::TooFewActivityCheckSamples,
        Self::PeriodicRecheckResourceActivity,
        Self::ActivityCheckFailureOverThresholdRatio,
        Self::ActivityCheckFailureUnderThresholdRatio,
        Self::PowerCycle,
        Self::Recovered,
        Self::RetryRecovery,
        Self::RecoveryWaitPeriodTimeout,
        Self::RecoveryOperationThresholdExceeded,
        Self::RetryFencing,
        Self::Fenced,
    ];

    /// Whether a committed transition on this event clears the owner claim
    pub fn clears_ownership(&self) -> bool {
        matches!(self, Self::Disabled)
    }
}

impl fmt::Display for HaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Debug output of a fieldless enum is the variant name
        write!(f, "{self:?}")
    }
}

impl std::str::FromStr for HaEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event| event.to_string() == s)
            .ok_or_else(|| format!("Invalid HA event: {s}"))
    }
}
