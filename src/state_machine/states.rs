use serde::{Deserialize, Serialize};
use std::fmt;

/// HA state of a monitored resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HaState {
    /// HA switched off for the resource
    Disabled,
    /// Healthy and monitored
    Available,
    /// Provider reports the resource cannot take part in HA
    Ineligible,
    /// A health check failed; not yet investigated
    Suspect,
    /// Activity checks found the resource partially alive
    Degraded,
    /// Activity checks in progress
    Checking,
    /// Recovery attempts in progress
    Recovering,
    /// Recovery succeeded; waiting out the recovery period
    Recovered,
    /// Fence attempts in progress
    Fencing,
    /// Resource isolated
    Fenced,
}

impl HaState {
    pub const ALL: [HaState; 10] = [
        Self::Disabled,
        Self::Available,
        Self::Ineligible,
        Self::Suspect,
        Self::Degraded,
        Self::Checking,
        Self::Recovering,
        Self::Recovered,
        Self::Fencing,
        Self::Fenced,
    ];

    /// States in which the resource is being investigated or acted upon
    pub fn is_active_investigation(&self) -> bool {
        matches!(
            self,
            Self::Suspect | Self::Checking | Self::Recovering | Self::Fencing
        )
    }
}

impl fmt::Display for HaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disabled => "Disabled",
            Self::Available => "Available",
            Self::Ineligible => "Ineligible",
            Self::Suspect => "Suspect",
            Self::Degraded => "Degraded",
            Self::Checking => "Checking",
            Self::Recovering => "Recovering",
            Self::Recovered => "Recovered",
            Self::Fencing => "Fencing",
            Self::Fenced => "Fenced",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for HaState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.to_string() == s)
            .ok_or_else(|| format!("Invalid HA state: {s}"))
    }
}

impl Default for HaState {
    fn default() -> Self {
        Self::Disabled
    }
}
