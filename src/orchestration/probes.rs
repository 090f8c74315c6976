//! Bounded probe execution.
//!
//! Every provider call runs under the provider's timeout for that probe. A
//! timeout is a failed outcome. A provider error is inconclusive until errors
//! have persisted past the same timeout, after which it counts as a failure.

use super::resource_counter::CounterArena;
use crate::models::ResourceKey;
use crate::provider::{HaConfigKey, ProviderResult};
use chrono::Utc;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Health,
    Activity,
    Recovery,
    Fence,
}

impl ProbeKind {
    pub fn timeout_key(&self) -> HaConfigKey {
        match self {
            Self::Health => HaConfigKey::HealthCheckTimeout,
            Self::Activity => HaConfigKey::ActivityCheckTimeout,
            Self::Recovery => HaConfigKey::RecoveryTimeout,
            Self::Fence => HaConfigKey::FenceTimeout,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Health => write!(f, "health_check"),
            Self::Activity => write!(f, "activity_check"),
            Self::Recovery => write!(f, "recovery"),
            Self::Fence => write!(f, "fence"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The provider answered `true`
    Passed,
    /// The provider answered `false`, timed out, or kept erroring
    Failed,
    /// The provider errored; no decision this cycle
    Inconclusive,
}

pub async fn run_probe<F>(
    kind: ProbeKind,
    key: ResourceKey,
    timeout: Duration,
    counters: &CounterArena,
    probe: F,
) -> ProbeOutcome
where
    F: Future<Output = ProviderResult<bool>>,
{
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(answer)) => {
            counters.with_counter(key, |c| c.clear_probe_errors());
            debug!(probe = %kind, resource_id = key.0, answer = answer, "Probe completed");
            if answer {
                ProbeOutcome::Passed
            } else {
                ProbeOutcome::Failed
            }
        }
        Ok(Err(error)) => {
            let now = Utc::now();
            let persistent = counters.with_counter(key, |c| {
                c.record_probe_error(now);
                c.probe_errors_exceed(timeout, now)
            });
            if persistent {
                warn!(
                    probe = %kind,
                    resource_id = key.0,
                    error = %error,
                    "Probe errors persisted past timeout, treating as failed"
                );
                ProbeOutcome::Failed
            } else {
                warn!(probe = %kind, resource_id = key.0, error = %error, "Probe error");
                ProbeOutcome::Inconclusive
            }
        }
        Err(_) => {
            warn!(
                probe = %kind,
                resource_id = key.0,
                timeout_ms = timeout.as_millis() as u64,
                "Probe timed out"
            );
            ProbeOutcome::Failed
        }
    }
}
