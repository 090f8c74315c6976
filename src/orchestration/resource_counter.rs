//! # Resource Counters
//!
//! Node-local, ephemeral bookkeeping that the control loop keeps per resource:
//! the rolling window of activity samples, the recovery attempt count, and
//! the timestamps that gate cooldowns. Counters never touch the persisted
//! record; purging one forgets history but leaves `state` alone.

use crate::models::ResourceKey;
use crate::state_machine::HaEvent;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;

/// True once at least `threshold` has passed between `since` and `now`
fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.signed_duration_since(since)
        .to_std()
        .map(|elapsed| elapsed >= threshold)
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct HaResourceCounter {
    /// `true` entries are failed samples (no activity observed)
    activity_samples: VecDeque<bool>,
    window: usize,
    recovery_attempts: u32,
    suspected_at: Option<DateTime<Utc>>,
    last_activity_check: Option<DateTime<Utc>>,
    degraded_at: Option<DateTime<Utc>>,
    recovered_at: Option<DateTime<Utc>>,
    first_probe_error: Option<DateTime<Utc>>,
}

impl HaResourceCounter {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            activity_samples: VecDeque::with_capacity(window),
            window,
            recovery_attempts: 0,
            suspected_at: None,
            last_activity_check: None,
            degraded_at: None,
            recovered_at: None,
            first_probe_error: None,
        }
    }

    pub fn add_activity_check(&mut self, failed: bool, now: DateTime<Utc>) {
        if self.activity_samples.len() == self.window {
            self.activity_samples.pop_front();
        }
        self.activity_samples.push_back(failed);
        self.last_activity_check = Some(now);
    }

    pub fn sample_count(&self) -> usize {
        self.activity_samples.len()
    }

    pub fn failed_sample_count(&self) -> usize {
        self.activity_samples.iter().filter(|failed| **failed).count()
    }

    /// Turn the sample window into one of the three activity outcome events
    pub fn classify_activity(&self, min_samples: u32, failure_ratio: f64) -> HaEvent {
        let total = self.sample_count();
        if total < min_samples as usize || total == 0 {
            return HaEvent::TooFewActivityCheckSamples;
        }
        let failed = self.failed_sample_count() as f64 / total as f64;
        if failed <= failure_ratio {
            HaEvent::ActivityCheckFailureUnderThresholdRatio
        } else {
            HaEvent::ActivityCheckFailureOverThresholdRatio
        }
    }

    pub fn increment_recovery_attempts(&mut self) -> u32 {
        self.recovery_attempts += 1;
        self.recovery_attempts
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery_attempts
    }

    pub fn recovery_threshold_exceeded(&self, max_attempts: u32) -> bool {
        self.recovery_attempts >= max_attempts
    }

    pub fn suspected_at(&self) -> Option<DateTime<Utc>> {
        self.suspected_at
    }

    pub fn degraded_at(&self) -> Option<DateTime<Utc>> {
        self.degraded_at
    }

    pub fn recovered_at(&self) -> Option<DateTime<Utc>> {
        self.recovered_at
    }

    /// No activity check yet, or the last one is older than `max_interval`
    pub fn can_perform_activity_check(&self, max_interval: Duration, now: DateTime<Utc>) -> bool {
        self.last_activity_check
            .map_or(true, |last| elapsed_at_least(last, now, max_interval))
    }

    pub fn can_recheck_activity(&self, max_degraded_wait: Duration, now: DateTime<Utc>) -> bool {
        self.degraded_at
            .map_or(true, |since| elapsed_at_least(since, now, max_degraded_wait))
    }

    pub fn can_exit_recovery(&self, recovery_wait: Duration, now: DateTime<Utc>) -> bool {
        self.recovered_at
            .map_or(true, |since| elapsed_at_least(since, now, recovery_wait))
    }

    pub fn mark_suspected(&mut self, now: DateTime<Utc>) {
        self.suspected_at = Some(now);
    }

    pub fn mark_degraded(&mut self, now: DateTime<Utc>) {
        self.degraded_at = Some(now);
    }

    /// Entering `Recovering` starts a fresh attempt count
    pub fn mark_recovering(&mut self) {
        self.recovery_attempts = 0;
    }

    pub fn mark_recovered(&mut self, now: DateTime<Utc>) {
        self.recovered_at = Some(now);
        self.recovery_attempts = 0;
    }

    pub fn reset_activity_samples(&mut self) {
        self.activity_samples.clear();
        self.last_activity_check = None;
    }

    pub fn reset_recovery_attempts(&mut self) {
        self.recovery_attempts = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }

    /// Remember when probe errors started; later errors keep the first timestamp
    pub fn record_probe_error(&mut self, now: DateTime<Utc>) {
        self.first_probe_error.get_or_insert(now);
    }

    pub fn probe_errors_exceed(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        self.first_probe_error
            .map_or(false, |since| elapsed_at_least(since, now, timeout))
    }

    pub fn clear_probe_errors(&mut self) {
        self.first_probe_error = None;
    }
}

/// Counters for every resource this node has looked at
#[derive(Debug)]
pub struct CounterArena {
    counters: DashMap<ResourceKey, HaResourceCounter>,
    window: usize,
}

impl CounterArena {
    pub fn new(window: usize) -> Self {
        Self {
            counters: DashMap::new(),
            window,
        }
    }

    /// Run `f` against the counter for `key`, creating it on first use.
    ///
    /// The entry stays locked while `f` runs; keep `f` short and never await in it.
    pub fn with_counter<R>(&self, key: ResourceKey, f: impl FnOnce(&mut HaResourceCounter) -> R) -> R {
        let mut entry = self
            .counters
            .entry(key)
            .or_insert_with(|| HaResourceCounter::new(self.window));
        f(entry.value_mut())
    }

    pub fn purge(&self, key: ResourceKey) -> bool {
        self.counters.remove(&key).is_some()
    }

    pub fn contains(&self, key: ResourceKey) -> bool {
        self.counters.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
