//! Plugin that collects registration and resolution counters

use super::IntoPlugin;
use dashmap::DashMap;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use weave_di::{
    ServiceKey,
    error::PluginError,
    plugin::{Capabilities, MonitoringPlugin, PluginDescriptor, PluginEvent, PluginHooks},
};

const IDENTIFIER: &str = "weave.metrics";

/// Point-in-time copy of the collected metrics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Stored registrations
    pub registrations: u64,
    /// Rejected registrations
    pub registration_failures: u64,
    /// Successful resolutions, nested ones included
    pub resolutions: u64,
    /// Failed resolutions, nested ones included
    pub resolution_failures: u64,
    /// Time spent in successful resolutions
    pub total_resolution_time: Duration,
    /// Successful resolutions per key, most resolved first
    pub per_key: Vec<(ServiceKey, u64)>,
}

impl MetricsSnapshot {
    /// Mean time of a successful resolution, `None` before the first one
    pub fn average_resolution_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.resolutions).ok().filter(|c| *c > 0)?;
        Some(self.total_resolution_time / count)
    }

    /// Successful resolutions of `key`
    pub fn resolutions_of(&self, key: &str) -> u64 {
        self.per_key
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map_or(0, |(_, count)| *count)
    }
}

/// Counts registrations and resolutions.
///
/// Counters survive [`Container::reset`](weave_di::Container::reset), use [`MetricsPlugin::clear`] to zero them.
#[derive(Debug, Default)]
pub struct MetricsPlugin {
    registrations: AtomicU64,
    registration_failures: AtomicU64,
    resolutions: AtomicU64,
    resolution_failures: AtomicU64,
    resolution_nanos: AtomicU64,
    per_key: DashMap<ServiceKey, u64>,
}

impl MetricsPlugin {
    /// Creates a plugin with zeroed counters
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut per_key = self.per_key
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect::<Vec<_>>();
        per_key.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        MetricsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            registration_failures: self.registration_failures.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            resolution_failures: self.resolution_failures.load(Ordering::Relaxed),
            total_resolution_time: Duration::from_nanos(self.resolution_nanos.load(Ordering::Relaxed)),
            per_key,
        }
    }

    /// Zeroes every counter
    pub fn clear(&self) {
        self.registrations.store(0, Ordering::Relaxed);
        self.registration_failures.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
        self.resolution_failures.store(0, Ordering::Relaxed);
        self.resolution_nanos.store(0, Ordering::Relaxed);
        self.per_key.clear();
    }
}

impl MonitoringPlugin for MetricsPlugin {
    fn observe(&self, event: &PluginEvent<'_>) -> Result<(), PluginError> {
        match event {
            PluginEvent::AfterRegistration(_) => {
                self.registrations.fetch_add(1, Ordering::Relaxed);
            }
            PluginEvent::RegistrationFailed { .. } => {
                self.registration_failures.fetch_add(1, Ordering::Relaxed);
            }
            PluginEvent::AfterResolution { resolution, elapsed, .. } => {
                let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
                self.resolutions.fetch_add(1, Ordering::Relaxed);
                self.resolution_nanos.fetch_add(nanos, Ordering::Relaxed);
                *self.per_key.entry(resolution.key.clone()).or_insert(0) += 1;
            }
            PluginEvent::ResolutionFailed { .. } => {
                self.resolution_failures.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        Ok(())
    }
}

impl IntoPlugin for MetricsPlugin {
    fn into_plugin(self: Arc<Self>) -> (PluginDescriptor, PluginHooks) {
        let descriptor = PluginDescriptor::new(IDENTIFIER)
            .with_capabilities(Capabilities::MONITORING);
        (descriptor, PluginHooks::new().with_monitoring(self))
    }
}
