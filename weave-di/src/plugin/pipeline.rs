//! Ordered plugin pipeline

use crate::error::{Error, PluginError};
use super::{Capability, PluginDescriptor, PluginEvent, PluginHooks, PluginState};
use parking_lot::RwLock;
use std::sync::Arc;

const ALL_CAPABILITIES: [Capability; 5] = [
    Capability::Registration,
    Capability::Resolution,
    Capability::Validation,
    Capability::Lifecycle,
    Capability::Monitoring,
];

#[derive(Debug)]
struct Plugin {
    descriptor: PluginDescriptor,
    hooks: PluginHooks,
}

#[derive(Debug)]
struct Slot {
    plugin: Arc<Plugin>,
    state: PluginState,
}

/// Ordered list of plugins invoked around registration and resolution.
///
/// Dispatch order is ascending priority, ties broken by registration order.
/// Hooks run sequentially on the calling thread; the pipeline lock is not held while
/// a hook runs, so hooks may use the container freely.
#[derive(Debug, Default)]
pub struct PluginPipeline {
    slots: RwLock<Vec<Slot>>,
    stop_on_observer_error: bool,
}

impl PluginPipeline {
    /// Creates an empty pipeline
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty pipeline that stops notifying observers of an event
    /// after the first observer failure
    #[inline]
    pub fn with_stop_on_observer_error(mut self, stop: bool) -> Self {
        self.stop_on_observer_error = stop;
        self
    }

    /// Registers a plugin in [`PluginState::Registered`] state.
    ///
    /// Fails if the identifier is taken or if a declared capability has no hook.
    pub fn register(&self, descriptor: PluginDescriptor, hooks: PluginHooks) -> Result<(), PluginError> {
        let capabilities = descriptor.capabilities();
        if let Some(capability) = ALL_CAPABILITIES
            .into_iter()
            .find(|c| capabilities.has(*c) && !hooks.provides(*c))
        {
            return Err(PluginError::MissingHook {
                plugin: descriptor.identifier.clone(),
                capability,
            });
        }

        let mut slots = self.slots.write();
        if slots.iter().any(|s| s.plugin.descriptor.identifier == descriptor.identifier) {
            return Err(PluginError::Duplicate(descriptor.identifier));
        }

        let priority = descriptor.priority();
        let position = slots.partition_point(|s| s.plugin.descriptor.priority() <= priority);

        tracing::debug!(plugin = %descriptor.identifier, priority, position, "plugin registered");

        slots.insert(position, Slot {
            plugin: Arc::new(Plugin { descriptor, hooks }),
            state: PluginState::Registered,
        });
        Ok(())
    }

    /// Moves a plugin to [`PluginState::Active`]
    #[inline]
    pub fn activate(&self, identifier: &str) -> Result<(), PluginError> {
        self.transition(identifier, PluginState::Active)
    }

    /// Moves an active plugin to [`PluginState::Inactive`]
    #[inline]
    pub fn deactivate(&self, identifier: &str) -> Result<(), PluginError> {
        self.transition(identifier, PluginState::Inactive)
    }

    /// Removes a plugin from the pipeline
    pub fn remove(&self, identifier: &str) -> Result<(), PluginError> {
        let mut slots = self.slots.write();
        let index = slots
            .iter()
            .position(|s| &*s.plugin.descriptor.identifier == identifier)
            .ok_or_else(|| PluginError::NotFound(identifier.to_owned()))?;
        slots.remove(index);

        tracing::debug!(plugin = identifier, "plugin removed");
        Ok(())
    }

    /// Returns the state of a plugin, `None` if it is not registered
    #[inline]
    pub fn state(&self, identifier: &str) -> Option<PluginState> {
        self.slots
            .read()
            .iter()
            .find(|s| &*s.plugin.descriptor.identifier == identifier)
            .map(|s| s.state)
    }

    /// Descriptors of all registered plugins in dispatch order
    #[inline]
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.slots
            .read()
            .iter()
            .map(|s| s.plugin.descriptor.clone())
            .collect()
    }

    /// Returns `true` if no plugin is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Dispatches `event` to every active plugin subscribed to it.
    ///
    /// In gating phases the first failing hook stops the chain and the failure is
    /// returned as [`Error::RejectedByPlugin`]. Observer failures are logged and
    /// never fail the dispatch.
    pub fn dispatch(&self, event: &PluginEvent<'_>) -> Result<(), Error> {
        let phase = event.phase();
        let capability = phase.capability();

        for plugin in self.active_snapshot() {
            let capabilities = plugin.descriptor.capabilities();
            let identifier = &plugin.descriptor.identifier;

            if capabilities.has(capability)
                && let Err(err) = plugin.hooks.deliver(event)
            {
                if phase.is_gating() {
                    tracing::debug!(plugin = %identifier, %phase, error = %err, "operation rejected by plugin");
                    return Err(Error::rejected(identifier.clone(), phase, err));
                }
                tracing::warn!(plugin = %identifier, %phase, error = %err, "plugin hook failed");
                if self.stop_on_observer_error {
                    break;
                }
            }

            if capabilities.has(Capability::Monitoring)
                && let Some(monitor) = &plugin.hooks.monitoring
                && let Err(err) = monitor.observe(event)
            {
                tracing::warn!(plugin = %identifier, %phase, error = %err, "monitoring plugin failed");
                if self.stop_on_observer_error && !phase.is_gating() {
                    break;
                }
            }
        }

        Ok(())
    }

    fn active_snapshot(&self) -> Vec<Arc<Plugin>> {
        self.slots
            .read()
            .iter()
            .filter(|s| s.state == PluginState::Active)
            .map(|s| s.plugin.clone())
            .collect()
    }

    fn transition(&self, identifier: &str, to: PluginState) -> Result<(), PluginError> {
        let mut slots = self.slots.write();
        let slot = slots
            .iter_mut()
            .find(|s| &*s.plugin.descriptor.identifier == identifier)
            .ok_or_else(|| PluginError::NotFound(identifier.to_owned()))?;

        match (slot.state, to) {
            (from, to) if from == to => Ok(()),
            (PluginState::Registered | PluginState::Inactive, PluginState::Active)
            | (PluginState::Active, PluginState::Inactive) => {
                tracing::debug!(plugin = identifier, from = ?slot.state, ?to, "plugin state changed");
                slot.state = to;
                Ok(())
            }
            (from, to) => Err(PluginError::InvalidTransition {
                plugin: slot.plugin.descriptor.identifier.clone(),
                from,
                to,
            }),
        }
    }
}
