//! Validation plugin that rejects replacing an existing registration

use super::IntoPlugin;
use std::{collections::HashSet, sync::Arc};
use weave_di::{
    ServiceKey,
    error::PluginError,
    plugin::{Capabilities, PluginDescriptor, PluginHooks, RegistrationEvent, ValidationPlugin},
};

const IDENTIFIER: &str = "weave.overwrite-guard";

/// Rejects a registration whose key is already registered, unless the key is allowed.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use weave::{Container, plugins::{OverwriteGuard, install}};
///
/// let container = Container::new();
/// install(&container, Arc::new(OverwriteGuard::new().allow("Clock"))).unwrap();
///
/// container.register_transient("Database", || "primary").unwrap();
/// assert!(container.register_transient("Database", || "replica").unwrap_err().is_rejected());
///
/// container.register_transient("Clock", || 1).unwrap();
/// assert!(container.register_transient("Clock", || 2).is_ok());
/// ```
#[derive(Debug, Default, Clone)]
pub struct OverwriteGuard {
    allowed: HashSet<ServiceKey>,
}

impl OverwriteGuard {
    /// Creates a guard with an empty allow-list
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `key` to be replaced
    pub fn allow(mut self, key: impl Into<ServiceKey>) -> Self {
        self.allowed.insert(key.into());
        self
    }

    /// Returns `true` if `key` may be replaced
    #[inline]
    pub fn is_allowed(&self, key: &ServiceKey) -> bool {
        self.allowed.contains(key)
    }
}

impl ValidationPlugin for OverwriteGuard {
    fn validate_registration(&self, event: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
        if event.replaces && !self.is_allowed(event.key) {
            return Err(PluginError::rejected(format!("{} is already registered", event.key)));
        }
        Ok(true)
    }
}

impl IntoPlugin for OverwriteGuard {
    fn into_plugin(self: Arc<Self>) -> (PluginDescriptor, PluginHooks) {
        let descriptor = PluginDescriptor::new(IDENTIFIER)
            .with_capabilities(Capabilities::VALIDATION);
        (descriptor, PluginHooks::new().with_validation(self))
    }
}
