//! Plugins that observe or veto registration and resolution events
//!
//! A plugin is a [`PluginDescriptor`] (identifier, priority and a set of [`Capabilities`])
//! plus a [`PluginHooks`] bundle holding one implementation per declared capability.
//! The [`PluginPipeline`] dispatches an event to a hook only if the plugin is active
//! and its descriptor declares the matching capability.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use weave_di::{
//!     Container,
//!     error::PluginError,
//!     plugin::{Capabilities, PluginDescriptor, PluginHooks, RegistrationEvent, ValidationPlugin},
//! };
//!
//! struct NoTestKeys;
//!
//! impl ValidationPlugin for NoTestKeys {
//!     fn validate_registration(&self, event: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
//!         Ok(!event.key.as_str().starts_with("test."))
//!     }
//! }
//!
//! let container = Container::new();
//! container.register_plugin(
//!     PluginDescriptor::new("no-test-keys").with_capabilities(Capabilities::VALIDATION),
//!     PluginHooks::new().with_validation(Arc::new(NoTestKeys)),
//! ).unwrap();
//! container.activate_plugin("no-test-keys").unwrap();
//!
//! assert!(container.register_transient("test.db", || 1).is_err());
//! assert!(container.register_transient("db", || 1).is_ok());
//! ```

use crate::{Instance, error::{Error, PluginError}};
use bitflags::bitflags;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

pub use self::{
    event::{Phase, PluginEvent, RegistrationEvent, ResolutionEvent},
    pipeline::PluginPipeline,
};

pub mod event;
pub mod pipeline;

/// A single plugin capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Receives `beforeRegistration`, `afterRegistration` and `onRegistrationFailure`
    Registration,
    /// Receives `beforeResolution`, `afterResolution` and `onResolutionFailure`
    Resolution,
    /// Receives `validateRegistration` and `validateResolution`
    Validation,
    /// Receives `onInitialized`, `beforeReset` and `afterReset`
    Lifecycle,
    /// Observes every event
    Monitoring,
}

bitflags! {
    /// A set of [`Capability`] tags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// See [`Capability::Registration`]
        const REGISTRATION = 1 << 0;
        /// See [`Capability::Resolution`]
        const RESOLUTION = 1 << 1;
        /// See [`Capability::Validation`]
        const VALIDATION = 1 << 2;
        /// See [`Capability::Lifecycle`]
        const LIFECYCLE = 1 << 3;
        /// See [`Capability::Monitoring`]
        const MONITORING = 1 << 4;
    }
}

impl From<Capability> for Capabilities {
    #[inline]
    fn from(capability: Capability) -> Self {
        match capability {
            Capability::Registration => Capabilities::REGISTRATION,
            Capability::Resolution => Capabilities::RESOLUTION,
            Capability::Validation => Capabilities::VALIDATION,
            Capability::Lifecycle => Capabilities::LIFECYCLE,
            Capability::Monitoring => Capabilities::MONITORING,
        }
    }
}

impl Capabilities {
    /// Returns `true` if the set includes `capability`
    #[inline]
    pub fn has(self, capability: Capability) -> bool {
        self.contains(capability.into())
    }
}

/// Lifecycle state of a registered plugin.
///
/// `Registered -> Active -> Inactive -> Active -> ...`, a removed plugin is dropped from the pipeline.
/// Only `Active` plugins receive events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Registered but never activated
    Registered,
    /// Receives events
    Active,
    /// Deactivated, keeps its position in the pipeline
    Inactive,
}

/// Identity, ordering and capabilities of a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    identifier: Arc<str>,
    priority: i32,
    capabilities: Capabilities,
}

impl PluginDescriptor {
    /// Creates a descriptor with priority `0` and no capabilities
    #[inline]
    pub fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self {
            identifier: identifier.into(),
            priority: 0,
            capabilities: Capabilities::empty(),
        }
    }

    /// Sets the priority, lower runs first
    ///
    /// Default: `0`
    #[inline]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds capabilities to the descriptor
    #[inline]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities |= capabilities;
        self
    }

    /// Plugin identifier
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Plugin priority
    #[inline]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Declared capabilities
    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}

/// Hooks for [`Capability::Registration`]. Errors from `before_registration` abort the registration.
pub trait RegistrationPlugin: Send + Sync {
    /// Called before a registration is stored
    fn before_registration(&self, _event: &RegistrationEvent<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called after a registration is stored
    fn after_registration(&self, _event: &RegistrationEvent<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when a registration was rejected
    fn on_registration_failure(&self, _event: &RegistrationEvent<'_>, _error: &Error) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Hooks for [`Capability::Resolution`]. Errors from `before_resolution` abort the resolution.
pub trait ResolutionPlugin: Send + Sync {
    /// Called before the scope rules are applied and the factory is invoked
    fn before_resolution(&self, _event: &ResolutionEvent<'_>) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called after a successful resolution
    fn after_resolution(&self, _event: &ResolutionEvent<'_>, _instance: &Instance) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called after a failed resolution
    fn on_resolution_failure(&self, _event: &ResolutionEvent<'_>, _error: &Error) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Hooks for [`Capability::Validation`].
///
/// Returning `Ok(false)` or an error fails the operation with [`Error::RejectedByPlugin`]
/// and stops the chain.
pub trait ValidationPlugin: Send + Sync {
    /// Validates a registration before it is stored
    fn validate_registration(&self, _event: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
        Ok(true)
    }

    /// Validates a resolution before the factory is invoked
    fn validate_resolution(&self, _event: &ResolutionEvent<'_>) -> Result<bool, PluginError> {
        Ok(true)
    }
}

/// Hooks for [`Capability::Lifecycle`]
pub trait LifecyclePlugin: Send + Sync {
    /// Called once a container built with [`crate::ContainerBuilder`] is ready
    fn on_initialized(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called before the container is reset
    fn before_reset(&self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called after the container was reset
    fn after_reset(&self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Hook for [`Capability::Monitoring`]. Observes every event, never gates an operation.
pub trait MonitoringPlugin: Send + Sync {
    /// Called for every dispatched event
    fn observe(&self, event: &PluginEvent<'_>) -> Result<(), PluginError>;
}

/// One optional implementation per capability
#[derive(Clone, Default)]
pub struct PluginHooks {
    pub(crate) registration: Option<Arc<dyn RegistrationPlugin>>,
    pub(crate) resolution: Option<Arc<dyn ResolutionPlugin>>,
    pub(crate) validation: Option<Arc<dyn ValidationPlugin>>,
    pub(crate) lifecycle: Option<Arc<dyn LifecyclePlugin>>,
    pub(crate) monitoring: Option<Arc<dyn MonitoringPlugin>>,
}

impl Debug for PluginHooks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHooks")
            .field("registration", &self.registration.is_some())
            .field("resolution", &self.resolution.is_some())
            .field("validation", &self.validation.is_some())
            .field("lifecycle", &self.lifecycle.is_some())
            .field("monitoring", &self.monitoring.is_some())
            .finish()
    }
}

impl PluginHooks {
    /// Creates an empty bundle
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [`RegistrationPlugin`] hook
    #[inline]
    pub fn with_registration<P: RegistrationPlugin + 'static>(mut self, hook: Arc<P>) -> Self {
        self.registration = Some(hook);
        self
    }

    /// Sets the [`ResolutionPlugin`] hook
    #[inline]
    pub fn with_resolution<P: ResolutionPlugin + 'static>(mut self, hook: Arc<P>) -> Self {
        self.resolution = Some(hook);
        self
    }

    /// Sets the [`ValidationPlugin`] hook
    #[inline]
    pub fn with_validation<P: ValidationPlugin + 'static>(mut self, hook: Arc<P>) -> Self {
        self.validation = Some(hook);
        self
    }

    /// Sets the [`LifecyclePlugin`] hook
    #[inline]
    pub fn with_lifecycle<P: LifecyclePlugin + 'static>(mut self, hook: Arc<P>) -> Self {
        self.lifecycle = Some(hook);
        self
    }

    /// Sets the [`MonitoringPlugin`] hook
    #[inline]
    pub fn with_monitoring<P: MonitoringPlugin + 'static>(mut self, hook: Arc<P>) -> Self {
        self.monitoring = Some(hook);
        self
    }

    /// Returns `true` if a hook for `capability` is present
    pub fn provides(&self, capability: Capability) -> bool {
        match capability {
            Capability::Registration => self.registration.is_some(),
            Capability::Resolution => self.resolution.is_some(),
            Capability::Validation => self.validation.is_some(),
            Capability::Lifecycle => self.lifecycle.is_some(),
            Capability::Monitoring => self.monitoring.is_some(),
        }
    }

    /// Runs the hook responsible for `event`, if any.
    ///
    /// The monitoring hook is not called here.
    pub(crate) fn deliver(&self, event: &PluginEvent<'_>) -> Result<(), PluginError> {
        match *event {
            PluginEvent::ValidateRegistration(e) => match &self.validation {
                Some(hook) => verdict(hook.validate_registration(e)?, e.key.as_str()),
                None => Ok(()),
            },
            PluginEvent::ValidateResolution(e) => match &self.validation {
                Some(hook) => verdict(hook.validate_resolution(e)?, e.key.as_str()),
                None => Ok(()),
            },
            PluginEvent::BeforeRegistration(e) => self.registration
                .as_ref()
                .map_or(Ok(()), |hook| hook.before_registration(e)),
            PluginEvent::AfterRegistration(e) => self.registration
                .as_ref()
                .map_or(Ok(()), |hook| hook.after_registration(e)),
            PluginEvent::RegistrationFailed { registration, error } => self.registration
                .as_ref()
                .map_or(Ok(()), |hook| hook.on_registration_failure(registration, error)),
            PluginEvent::BeforeResolution(e) => self.resolution
                .as_ref()
                .map_or(Ok(()), |hook| hook.before_resolution(e)),
            PluginEvent::AfterResolution { resolution, instance, .. } => self.resolution
                .as_ref()
                .map_or(Ok(()), |hook| hook.after_resolution(resolution, instance)),
            PluginEvent::ResolutionFailed { resolution, error, .. } => self.resolution
                .as_ref()
                .map_or(Ok(()), |hook| hook.on_resolution_failure(resolution, error)),
            PluginEvent::Initialized => self.lifecycle
                .as_ref()
                .map_or(Ok(()), |hook| hook.on_initialized()),
            PluginEvent::BeforeReset => self.lifecycle
                .as_ref()
                .map_or(Ok(()), |hook| hook.before_reset()),
            PluginEvent::AfterReset => self.lifecycle
                .as_ref()
                .map_or(Ok(()), |hook| hook.after_reset()),
        }
    }
}

#[inline]
fn verdict(accepted: bool, key: &str) -> Result<(), PluginError> {
    if accepted {
        Ok(())
    } else {
        Err(PluginError::rejected(format!("validation failed for {key}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use super::*;
    use crate::{Scope, ServiceKey};

    struct Deny;

    impl ValidationPlugin for Deny {
        fn validate_registration(&self, _: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
            Ok(false)
        }
    }

    #[test]
    fn it_converts_capability_to_set() {
        let set = Capabilities::VALIDATION | Capabilities::MONITORING;

        assert!(set.has(Capability::Validation));
        assert!(set.has(Capability::Monitoring));
        assert!(!set.has(Capability::Resolution));
    }

    #[test]
    fn it_builds_descriptor() {
        let descriptor = PluginDescriptor::new("audit")
            .with_priority(-5)
            .with_capabilities(Capabilities::REGISTRATION)
            .with_capabilities(Capabilities::LIFECYCLE);

        assert_eq!(descriptor.identifier(), "audit");
        assert_eq!(descriptor.priority(), -5);
        assert_eq!(descriptor.capabilities(), Capabilities::REGISTRATION | Capabilities::LIFECYCLE);
    }

    #[test]
    fn it_turns_false_verdict_into_rejection() {
        let hooks = PluginHooks::new().with_validation(Arc::new(Deny));
        let key = ServiceKey::from("A");
        let event = RegistrationEvent { key: &key, scope: Scope::Singleton, source_tag: None, replaces: false };

        let result = hooks.deliver(&PluginEvent::ValidateRegistration(&event));

        assert!(matches!(result, Err(PluginError::Rejected(_))));
        assert!(hooks.deliver(&PluginEvent::Initialized).is_ok());
        assert!(hooks.provides(Capability::Validation));
        assert!(!hooks.provides(Capability::Lifecycle));
    }
}
