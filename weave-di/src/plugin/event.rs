//! Events delivered through the plugin pipeline

use crate::{Instance, Scope, ServiceKey, error::Error};
use super::Capability;
use std::{
    fmt::{Display, Formatter},
    time::Duration,
};

/// A pipeline phase, used to route events and to report rejections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before a registration is validated and stored
    BeforeRegistration,
    /// After a registration is stored
    AfterRegistration,
    /// A registration was rejected
    OnRegistrationFailure,
    /// Before the factory of a service is invoked
    BeforeResolution,
    /// After a service was resolved
    AfterResolution,
    /// A resolution failed
    OnResolutionFailure,
    /// Validation of a registration
    ValidateRegistration,
    /// Validation of a resolution
    ValidateResolution,
    /// A container finished its construction
    OnInitialized,
    /// Before a container is reset
    BeforeReset,
    /// After a container was reset
    AfterReset,
}

impl Phase {
    /// Capability a plugin must declare to receive this phase
    #[inline]
    pub fn capability(self) -> Capability {
        match self {
            Phase::BeforeRegistration
            | Phase::AfterRegistration
            | Phase::OnRegistrationFailure => Capability::Registration,
            Phase::BeforeResolution
            | Phase::AfterResolution
            | Phase::OnResolutionFailure => Capability::Resolution,
            Phase::ValidateRegistration
            | Phase::ValidateResolution => Capability::Validation,
            Phase::OnInitialized
            | Phase::BeforeReset
            | Phase::AfterReset => Capability::Lifecycle,
        }
    }

    /// Returns `true` if a failing hook in this phase aborts the surrounding operation
    #[inline]
    pub fn is_gating(self) -> bool {
        matches!(
            self,
            Phase::ValidateRegistration
                | Phase::BeforeRegistration
                | Phase::ValidateResolution
                | Phase::BeforeResolution
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::BeforeRegistration => "beforeRegistration",
            Phase::AfterRegistration => "afterRegistration",
            Phase::OnRegistrationFailure => "onRegistrationFailure",
            Phase::BeforeResolution => "beforeResolution",
            Phase::AfterResolution => "afterResolution",
            Phase::OnResolutionFailure => "onResolutionFailure",
            Phase::ValidateRegistration => "validateRegistration",
            Phase::ValidateResolution => "validateResolution",
            Phase::OnInitialized => "onInitialized",
            Phase::BeforeReset => "beforeReset",
            Phase::AfterReset => "afterReset",
        };
        f.write_str(name)
    }
}

/// Describes a registration going through the pipeline
#[derive(Debug, Clone, Copy)]
pub struct RegistrationEvent<'a> {
    /// Key being registered
    pub key: &'a ServiceKey,
    /// Requested scope
    pub scope: Scope,
    /// Optional origin of the registration, e.g. a module name
    pub source_tag: Option<&'a str>,
    /// `true` if a registration for this key already exists and would be replaced
    pub replaces: bool,
}

/// Describes a resolution going through the pipeline
#[derive(Debug, Clone, Copy)]
pub struct ResolutionEvent<'a> {
    /// Key being resolved
    pub key: &'a ServiceKey,
    /// Scope of the registration, `None` if the key is not registered
    pub scope: Option<Scope>,
    /// Key whose factory requested this resolution, `None` for root resolutions
    pub requested_by: Option<&'a ServiceKey>,
    /// Depth in the resolution chain, `0` for root resolutions
    pub depth: usize,
}

/// An event dispatched to plugins
#[derive(Debug, Clone, Copy)]
pub enum PluginEvent<'a> {
    /// See [`Phase::ValidateRegistration`]
    ValidateRegistration(&'a RegistrationEvent<'a>),
    /// See [`Phase::BeforeRegistration`]
    BeforeRegistration(&'a RegistrationEvent<'a>),
    /// See [`Phase::AfterRegistration`]
    AfterRegistration(&'a RegistrationEvent<'a>),
    /// See [`Phase::OnRegistrationFailure`]
    RegistrationFailed {
        /// Rejected registration
        registration: &'a RegistrationEvent<'a>,
        /// Reason
        error: &'a Error,
    },
    /// See [`Phase::ValidateResolution`]
    ValidateResolution(&'a ResolutionEvent<'a>),
    /// See [`Phase::BeforeResolution`]
    BeforeResolution(&'a ResolutionEvent<'a>),
    /// See [`Phase::AfterResolution`]
    AfterResolution {
        /// Completed resolution
        resolution: &'a ResolutionEvent<'a>,
        /// Resolved instance
        instance: &'a Instance,
        /// Time spent in the resolution, nested resolutions included
        elapsed: Duration,
    },
    /// See [`Phase::OnResolutionFailure`]
    ResolutionFailed {
        /// Failed resolution
        resolution: &'a ResolutionEvent<'a>,
        /// Reason
        error: &'a Error,
        /// Time spent before the failure
        elapsed: Duration,
    },
    /// See [`Phase::OnInitialized`]
    Initialized,
    /// See [`Phase::BeforeReset`]
    BeforeReset,
    /// See [`Phase::AfterReset`]
    AfterReset,
}

impl PluginEvent<'_> {
    /// Returns the phase of this event
    pub fn phase(&self) -> Phase {
        match self {
            PluginEvent::ValidateRegistration(_) => Phase::ValidateRegistration,
            PluginEvent::BeforeRegistration(_) => Phase::BeforeRegistration,
            PluginEvent::AfterRegistration(_) => Phase::AfterRegistration,
            PluginEvent::RegistrationFailed { .. } => Phase::OnRegistrationFailure,
            PluginEvent::ValidateResolution(_) => Phase::ValidateResolution,
            PluginEvent::BeforeResolution(_) => Phase::BeforeResolution,
            PluginEvent::AfterResolution { .. } => Phase::AfterResolution,
            PluginEvent::ResolutionFailed { .. } => Phase::OnResolutionFailure,
            PluginEvent::Initialized => Phase::OnInitialized,
            PluginEvent::BeforeReset => Phase::BeforeReset,
            PluginEvent::AfterReset => Phase::AfterReset,
        }
    }

    /// Key the event is about, if any
    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            PluginEvent::ValidateRegistration(e)
            | PluginEvent::BeforeRegistration(e)
            | PluginEvent::AfterRegistration(e)
            | PluginEvent::RegistrationFailed { registration: e, .. } => Some(e.key),
            PluginEvent::ValidateResolution(e)
            | PluginEvent::BeforeResolution(e)
            | PluginEvent::AfterResolution { resolution: e, .. }
            | PluginEvent::ResolutionFailed { resolution: e, .. } => Some(e.key),
            PluginEvent::Initialized
            | PluginEvent::BeforeReset
            | PluginEvent::AfterReset => None,
        }
    }
}
