//! Describes dependency injection errors

use crate::{
    ServiceKey,
    graph::Cycle,
    plugin::{Capability, Phase, PluginState},
};
use std::{
    error::Error as StdError,
    fmt::{Display, Formatter},
    sync::Arc,
};

/// A shared, cloneable error object raised by user code (factories, plugin hooks)
pub type SharedError = Arc<
    dyn StdError
    + Send
    + Sync
>;

pub(crate) type BoxError = Box<
    dyn StdError
    + Send
    + Sync
>;

/// Errors produced while registering or resolving services
#[derive(Debug, Clone)]
pub enum Error {
    /// Resolution requested for a key with no registration
    NotRegistered(ServiceKey),

    /// Resolution would re-enter a key that is already being resolved by the same call chain
    CycleDetected(Cycle),

    /// The registered factory itself failed
    FactoryFailed {
        /// Key whose factory failed
        key: ServiceKey,
        /// Error raised by the factory
        source: SharedError,
    },

    /// A validation or gating hook blocked the operation
    RejectedByPlugin {
        /// Identifier of the plugin that rejected
        plugin: Arc<str>,
        /// Pipeline phase in which the rejection happened
        phase: Phase,
        /// Underlying plugin error
        source: PluginError,
    },

    /// The resolved instance is not of the requested type
    TypeMismatch {
        /// Key that was resolved
        key: ServiceKey,
        /// Name of the requested type
        expected: &'static str,
    },

    /// An error raised by user code outside of the core taxonomy
    Other(SharedError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotRegistered(key) => write!(f, "DI Error: service not registered: {key}"),
            Error::CycleDetected(cycle) => write!(f, "DI Error: circular dependency detected: {cycle}"),
            Error::FactoryFailed { key, source } => write!(f, "DI Error: factory of {key} failed: {source}"),
            Error::RejectedByPlugin { plugin, phase, source } => {
                write!(f, "DI Error: rejected by plugin {plugin} during {phase}: {source}")
            }
            Error::TypeMismatch { key, expected } => {
                write!(f, "DI Error: service {key} is not of type {expected}")
            }
            Error::Other(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::FactoryFailed { source, .. } => Some(source.as_ref()),
            Error::RejectedByPlugin { source, .. } => Some(source),
            Error::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl Error {
    /// Wraps an arbitrary error raised by a factory or a module
    ///
    /// # Example
    /// ```
    /// use weave_di::error::Error;
    ///
    /// let err = Error::other("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// ```
    #[inline]
    pub fn other<E: Into<BoxError>>(err: E) -> Self {
        Error::Other(Arc::from(err.into()))
    }

    /// Returns `true` if this is a [`Error::NotRegistered`] error
    #[inline]
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Error::NotRegistered(_))
    }

    /// Returns `true` if this is a [`Error::CycleDetected`] error
    #[inline]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Error::CycleDetected(_))
    }

    /// Returns `true` if this is a [`Error::RejectedByPlugin`] error
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Error::RejectedByPlugin { .. })
    }

    /// Returns the detected cycle, if any
    #[inline]
    pub fn cycle(&self) -> Option<&Cycle> {
        match self {
            Error::CycleDetected(cycle) => Some(cycle),
            _ => None,
        }
    }

    /// Returns the service key this error is about, if any
    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            Error::NotRegistered(key) => Some(key),
            Error::FactoryFailed { key, .. } => Some(key),
            Error::TypeMismatch { key, .. } => Some(key),
            Error::CycleDetected(cycle) => cycle.path().first(),
            _ => None,
        }
    }

    /// Converts an error returned from the factory of `key`.
    ///
    /// Core errors raised by nested resolutions pass through unchanged,
    /// foreign errors become [`Error::FactoryFailed`].
    pub(crate) fn into_factory_failure(self, key: &ServiceKey) -> Self {
        match self {
            Error::Other(source) => Error::FactoryFailed { key: key.clone(), source },
            err => err,
        }
    }

    pub(crate) fn rejected(plugin: Arc<str>, phase: Phase, source: PluginError) -> Self {
        Error::RejectedByPlugin { plugin, phase, source }
    }
}

/// Errors produced by plugins and by the plugin pipeline management
#[derive(Debug, Clone)]
pub enum PluginError {
    /// A validator returned `false` or explicitly rejected the operation
    Rejected(String),

    /// A hook raised an error
    Failed(SharedError),

    /// A plugin with the same identifier is already registered
    Duplicate(Arc<str>),

    /// No plugin with this identifier is registered
    NotFound(String),

    /// The requested state change is not allowed
    InvalidTransition {
        /// Plugin identifier
        plugin: Arc<str>,
        /// Current state
        from: PluginState,
        /// Requested state
        to: PluginState,
    },

    /// The descriptor declares a capability with no matching hook
    MissingHook {
        /// Plugin identifier
        plugin: Arc<str>,
        /// Declared capability
        capability: Capability,
    },
}

impl Display for PluginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginError::Rejected(reason) => write!(f, "Plugin Error: rejected: {reason}"),
            PluginError::Failed(err) => write!(f, "Plugin Error: {err}"),
            PluginError::Duplicate(id) => write!(f, "Plugin Error: plugin already registered: {id}"),
            PluginError::NotFound(id) => write!(f, "Plugin Error: plugin not found: {id}"),
            PluginError::InvalidTransition { plugin, from, to } => {
                write!(f, "Plugin Error: plugin {plugin} cannot move from {from:?} to {to:?}")
            }
            PluginError::MissingHook { plugin, capability } => {
                write!(f, "Plugin Error: plugin {plugin} declares {capability:?} but provides no hook for it")
            }
        }
    }
}

impl StdError for PluginError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PluginError::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl PluginError {
    /// Creates a rejection with a human-readable reason
    #[inline]
    pub fn rejected(reason: impl Into<String>) -> Self {
        PluginError::Rejected(reason.into())
    }

    /// Wraps an arbitrary error raised by a hook
    #[inline]
    pub fn failed<E: Into<BoxError>>(err: E) -> Self {
        PluginError::Failed(Arc::from(err.into()))
    }
}
