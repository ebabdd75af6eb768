//! Plugin that logs every pipeline event with `tracing`

use super::IntoPlugin;
use std::sync::Arc;
use tracing::Level;
use weave_di::{
    ServiceKey,
    error::PluginError,
    plugin::{Capabilities, MonitoringPlugin, PluginDescriptor, PluginEvent, PluginHooks},
};

const IDENTIFIER: &str = "weave.logging";

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            _ => tracing::trace!($($arg)+),
        }
    };
}

/// Logs registrations, resolutions, failures and lifecycle events.
///
/// Failures are always logged at `WARN` or above, everything else at the configured level.
#[derive(Debug, Clone, Copy)]
pub struct LoggingPlugin {
    /// Level of regular events
    ///
    /// Default: `DEBUG`
    level: Level,

    /// Pipeline priority
    ///
    /// Default: `i32::MIN`, runs before every other plugin
    priority: i32,
}

impl Default for LoggingPlugin {
    #[inline]
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            priority: i32::MIN,
        }
    }
}

impl LoggingPlugin {
    /// Creates a logging plugin with the given level for regular events
    pub fn new(level: Level) -> Self {
        Self { level, ..Self::default() }
    }

    /// Sets the pipeline priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Level of regular events
    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }
}

impl MonitoringPlugin for LoggingPlugin {
    fn observe(&self, event: &PluginEvent<'_>) -> Result<(), PluginError> {
        let phase = event.phase();
        let key = event.key().map_or("", ServiceKey::as_str);

        match event {
            PluginEvent::RegistrationFailed { error, .. } => {
                tracing::warn!(%phase, key, %error, "registration failed");
            }
            PluginEvent::ResolutionFailed { error, elapsed, resolution } => {
                tracing::warn!(%phase, key, depth = resolution.depth, ?elapsed, %error, "resolution failed");
            }
            PluginEvent::AfterResolution { elapsed, resolution, .. } => {
                log_at!(self.level, %phase, key, depth = resolution.depth, ?elapsed, "service resolved");
            }
            PluginEvent::AfterRegistration(registration) => {
                log_at!(
                    self.level,
                    %phase,
                    key,
                    scope = ?registration.scope,
                    replaces = registration.replaces,
                    "service registered"
                );
            }
            _ => log_at!(self.level, %phase, key, "container event"),
        }
        Ok(())
    }
}

impl IntoPlugin for LoggingPlugin {
    fn into_plugin(self: Arc<Self>) -> (PluginDescriptor, PluginHooks) {
        let descriptor = PluginDescriptor::new(IDENTIFIER)
            .with_priority(self.priority)
            .with_capabilities(Capabilities::MONITORING);
        (descriptor, PluginHooks::new().with_monitoring(self))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tracing::Level;
    use weave_di::Container;
    use super::LoggingPlugin;
    use crate::plugins::install;

    #[test]
    fn it_observes_without_affecting_operations() {
        let container = Container::new();
        install(&container, Arc::new(LoggingPlugin::new(Level::INFO))).unwrap();

        container.register_transient("Answer", || 42).unwrap();

        assert!(container.resolve("Answer").is_ok());
        assert!(container.resolve("Ghost").is_err());
        assert_eq!(container.plugins()[0].identifier(), "weave.logging");
    }

    #[test]
    fn it_runs_first_by_default() {
        let plugin = LoggingPlugin::default();

        assert_eq!(plugin.level(), Level::DEBUG);
        assert_eq!(plugin.with_priority(5).priority, 5);
    }
}
