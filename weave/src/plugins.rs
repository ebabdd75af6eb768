//! Built-in plugins
//!
//! Each plugin knows its own [`PluginDescriptor`] and hooks through [`IntoPlugin`],
//! so it can be handed to [`install`] or to [`ContainerBuilder::with_plugin`](weave_di::ContainerBuilder::with_plugin).
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use weave::{Container, plugins::{IntoPlugin, LoggingPlugin, MetricsPlugin, install}};
//!
//! let metrics = Arc::new(MetricsPlugin::new());
//! let (descriptor, hooks) = Arc::new(LoggingPlugin::default()).into_plugin();
//!
//! let container = Container::builder()
//!     .with_plugin(descriptor, hooks)
//!     .build()
//!     .unwrap();
//! install(&container, metrics.clone()).unwrap();
//!
//! container.register_transient("Answer", || 42).unwrap();
//! container.resolve("Answer").unwrap();
//!
//! assert_eq!(metrics.snapshot().resolutions, 1);
//! ```

use std::sync::Arc;
use weave_di::{
    Container,
    error::PluginError,
    plugin::{PluginDescriptor, PluginHooks},
};

pub use self::{
    logging::LoggingPlugin,
    metrics::{MetricsPlugin, MetricsSnapshot},
    overwrite::OverwriteGuard,
};

pub mod logging;
pub mod metrics;
pub mod overwrite;

/// A plugin that describes itself
pub trait IntoPlugin: Send + Sync + 'static {
    /// Splits the plugin into a descriptor and a hooks bundle
    fn into_plugin(self: Arc<Self>) -> (PluginDescriptor, PluginHooks);
}

/// Registers and activates `plugin` in `container`
pub fn install<P: IntoPlugin>(container: &Container, plugin: Arc<P>) -> Result<(), PluginError> {
    let (descriptor, hooks) = plugin.into_plugin();
    let identifier = descriptor.identifier().to_owned();

    container.register_plugin(descriptor, hooks)?;
    container.activate_plugin(&identifier)
}
