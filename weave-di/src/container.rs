//! Dependency Injection container and tools

use self::{
    factory::{FactoryFn, make_factory_fn},
    resolver::downcast,
    store::RegistrationStore,
    wait_graph::WaitGraph,
};
use crate::{
    Inject, Instance, ServiceKey,
    config::ContainerConfig,
    error::{Error, PluginError},
    graph::{Cycle, DependencyGraph, GraphEdge, GraphStatistics},
    plugin::{PluginDescriptor, PluginEvent, PluginHooks, PluginPipeline, PluginState, RegistrationEvent},
};
use std::sync::Arc;

pub use self::{
    batch::{BuildFailure, BuildReport, Module, NamedModule, module},
    factory::{GenericFactory, WithResolver},
    registration::{Registration, Scope},
    resolver::{ResolutionFrame, Resolver},
};

mod batch;
mod factory;
mod registration;
mod resolver;
mod store;
mod wait_graph;

/// Represents a DI container builder,
/// that applies a configuration and a set of plugins before the container is used.
#[derive(Debug, Default)]
pub struct ContainerBuilder {
    config: ContainerConfig,
    plugins: Vec<(PluginDescriptor, PluginHooks)>,
}

impl ContainerBuilder {
    /// Creates a new DI container builder
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the container
    ///
    /// # Example
    /// ```
    /// use weave_di::Container;
    ///
    /// let container = Container::builder()
    ///     .with_config(|cfg| cfg
    ///         .with_max_build_concurrency(4)
    ///         .with_stop_on_observer_error(true))
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(container.config().max_build_concurrency(), 4);
    /// ```
    pub fn with_config<T>(mut self, config: T) -> Self
    where
        T: FnOnce(ContainerConfig) -> ContainerConfig
    {
        self.config = config(self.config);
        self
    }

    /// Replaces the container configuration
    pub fn set_config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a plugin that is registered and activated when the container is built
    pub fn with_plugin(mut self, descriptor: PluginDescriptor, hooks: PluginHooks) -> Self {
        self.plugins.push((descriptor, hooks));
        self
    }

    /// Builds a DI container
    ///
    /// Registers and activates the plugins in the order they were added,
    /// then dispatches the `onInitialized` lifecycle event.
    pub fn build(self) -> Result<Container, PluginError> {
        let container = Container::from_config(self.config);
        for (descriptor, hooks) in self.plugins {
            let identifier = descriptor.identifier().to_owned();
            container.inner.plugins.register(descriptor, hooks)?;
            container.inner.plugins.activate(&identifier)?;
        }

        _ = container.inner.plugins.dispatch(&PluginEvent::Initialized);
        tracing::debug!(config = ?container.inner.config, "container initialized");

        Ok(container)
    }
}

#[derive(Debug)]
struct ContainerInner {
    config: ContainerConfig,
    store: RegistrationStore,
    graph: DependencyGraph,
    plugins: PluginPipeline,
    waits: WaitGraph,
}

/// Represents a DI container, that is able to register and resolve services
/// by their [`ServiceKey`].
///
/// Cloning is cheap, every clone shares the same registrations, graph and plugins.
///
/// # Example
/// ```
/// use weave_di::{Container, Resolver, error::Error};
///
/// struct Config { url: &'static str }
/// struct Database { url: &'static str }
///
/// let container = Container::new();
/// container.register_singleton("Config", || Config { url: "postgres://localhost" }).unwrap();
/// container.register_transient("Database", |r: &Resolver| -> Result<Database, Error> {
///     let config = r.resolve_as::<Config>("Config")?;
///     Ok(Database { url: config.url })
/// }).unwrap();
///
/// let db = container.resolve_as::<Database>("Database").unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// assert_eq!(container.graph_edges().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container with the default configuration and no plugins
    #[inline]
    pub fn new() -> Self {
        Self::from_config(ContainerConfig::default())
    }

    /// Creates a new DI container builder
    #[inline]
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    fn from_config(config: ContainerConfig) -> Self {
        let plugins = PluginPipeline::new()
            .with_stop_on_observer_error(config.stop_on_observer_error());
        Self {
            inner: Arc::new(ContainerInner {
                config,
                store: RegistrationStore::new(),
                graph: DependencyGraph::new(),
                plugins,
                waits: WaitGraph::default(),
            })
        }
    }

    /// Current configuration
    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Registers a factory under `key` with the given scope.
    ///
    /// Replaces any existing registration for `key`, its cached singleton included,
    /// unless a plugin rejects the registration.
    pub fn register<T, F, Args>(
        &self,
        key: impl Into<ServiceKey>,
        scope: Scope,
        factory: F
    ) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>
    {
        self.insert(key.into(), scope, None, make_factory_fn(factory), None)
    }

    /// Registers a factory that runs at most once
    #[inline]
    pub fn register_singleton<T, F, Args>(&self, key: impl Into<ServiceKey>, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>
    {
        self.register(key, Scope::Singleton, factory)
    }

    /// Registers a factory that runs at most once, on the first resolution
    #[inline]
    pub fn register_lazy_singleton<T, F, Args>(&self, key: impl Into<ServiceKey>, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>
    {
        self.register(key, Scope::LazySingleton, factory)
    }

    /// Registers a factory that runs on every resolution
    #[inline]
    pub fn register_transient<T, F, Args>(&self, key: impl Into<ServiceKey>, factory: F) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>
    {
        self.register(key, Scope::Transient, factory)
    }

    /// Registers an already constructed singleton instance
    pub fn register_instance<T>(&self, key: impl Into<ServiceKey>, instance: T) -> Result<(), Error>
    where
        T: Send + Sync + 'static
    {
        let key = key.into();
        let instance: Instance = Arc::new(instance);
        let factory: FactoryFn = {
            let instance = instance.clone();
            Arc::new(move |_: &Resolver| -> Result<Instance, Error> { Ok(instance.clone()) })
        };
        self.insert(key, Scope::Singleton, None, factory, Some(instance))
    }

    /// Registers a factory and records where the registration comes from
    pub fn register_tagged<T, F, Args>(
        &self,
        tag: impl Into<Arc<str>>,
        key: impl Into<ServiceKey>,
        scope: Scope,
        factory: F
    ) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>
    {
        self.insert(key.into(), scope, Some(tag.into()), make_factory_fn(factory), None)
    }

    /// Registers `T` under [`ServiceKey::of::<T>`], constructed through [`Inject`]
    ///
    /// # Example
    /// ```
    /// use weave_di::{Container, Scope};
    ///
    /// #[derive(Default)]
    /// struct Cache;
    ///
    /// let container = Container::new();
    /// container.register_type::<Cache>(Scope::Singleton).unwrap();
    ///
    /// assert!(container.resolve_type::<Cache>().is_ok());
    /// ```
    pub fn register_type<T: Inject>(&self, scope: Scope) -> Result<(), Error> {
        self.register(ServiceKey::of::<T>(), scope, |r: &Resolver| T::inject(r))
    }

    fn insert(
        &self,
        key: ServiceKey,
        scope: Scope,
        source_tag: Option<Arc<str>>,
        factory: FactoryFn,
        instance: Option<Instance>,
    ) -> Result<(), Error> {
        let lock = self.inner.store.write_lock(&key);
        let _guard = lock.lock();

        let event = RegistrationEvent {
            key: &key,
            scope,
            source_tag: source_tag.as_deref(),
            replaces: self.inner.store.contains(&key),
        };

        let plugins = &self.inner.plugins;
        let gate = plugins
            .dispatch(&PluginEvent::ValidateRegistration(&event))
            .and_then(|_| plugins.dispatch(&PluginEvent::BeforeRegistration(&event)));
        if let Err(error) = gate {
            tracing::debug!(key = %key, %error, "registration rejected");
            _ = plugins.dispatch(&PluginEvent::RegistrationFailed {
                registration: &event,
                error: &error,
            });
            return Err(error);
        }

        let mut registration = Registration::new(key.clone(), scope, source_tag.clone(), factory);
        if let Some(instance) = instance {
            registration = registration.with_instance(instance);
        }
        self.inner.store.put(registration);

        tracing::debug!(key = %key, ?scope, replaced = event.replaces, "service registered");
        _ = plugins.dispatch(&PluginEvent::AfterRegistration(&event));

        Ok(())
    }

    /// Removes the registration for `key`, returns `false` if there was none
    #[inline]
    pub fn unregister(&self, key: impl Into<ServiceKey>) -> bool {
        let key = key.into();
        let lock = self.inner.store.write_lock(&key);
        let _guard = lock.lock();
        self.inner.store.remove(&key).is_some()
    }

    /// Resolves a service as a type-erased shared instance
    #[inline]
    pub fn resolve(&self, key: impl Into<ServiceKey>) -> Result<Instance, Error> {
        self.resolve_in(key.into(), None)
    }

    /// Resolves a service and downcasts it to `T`
    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>) -> Result<Arc<T>, Error> {
        let key = key.into();
        let instance = self.resolve_in(key.clone(), None)?;
        downcast(key, instance)
    }

    /// Resolves a service registered under [`ServiceKey::of::<T>`]
    #[inline]
    pub fn resolve_type<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.resolve_as::<T>(ServiceKey::of::<T>())
    }

    /// Returns `true` if `key` has a registration
    #[inline]
    pub fn is_registered(&self, key: impl Into<ServiceKey>) -> bool {
        self.inner.store.contains(&key.into())
    }

    /// Returns the current registration record for `key`
    #[inline]
    pub fn registration(&self, key: impl Into<ServiceKey>) -> Option<Arc<Registration>> {
        self.inner.store.get(&key.into())
    }

    /// Registered keys, sorted
    #[inline]
    pub fn keys(&self) -> Vec<ServiceKey> {
        self.inner.store.keys()
    }

    /// Number of registrations
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns `true` if nothing is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records that `from` depends on `to` without resolving either of them,
    /// so [`Container::detect_all_cycles`] can see paths that were never resolved.
    ///
    /// Returns `false` if the edge was already recorded.
    #[inline]
    pub fn declare_dependency(&self, from: impl Into<ServiceKey>, to: impl Into<ServiceKey>) -> bool {
        self.inner.graph.add_edge(from.into(), to.into())
    }

    /// Snapshot of the recorded dependency edges in insertion order
    #[inline]
    pub fn graph_edges(&self) -> Vec<GraphEdge> {
        self.inner.graph.edges()
    }

    /// Runs a full scan of the recorded graph and returns every cycle found
    #[inline]
    pub fn detect_all_cycles(&self) -> Vec<Cycle> {
        self.inner.graph.detect_all_cycles()
    }

    /// Node and edge counts of the recorded graph
    #[inline]
    pub fn graph_statistics(&self) -> GraphStatistics {
        self.inner.graph.statistics()
    }

    /// The recorded dependency graph
    #[inline]
    pub fn graph(&self) -> &DependencyGraph {
        &self.inner.graph
    }

    /// Registers a plugin, it receives no events until activated
    #[inline]
    pub fn register_plugin(&self, descriptor: PluginDescriptor, hooks: PluginHooks) -> Result<(), PluginError> {
        self.inner.plugins.register(descriptor, hooks)
    }

    /// Activates a registered plugin
    #[inline]
    pub fn activate_plugin(&self, identifier: &str) -> Result<(), PluginError> {
        self.inner.plugins.activate(identifier)
    }

    /// Deactivates an active plugin
    #[inline]
    pub fn deactivate_plugin(&self, identifier: &str) -> Result<(), PluginError> {
        self.inner.plugins.deactivate(identifier)
    }

    /// Activates or deactivates a plugin
    #[inline]
    pub fn set_plugin_active(&self, identifier: &str, active: bool) -> Result<(), PluginError> {
        if active {
            self.activate_plugin(identifier)
        } else {
            self.deactivate_plugin(identifier)
        }
    }

    /// Removes a plugin from the pipeline
    #[inline]
    pub fn remove_plugin(&self, identifier: &str) -> Result<(), PluginError> {
        self.inner.plugins.remove(identifier)
    }

    /// Returns the state of a plugin, `None` if it is not registered
    #[inline]
    pub fn plugin_state(&self, identifier: &str) -> Option<PluginState> {
        self.inner.plugins.state(identifier)
    }

    /// Descriptors of all registered plugins in dispatch order
    #[inline]
    pub fn plugins(&self) -> Vec<PluginDescriptor> {
        self.inner.plugins.descriptors()
    }

    /// Clears every registration, cached singleton and recorded edge.
    ///
    /// Plugins and configuration are kept.
    pub fn reset(&self) {
        _ = self.inner.plugins.dispatch(&PluginEvent::BeforeReset);

        let registrations = self.inner.store.len();
        self.inner.store.remove_all();
        self.inner.graph.reset();

        tracing::debug!(registrations, "container reset");
        _ = self.inner.plugins.dispatch(&PluginEvent::AfterReset);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use super::{Container, Resolver, Scope};
    use crate::{
        ServiceKey,
        error::{Error, PluginError},
        plugin::{
            Capabilities, LifecyclePlugin, PluginDescriptor, PluginHooks,
            PluginState, RegistrationEvent, ValidationPlugin,
        },
    };

    #[derive(Default)]
    struct InMemoryCache;

    struct RejectAll;

    impl ValidationPlugin for RejectAll {
        fn validate_registration(&self, _: &RegistrationEvent<'_>) -> Result<bool, PluginError> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct Lifecycle {
        initialized: AtomicUsize,
        resets: AtomicUsize,
    }

    impl LifecyclePlugin for Lifecycle {
        fn on_initialized(&self) -> Result<(), PluginError> {
            self.initialized.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn after_reset(&self) -> Result<(), PluginError> {
            self.resets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn it_registers_singleton() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let counter = calls.clone();
        container.register_singleton("Cache", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            InMemoryCache
        }).unwrap();

        let first = container.resolve_as::<InMemoryCache>("Cache").unwrap();
        let second = container.resolve_as::<InMemoryCache>("Cache").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(container.registration("Cache").unwrap().is_instantiated());
    }

    #[test]
    fn it_registers_transient() {
        let container = Container::new();
        container.register_transient("Cache", || InMemoryCache).unwrap();

        let first = container.resolve("Cache").unwrap();
        let second = container.resolve("Cache").unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!container.registration("Cache").unwrap().is_instantiated());
    }

    #[test]
    fn it_registers_instance() {
        let container = Container::new();
        container.register_instance("Port", 8080_u16).unwrap();

        let registration = container.registration("Port").unwrap();

        assert!(registration.is_instantiated());
        assert_eq!(registration.scope(), Scope::Singleton);
        assert_eq!(*container.resolve_as::<u16>("Port").unwrap(), 8080);
    }

    #[test]
    fn it_registers_tagged() {
        let container = Container::new();
        container.register_tagged("storage", "Cache", Scope::LazySingleton, || InMemoryCache).unwrap();

        let registration = container.registration("Cache").unwrap();

        assert_eq!(registration.source_tag(), Some("storage"));
        assert_eq!(registration.scope(), Scope::LazySingleton);
    }

    #[test]
    fn it_registers_type() {
        let container = Container::new();
        container.register_type::<InMemoryCache>(Scope::Transient).unwrap();

        assert!(container.is_registered(ServiceKey::of::<InMemoryCache>()));
        assert!(container.resolve_type::<InMemoryCache>().is_ok());
    }

    #[test]
    fn it_replaces_registration_and_its_singleton() {
        let container = Container::new();
        container.register_singleton("Value", || 1_u32).unwrap();
        assert_eq!(*container.resolve_as::<u32>("Value").unwrap(), 1);

        container.register_singleton("Value", || 2_u32).unwrap();

        assert_eq!(*container.resolve_as::<u32>("Value").unwrap(), 2);
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn it_returns_error_when_resolve_unregistered() {
        let container = Container::new();

        let err = container.resolve("Ghost").unwrap_err();

        assert!(matches!(err, Error::NotRegistered(key) if key == "Ghost"));
    }

    #[test]
    fn it_returns_type_mismatch() {
        let container = Container::new();
        container.register_transient("Number", || 1_u8).unwrap();

        let err = container.resolve_as::<String>("Number").unwrap_err();

        assert!(matches!(err, Error::TypeMismatch { key, .. } if key == "Number"));
    }

    #[test]
    fn it_wraps_factory_errors() {
        let container = Container::new();
        container.register_transient("Database", |_: &Resolver| -> Result<u8, Error> {
            Err(Error::other("connection refused"))
        }).unwrap();

        let err = container.resolve("Database").unwrap_err();

        assert!(matches!(&err, Error::FactoryFailed { key, .. } if key == "Database"));
        assert_eq!(err.to_string(), "DI Error: factory of Database failed: connection refused");
    }

    #[test]
    fn it_unregisters() {
        let container = Container::new();
        container.register_transient("A", || ()).unwrap();

        assert!(container.unregister("A"));
        assert!(!container.unregister("A"));
        assert!(container.is_empty());
    }

    #[test]
    fn it_records_edges_of_nested_resolutions() {
        let container = Container::new();
        container.register_transient("B", || 'b').unwrap();
        container.register_transient("A", |r: &Resolver| r.resolve("B").map(|_| 'a')).unwrap();

        container.resolve("A").unwrap();

        let edges = container.graph_edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, "A");
        assert_eq!(edges[0].to, "B");
        assert_eq!(container.graph_statistics().node_count, 2);
    }

    #[test]
    fn it_vetoes_registration() {
        let container = Container::new();
        container.register_plugin(
            PluginDescriptor::new("reject-all").with_capabilities(Capabilities::VALIDATION),
            PluginHooks::new().with_validation(Arc::new(RejectAll)),
        ).unwrap();

        assert!(container.register_transient("A", || ()).is_ok());

        container.activate_plugin("reject-all").unwrap();
        let err = container.register_transient("B", || ()).unwrap_err();

        assert!(err.is_rejected());
        assert!(!container.is_registered("B"));

        container.set_plugin_active("reject-all", false).unwrap();
        assert_eq!(container.plugin_state("reject-all"), Some(PluginState::Inactive));
        assert!(container.register_transient("B", || ()).is_ok());
    }

    #[test]
    fn it_dispatches_lifecycle_events() {
        let lifecycle = Arc::new(Lifecycle::default());
        let container = Container::builder()
            .with_plugin(
                PluginDescriptor::new("lifecycle").with_capabilities(Capabilities::LIFECYCLE),
                PluginHooks::new().with_lifecycle(lifecycle.clone()),
            )
            .build()
            .unwrap();

        container.reset();

        assert_eq!(container.plugin_state("lifecycle"), Some(PluginState::Active));
        assert_eq!(lifecycle.initialized.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.resets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn it_fails_build_on_duplicate_plugins() {
        let result = Container::builder()
            .with_plugin(PluginDescriptor::new("same"), PluginHooks::new())
            .with_plugin(PluginDescriptor::new("same"), PluginHooks::new())
            .build();

        assert!(matches!(result, Err(PluginError::Duplicate(id)) if &*id == "same"));
    }

    #[test]
    fn it_resets() {
        let container = Container::new();
        container.register_singleton("A", || 1).unwrap();
        container.declare_dependency("A", "B");

        container.reset();

        assert!(!container.is_registered("A"));
        assert!(container.graph_edges().is_empty());
        assert!(container.keys().is_empty());
    }

    #[test]
    fn it_shares_state_between_clones() {
        let container = Container::new();
        let clone = container.clone();

        clone.register_transient("A", || ()).unwrap();

        assert!(container.is_registered("A"));
    }
}
