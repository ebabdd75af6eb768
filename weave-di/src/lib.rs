//! Dependency injection runtime
//!
//! A [`Container`] maps [`ServiceKey`]s to factories, resolves instances on demand
//! with [`Scope`] rules, records the "depends-on" edges it observes in a
//! [`DependencyGraph`](graph::DependencyGraph) and fails fast on circular dependencies.
//! A [`plugin`] pipeline observes or vetoes registrations and resolutions.
//!
//! # Example
//! ```
//! use weave_di::{Container, Resolver};
//!
//! let container = Container::new();
//! container.register_transient("A", |r: &Resolver| r.resolve("B").map(|_| 'a')).unwrap();
//! container.register_transient("B", |r: &Resolver| r.resolve("A").map(|_| 'b')).unwrap();
//!
//! let err = container.resolve("A").unwrap_err();
//! assert!(err.is_cycle());
//! assert_eq!(err.to_string(), "DI Error: circular dependency detected: A -> B -> A");
//! ```

use std::{any::Any, sync::Arc};

pub use crate::{
    config::ContainerConfig,
    container::{
        BuildFailure, BuildReport, Container, ContainerBuilder, GenericFactory, Module,
        NamedModule, Registration, ResolutionFrame, Resolver, Scope, WithResolver, module,
    },
    inject::Inject,
    key::ServiceKey,
};

pub mod config;
pub mod container;
pub mod error;
pub mod graph;
pub mod inject;
pub mod key;
pub mod plugin;

/// A type-erased, shared service instance
pub type Instance = Arc<
    dyn Any
    + Send
    + Sync
>;
