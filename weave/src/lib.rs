//! # Weave
//!
//! > Thread-safe dependency injection for Rust applications, with scoped lifetimes,
//! > fail-fast cycle detection and a plugin pipeline.
//!
//! ## Features
//! * Transient, singleton and lazy singleton scopes
//! * Live cycle detection on every resolution and an offline cycle scan of the dependency graph
//! * Concurrent batch registration of modules
//! * Plugins that observe or veto registrations and resolutions
//! * Built-in logging, metrics and overwrite guard plugins
//!
//! ## Example
//! ```
//! use weave::{Container, Resolver, error::Error};
//!
//! struct Config { url: String }
//! struct Database { url: String }
//!
//! let container = Container::new();
//! container.register_singleton("Config", || Config { url: "postgres://localhost".into() }).unwrap();
//! container.register_transient("Database", |r: &Resolver| -> Result<Database, Error> {
//!     let config = r.resolve_as::<Config>("Config")?;
//!     Ok(Database { url: config.url.clone() })
//! }).unwrap();
//!
//! let db = container.resolve_as::<Database>("Database").unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```

pub use weave_di::{
    BuildFailure, BuildReport, Container, ContainerBuilder, ContainerConfig, GenericFactory,
    Inject, Instance, Module, NamedModule, Registration, ResolutionFrame, Resolver, Scope,
    ServiceKey, WithResolver, config, error, graph, module, plugin,
};

pub use crate::{
    global::global,
    retry::{ResolveRetryExt, RetryPolicy},
};

pub mod global;
pub mod plugins;
pub mod retry;
