//! Utilities to inject and resolve dependencies

use crate::{Resolver, error::Error};

/// A trait that adds the ability to inject dependencies when resolving a type from the DI container
///
/// If there is no need to inject other dependencies, the `struct` must implement the `Default` trait
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
/// ```
///
/// If it's required to construct a `struct` from other dependencies, the `Inject` can be implemented manually
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use weave_di::{Container, Inject, Resolver, Scope, error::Error};
///
/// #[derive(Default)]
/// struct Cache;
///
/// struct Repository {
///     cache: Arc<Cache>
/// }
///
/// impl Inject for Repository {
///     fn inject(resolver: &Resolver) -> Result<Self, Error> {
///         let cache = resolver.resolve_type::<Cache>()?;
///         Ok(Self { cache })
///     }
/// }
///
/// let container = Container::new();
/// container.register_type::<Cache>(Scope::Singleton).unwrap();
/// container.register_type::<Repository>(Scope::Transient).unwrap();
///
/// let repository = container.resolve_type::<Repository>().unwrap();
/// assert!(Arc::ptr_eq(&repository.cache, &container.resolve_type::<Cache>().unwrap()));
/// ```
pub trait Inject: Sized + Send + Sync + 'static {
    /// Constructs `Self`, resolving its dependencies through `resolver`
    fn inject(resolver: &Resolver) -> Result<Self, Error>;
}

impl<T: Default + Send + Sync + 'static> Inject for T {
    #[inline]
    fn inject(_: &Resolver) -> Result<Self, Error> {
        Ok(Self::default())
    }
}
