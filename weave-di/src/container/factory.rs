//! Generic factory for resolving types

use super::{Error, Resolver};
use crate::Instance;
use std::sync::Arc;

/// Type-erased factory stored in a registration
pub(crate) type FactoryFn = Arc<
    dyn Fn(&Resolver) -> Result<Instance, Error>
    + Send
    + Sync
>;

/// Marker for factories that take a [`Resolver`]
#[derive(Debug)]
pub struct WithResolver;

/// A trait that describes a generic factory function
/// that can construct objects registered in DI container.
///
/// Implemented for `Fn() -> T` (infallible, no dependencies) and for
/// `Fn(&Resolver) -> Result<T, Error>` (may resolve dependencies).
pub trait GenericFactory<Args>: Send + Sync + 'static {
    /// A type of object that will be resolved
    type Output;

    /// Calls a generic function and returns either constructed object or error
    fn call(&self, resolver: &Resolver) -> Result<Self::Output, Error>;
}

impl<F, R> GenericFactory<()> for F
where
    F: Fn() -> R + Send + Sync + 'static
{
    type Output = R;

    #[inline]
    fn call(&self, _: &Resolver) -> Result<Self::Output, Error> {
        Ok(self())
    }
}

impl<F, R> GenericFactory<WithResolver> for F
where
    F: Fn(&Resolver) -> Result<R, Error> + Send + Sync + 'static
{
    type Output = R;

    #[inline]
    fn call(&self, resolver: &Resolver) -> Result<Self::Output, Error> {
        self(resolver)
    }
}

#[inline]
pub(crate) fn make_factory_fn<T, F, Args>(factory: F) -> FactoryFn
where
    T: Send + Sync + 'static,
    F: GenericFactory<Args, Output = T>,
{
    Arc::new(move |resolver: &Resolver| -> Result<Instance, Error> {
        factory.call(resolver).map(|t| Arc::new(t) as Instance)
    })
}
