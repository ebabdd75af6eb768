//! Registration records and scopes

use super::{
    Error,
    factory::FactoryFn,
    resolver::ResolutionFrame,
    wait_graph::{CellId, WaitGraph},
};
use crate::{Instance, ServiceKey};
use parking_lot::Mutex;
use std::{
    fmt::{Debug, Formatter},
    sync::{Arc, OnceLock},
    time::SystemTime,
};

/// Lifetime policy for a resolved instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The factory runs on every resolution
    Transient,
    /// The factory runs at most once, the instance is cached for the container lifetime
    Singleton,
    /// Same as [`Scope::Singleton`], documents that the first run is deferred to the first resolution
    LazySingleton,
}

impl Scope {
    /// Returns `true` for [`Scope::Singleton`] and [`Scope::LazySingleton`]
    #[inline]
    pub fn is_cached(self) -> bool {
        matches!(self, Scope::Singleton | Scope::LazySingleton)
    }
}

/// Once-guard holding a cached singleton.
///
/// The factory runs under the init lock, racers block on it and then observe the stored value.
/// A racer that would wait for its own thread through other blocked threads fails with
/// [`Error::CycleDetected`] instead of blocking. A failed factory leaves the cell empty.
#[derive(Default)]
pub(crate) struct SingletonCell {
    value: OnceLock<Instance>,
    init: Mutex<()>,
}

impl SingletonCell {
    #[inline]
    pub(crate) fn with_value(instance: Instance) -> Self {
        let cell = Self::default();
        _ = cell.value.set(instance);
        cell
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<&Instance> {
        self.value.get()
    }

    #[inline]
    fn id(&self) -> CellId {
        std::ptr::from_ref(self) as CellId
    }

    /// Returns the cached instance or runs `init` once.
    ///
    /// `frame` is the frame of the key this cell belongs to.
    pub(crate) fn get_or_try_init<F>(
        &self,
        waits: &WaitGraph,
        frame: &Arc<ResolutionFrame>,
        init: F
    ) -> Result<Instance, Error>
    where
        F: FnOnce() -> Result<Instance, Error>
    {
        if let Some(instance) = self.value.get() {
            return Ok(instance.clone());
        }

        let _guard = match self.init.try_lock() {
            Some(guard) => guard,
            None => {
                let _waiting = waits.wait_for(self.id(), frame)?;
                self.init.lock()
            }
        };
        if let Some(instance) = self.value.get() {
            return Ok(instance.clone());
        }

        let _owner = waits.own(self.id(), frame.key());
        let instance = init()?;
        Ok(self.value.get_or_init(|| instance).clone())
    }
}

/// A stored registration.
///
/// Immutable once stored: registering the same key again replaces the whole record,
/// cached singleton included.
pub struct Registration {
    key: ServiceKey,
    scope: Scope,
    registered_at: SystemTime,
    source_tag: Option<Arc<str>>,
    pub(crate) factory: FactoryFn,
    pub(crate) singleton: SingletonCell,
}

impl Debug for Registration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("registered_at", &self.registered_at)
            .field("source_tag", &self.source_tag)
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}

impl Registration {
    pub(crate) fn new(
        key: ServiceKey,
        scope: Scope,
        source_tag: Option<Arc<str>>,
        factory: FactoryFn,
    ) -> Self {
        Self {
            key,
            scope,
            registered_at: SystemTime::now(),
            source_tag,
            factory,
            singleton: SingletonCell::default(),
        }
    }

    pub(crate) fn with_instance(mut self, instance: Instance) -> Self {
        self.singleton = SingletonCell::with_value(instance);
        self
    }

    /// Registered key
    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// Registered scope
    #[inline]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// When the registration was stored
    #[inline]
    pub fn registered_at(&self) -> SystemTime {
        self.registered_at
    }

    /// Optional origin of the registration
    #[inline]
    pub fn source_tag(&self) -> Option<&str> {
        self.source_tag.as_deref()
    }

    /// Returns `true` if a singleton instance has been created and cached
    #[inline]
    pub fn is_instantiated(&self) -> bool {
        self.singleton.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier, atomic::{AtomicUsize, Ordering}},
        thread,
    };
    use super::{Scope, SingletonCell};
    use crate::{
        Instance, ServiceKey,
        container::{resolver::ResolutionFrame, wait_graph::WaitGraph},
        error::Error,
    };

    fn frame() -> Arc<ResolutionFrame> {
        Arc::new(ResolutionFrame::new(ServiceKey::from("Cell"), None))
    }

    #[test]
    fn it_runs_init_once_under_contention() {
        let cell = SingletonCell::default();
        let waits = WaitGraph::default();
        let frame = frame();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(16);

        let instances = thread::scope(|s| {
            let handles = (0..16)
                .map(|_| s.spawn(|| {
                    barrier.wait();
                    cell.get_or_try_init(&waits, &frame, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Arc::new(42_u32) as Instance)
                    })
                    .unwrap()
                }))
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn it_does_not_cache_failures() {
        let cell = SingletonCell::default();
        let waits = WaitGraph::default();
        let frame = frame();

        let first = cell.get_or_try_init(&waits, &frame, || Err(Error::other("not yet")));
        let second = cell.get_or_try_init(&waits, &frame, || Ok(Arc::new(1_u8) as Instance));

        assert!(first.is_err());
        assert!(second.is_ok());
        assert!(cell.get().is_some());
    }

    #[test]
    fn it_tells_cached_scopes() {
        assert!(Scope::Singleton.is_cached());
        assert!(Scope::LazySingleton.is_cached());
        assert!(!Scope::Transient.is_cached());
    }
}
