//! Resolution engine and resolution frames

use super::{Container, Error, registration::Registration};
use crate::{
    Instance, ServiceKey,
    graph::Cycle,
    plugin::{PluginEvent, ResolutionEvent},
};
use std::{sync::Arc, time::Instant};

/// A per-call-chain marker of an in-progress resolution.
///
/// Frames form an immutable chain from the innermost resolution back to the root one.
/// A chain is owned by a single top-level [`Container::resolve`] call and everything it
/// transitively triggers, so unrelated concurrent resolutions never see each other's frames.
#[derive(Debug)]
pub struct ResolutionFrame {
    key: ServiceKey,
    started_at: Instant,
    depth: usize,
    parent: Option<Arc<ResolutionFrame>>,
}

impl ResolutionFrame {
    pub(crate) fn new(key: ServiceKey, parent: Option<&Arc<ResolutionFrame>>) -> Self {
        Self {
            key,
            started_at: Instant::now(),
            depth: parent.map_or(0, |p| p.depth + 1),
            parent: parent.cloned(),
        }
    }

    /// Key being resolved in this frame
    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    /// When this resolution started
    #[inline]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Distance from the root resolution, `0` for the root
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The frame that requested this resolution
    #[inline]
    pub fn parent(&self) -> Option<&ResolutionFrame> {
        self.parent.as_deref()
    }

    /// Iterates from this frame back to the root frame
    pub fn ancestors(&self) -> impl Iterator<Item = &ResolutionFrame> {
        std::iter::successors(Some(self), |frame| frame.parent())
    }

    /// Keys of the active chain, root first
    pub fn chain(&self) -> Vec<ServiceKey> {
        let mut keys = self.ancestors()
            .map(|frame| frame.key.clone())
            .collect::<Vec<_>>();
        keys.reverse();
        keys
    }

    /// If `key` is already on the chain, returns the closed path from its
    /// first occurrence through this frame back to `key`
    pub(crate) fn cycle_to(&self, key: &ServiceKey) -> Option<Cycle> {
        let position = self.ancestors().position(|frame| &frame.key == key)?;
        let mut path = self.ancestors()
            .take(position + 1)
            .map(|frame| frame.key.clone())
            .collect::<Vec<_>>();
        path.reverse();
        path.push(key.clone());
        Some(Cycle::new(path))
    }
}

/// Handle passed to factories to resolve their own dependencies.
///
/// Resolutions made through a `Resolver` join the calling resolution chain:
/// they record dependency edges and take part in live cycle detection.
#[derive(Debug, Clone)]
pub struct Resolver {
    container: Container,
    frame: Arc<ResolutionFrame>,
}

impl Resolver {
    /// Resolves a dependency of the service being constructed
    #[inline]
    pub fn resolve(&self, key: impl Into<ServiceKey>) -> Result<Instance, Error> {
        self.container.resolve_in(key.into(), Some(&self.frame))
    }

    /// Resolves a dependency and downcasts it to `T`
    #[inline]
    pub fn resolve_as<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>) -> Result<Arc<T>, Error> {
        let key = key.into();
        let instance = self.container.resolve_in(key.clone(), Some(&self.frame))?;
        downcast(key, instance)
    }

    /// Resolves a dependency registered under [`ServiceKey::of::<T>`]
    #[inline]
    pub fn resolve_type<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.resolve_as::<T>(ServiceKey::of::<T>())
    }

    /// Key of the service being constructed
    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.frame.key
    }

    /// Current resolution frame
    #[inline]
    pub fn frame(&self) -> &ResolutionFrame {
        &self.frame
    }

    /// The container that owns this resolution
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }
}

#[inline]
pub(crate) fn downcast<T: Send + Sync + 'static>(key: ServiceKey, instance: Instance) -> Result<Arc<T>, Error> {
    instance
        .downcast::<T>()
        .map_err(|_| Error::TypeMismatch { key, expected: std::any::type_name::<T>() })
}

impl Container {
    /// Resolves `key` within the chain of `parent`, `None` for a root resolution
    pub(crate) fn resolve_in(
        &self,
        key: ServiceKey,
        parent: Option<&Arc<ResolutionFrame>>
    ) -> Result<Instance, Error> {
        let started = Instant::now();
        let registration = self.inner.store.get(&key);
        let event = ResolutionEvent {
            key: &key,
            scope: registration.as_ref().map(|r| r.scope()),
            requested_by: parent.map(|p| &p.key),
            depth: parent.map_or(0, |p| p.depth + 1),
        };

        let result = self.resolve_registration(&event, registration, parent);
        let elapsed = started.elapsed();

        match &result {
            Ok(instance) => {
                tracing::trace!(key = %key, depth = event.depth, ?elapsed, "service resolved");
                _ = self.inner.plugins.dispatch(&PluginEvent::AfterResolution {
                    resolution: &event,
                    instance,
                    elapsed,
                });
            }
            Err(error) => {
                tracing::debug!(key = %key, depth = event.depth, %error, "service resolution failed");
                _ = self.inner.plugins.dispatch(&PluginEvent::ResolutionFailed {
                    resolution: &event,
                    error,
                    elapsed,
                });
            }
        }

        result
    }

    fn resolve_registration(
        &self,
        event: &ResolutionEvent<'_>,
        registration: Option<Arc<Registration>>,
        parent: Option<&Arc<ResolutionFrame>>,
    ) -> Result<Instance, Error> {
        let key = event.key;

        if let Some(parent) = parent
            && let Some(cycle) = parent.cycle_to(key)
        {
            // keep the closing edge so offline detection sees what was reported here
            self.inner.graph.add_edge(parent.key.clone(), key.clone());
            return Err(Error::CycleDetected(cycle));
        }

        let registration = registration.ok_or_else(|| Error::NotRegistered(key.clone()))?;

        if let Some(parent) = parent {
            self.inner.graph.add_edge(parent.key.clone(), key.clone());
        }

        let resolver = Resolver {
            container: self.clone(),
            frame: Arc::new(ResolutionFrame::new(key.clone(), parent)),
        };

        self.inner.plugins.dispatch(&PluginEvent::ValidateResolution(event))?;
        self.inner.plugins.dispatch(&PluginEvent::BeforeResolution(event))?;

        let invoke = || (registration.factory)(&resolver)
            .map_err(|err| err.into_factory_failure(key));

        if registration.scope().is_cached() {
            registration.singleton.get_or_try_init(&self.inner.waits, &resolver.frame, invoke)
        } else {
            invoke()
        }
    }
}
