//! Container configuration

use std::{num::NonZeroUsize, thread::available_parallelism};

/// Represents a container configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Maximum number of modules running concurrently during [`crate::Container::build`]
    ///
    /// Default: number of available CPUs
    max_build_concurrency: NonZeroUsize,

    /// Specifies whether a failing observer hook stops the remaining observers of the same event
    ///
    /// Default: `false`
    stop_on_observer_error: bool,
}

impl Default for ContainerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_build_concurrency: available_parallelism().unwrap_or(NonZeroUsize::MIN),
            stop_on_observer_error: false,
        }
    }
}

impl ContainerConfig {
    /// Creates a default container configuration
    ///
    /// Defaults:
    /// - max_build_concurrency: number of available CPUs
    /// - stop_on_observer_error: `false`
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how many modules may register concurrently, `0` is treated as `1`
    ///
    /// Default: number of available CPUs
    pub fn with_max_build_concurrency(mut self, limit: usize) -> Self {
        self.max_build_concurrency = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        self
    }

    /// Configures whether a failing observer hook stops the remaining observers
    ///
    /// Default: `false`
    pub fn with_stop_on_observer_error(mut self, stop: bool) -> Self {
        self.stop_on_observer_error = stop;
        self
    }

    /// Maximum number of modules running concurrently during a build
    #[inline]
    pub fn max_build_concurrency(&self) -> usize {
        self.max_build_concurrency.get()
    }

    /// Returns `true` if a failing observer stops the remaining observers
    #[inline]
    pub fn stop_on_observer_error(&self) -> bool {
        self.stop_on_observer_error
    }
}
