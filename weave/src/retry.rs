//! Opt-in retry of resolutions whose registration is not there yet

use std::{future::Future, sync::Arc, time::Duration};
use weave_di::{Container, Instance, ServiceKey, error::Error};

const DEFAULT_ATTEMPTS: u32 = 10;
const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Represents a retry policy for [`ResolveRetryExt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of resolution attempts, the first one included
    ///
    /// Default: `10`
    attempts: u32,

    /// Delay between two attempts
    ///
    /// Default: `100ms`
    interval: Duration,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Creates a default retry policy
    ///
    /// Defaults:
    /// - attempts: `10`
    /// - interval: `100ms`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total number of attempts, `0` is treated as `1`
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Sets the delay between two attempts
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Total number of attempts
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay between two attempts
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Resolution that waits for a registration to appear.
///
/// Only [`Error::NotRegistered`] is retried, every other error is returned at once.
/// Meant for applications whose modules register in no particular order at startup.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use weave::{Container, ResolveRetryExt, RetryPolicy};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let container = Container::new();
/// let late = container.clone();
/// tokio::spawn(async move {
///     tokio::time::sleep(Duration::from_millis(20)).await;
///     late.register_instance("Late", 42_u32).unwrap();
/// });
///
/// let policy = RetryPolicy::new().with_interval(Duration::from_millis(10));
/// let value = container.resolve_as_with_retry::<u32>("Late", policy).await.unwrap();
/// assert_eq!(*value, 42);
/// # }
/// ```
pub trait ResolveRetryExt {
    /// Resolves `key`, retrying while it is not registered
    fn resolve_with_retry(
        &self,
        key: impl Into<ServiceKey>,
        policy: RetryPolicy
    ) -> impl Future<Output = Result<Instance, Error>> + Send;

    /// Resolves `key` as `T`, retrying while it is not registered
    fn resolve_as_with_retry<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
        policy: RetryPolicy
    ) -> impl Future<Output = Result<Arc<T>, Error>> + Send;
}

impl ResolveRetryExt for Container {
    fn resolve_with_retry(
        &self,
        key: impl Into<ServiceKey>,
        policy: RetryPolicy
    ) -> impl Future<Output = Result<Instance, Error>> + Send {
        let key = key.into();
        let container = self.clone();
        async move {
            retry(policy, &key, || container.resolve(&key)).await
        }
    }

    fn resolve_as_with_retry<T: Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
        policy: RetryPolicy
    ) -> impl Future<Output = Result<Arc<T>, Error>> + Send {
        let key = key.into();
        let container = self.clone();
        async move {
            retry(policy, &key, || container.resolve_as::<T>(&key)).await
        }
    }
}

async fn retry<R, F>(policy: RetryPolicy, key: &ServiceKey, mut resolve: F) -> Result<R, Error>
where
    F: FnMut() -> Result<R, Error>
{
    let mut attempt = 1;
    loop {
        match resolve() {
            Err(err) if err.is_not_registered() && attempt < policy.attempts => {
                tracing::debug!(key = %key, attempt, missing = ?err.key(), "service not registered yet, retrying");
                attempt += 1;
                tokio::time::sleep(policy.interval).await;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use super::RetryPolicy;

    #[test]
    fn it_creates_default_policy() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.attempts(), 10);
        assert_eq!(policy.interval(), Duration::from_millis(100));
    }

    #[test]
    fn it_clamps_zero_attempts() {
        let policy = RetryPolicy::new()
            .with_attempts(0)
            .with_interval(Duration::from_secs(1));

        assert_eq!(policy.attempts(), 1);
        assert_eq!(policy.interval(), Duration::from_secs(1));
    }
}
