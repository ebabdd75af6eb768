//! Modules and batch registration

use super::{Container, Error};
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{sync::Semaphore, task::{Id, JoinSet}};
use tracing::Instrument;

const UNNAMED_MODULE: &str = "<unnamed>";

/// A deferred, composable batch of registration actions
///
/// Any `Fn(&Container) -> Result<(), Error>` closure is a module.
///
/// # Example
/// ```
/// use weave_di::{Container, Module, error::Error};
///
/// struct Storage;
///
/// impl Module for Storage {
///     fn name(&self) -> &str {
///         "storage"
///     }
///
///     fn register(&self, container: &Container) -> Result<(), Error> {
///         container.register_singleton("Database", || String::from("postgres://localhost"))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Module: Send + Sync + 'static {
    /// Name reported in [`BuildFailure`]
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Performs the registrations of this module
    fn register(&self, container: &Container) -> Result<(), Error>;
}

impl<F> Module for F
where
    F: Fn(&Container) -> Result<(), Error> + Send + Sync + 'static
{
    #[inline]
    fn register(&self, container: &Container) -> Result<(), Error> {
        self(container)
    }
}

/// A module with an explicit name, see [`module`]
pub struct NamedModule<F> {
    name: &'static str,
    action: F,
}

impl<F> Debug for NamedModule<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedModule")
            .field("name", &self.name)
            .finish()
    }
}

impl<F> Module for NamedModule<F>
where
    F: Fn(&Container) -> Result<(), Error> + Send + Sync + 'static
{
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    #[inline]
    fn register(&self, container: &Container) -> Result<(), Error> {
        (self.action)(container)
    }
}

/// Wraps a registration closure into a named, boxed [`Module`]
///
/// # Example
/// ```
/// use weave_di::{Container, module};
///
/// let cache = module("cache", |c: &Container| {
///     c.register_transient("Cache", || 0_u64)
/// });
/// ```
#[inline]
pub fn module<F>(name: &'static str, action: F) -> Box<dyn Module>
where
    F: Fn(&Container) -> Result<(), Error> + Send + Sync + 'static
{
    Box::new(NamedModule { name, action })
}

/// A module that failed during [`Container::build`]
#[derive(Debug, Clone)]
pub struct BuildFailure {
    /// Position of the module in the input sequence
    pub index: usize,
    /// Module name
    pub module: String,
    /// Reason
    pub error: Error,
}

/// Outcome of a [`Container::build`] call
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Number of modules that were run
    pub module_count: usize,
    /// Wall time of the whole build
    pub elapsed: Duration,
    /// Failed modules, ordered by index
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    /// Returns `true` if every module succeeded
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of modules that succeeded
    #[inline]
    pub fn succeeded(&self) -> usize {
        self.module_count - self.failures.len()
    }
}

impl Container {
    /// Runs every module's registrations with bounded concurrency and waits for all of them.
    ///
    /// Modules are independent and unordered. A failing or panicking module does not
    /// abort the others; failures are collected in the [`BuildReport`]. Two modules
    /// registering the same key leave exactly one registration, the last one to complete.
    /// Can be called repeatedly, later builds add to or overwrite earlier registrations.
    ///
    /// # Example
    /// ```
    /// use weave_di::{Container, module};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let container = Container::new();
    /// let report = container.build(vec![
    ///     module("numbers", |c: &Container| c.register_transient("Answer", || 42_u32)),
    ///     module("names", |c: &Container| c.register_transient("Name", || "weave")),
    /// ]).await;
    ///
    /// assert_eq!(report.module_count, 2);
    /// assert!(report.is_success());
    /// # }
    /// ```
    pub async fn build<I>(&self, modules: I) -> BuildReport
    where
        I: IntoIterator<Item = Box<dyn Module>>
    {
        let started = Instant::now();
        let limit = Arc::new(Semaphore::new(self.inner.config.max_build_concurrency()));
        let mut tasks = JoinSet::new();
        let mut indices = HashMap::new();

        for (index, module) in modules.into_iter().enumerate() {
            let limit = limit.clone();
            let container = self.clone();
            let handle = tasks.spawn(async move {
                let name = module.name().to_owned();
                let result = run_module(limit, container, module).await;
                (name, result)
            });
            indices.insert(handle.id(), index);
        }

        let module_count = indices.len();
        async move {
            let failures = collect_failures(&mut tasks, &indices).await;
            let elapsed = started.elapsed();
            tracing::info!(failed = failures.len(), ?elapsed, "build finished");

            BuildReport { module_count, elapsed, failures }
        }
        .instrument(tracing::info_span!("build", modules = module_count))
        .await
    }
}

async fn collect_failures(
    tasks: &mut JoinSet<(String, Result<(), Error>)>,
    indices: &HashMap<Id, usize>
) -> Vec<BuildFailure> {
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, failure) = match joined {
            Ok((_, (_, Ok(())))) => continue,
            Ok((id, (module, Err(error)))) => (id, (module, error)),
            // the module panicked before its name was known
            Err(err) => (err.id(), (String::from(UNNAMED_MODULE), Error::other(err))),
        };
        let Some(&index) = indices.get(&id) else {
            continue;
        };

        let (module, error) = failure;
        tracing::warn!(index, module = %module, %error, "module failed");
        failures.push(BuildFailure { index, module, error });
    }
    failures.sort_by_key(|f| f.index);
    failures
}

async fn run_module(
    limit: Arc<Semaphore>,
    container: Container,
    module: Box<dyn Module>
) -> Result<(), Error> {
    let _permit = limit
        .acquire_owned()
        .await
        .map_err(Error::other)?;

    tokio::task::spawn_blocking(move || module.register(&container))
        .await
        .map_err(Error::other)?
}
