//! Process-wide convenience container

use std::sync::LazyLock;
use weave_di::Container;

static GLOBAL: LazyLock<Container> = LazyLock::new(Container::new);

/// Returns the process-wide container, created on first use.
///
/// Prefer passing an explicit [`Container`] around; this one exists for
/// applications that want a single ambient registry. Tests should build their own.
///
/// # Example
/// ```
/// use weave::global;
///
/// global().register_instance("app.name", "weave").unwrap();
///
/// assert!(global().is_registered("app.name"));
/// ```
#[inline]
pub fn global() -> &'static Container {
    &GLOBAL
}
