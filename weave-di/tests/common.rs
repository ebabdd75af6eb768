//! Common test utilities

#![allow(missing_docs)]
#![allow(unreachable_pub)]
#![allow(dead_code)]
#![allow(missing_debug_implementations)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tracing_subscriber::EnvFilter;
use weave_di::{Container, Resolver, Scope, ServiceKey, error::Error};

/// Counts factory invocations per test
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Registers `key` with a factory that resolves every key of `deps` in order
/// and counts its own invocations
pub fn register_chain(container: &Container, key: &str, deps: &[&str], calls: &Calls) {
    let deps = deps
        .iter()
        .map(|d| ServiceKey::from(*d))
        .collect::<Vec<_>>();
    let calls = calls.clone();
    let name = key.to_owned();

    container
        .register(key, Scope::Transient, move |r: &Resolver| -> Result<String, Error> {
            calls.hit();
            for dep in &deps {
                r.resolve(dep)?;
            }
            Ok(name.clone())
        })
        .unwrap();
}

/// Keys of a path as plain strings
pub fn names(keys: &[ServiceKey]) -> Vec<&str> {
    keys.iter().map(ServiceKey::as_str).collect()
}

/// Installs a test-writer subscriber filtered by `RUST_LOG`, once per test binary
pub fn init_tracing() {
    _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
