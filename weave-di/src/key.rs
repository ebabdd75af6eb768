//! Service identifiers

use std::{
    borrow::Borrow,
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

/// An opaque, stable identifier of a registrable service.
///
/// A key is either an explicit string tag (`"Database"`) or derived from a type name
/// with [`ServiceKey::of`]. Cloning is cheap, the name is shared.
///
/// # Example
/// ```
/// use weave_di::ServiceKey;
///
/// let key = ServiceKey::from("Database");
/// assert_eq!(key, "Database");
/// assert_eq!(ServiceKey::of::<u32>().as_str(), "u32");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceKey(Arc<str>);

impl ServiceKey {
    /// Creates a key from an explicit string tag
    #[inline]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Creates a key derived from the name of `T`
    #[inline]
    pub fn of<T: ?Sized>() -> Self {
        Self(Arc::from(std::any::type_name::<T>()))
    }

    /// Returns the key name
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for ServiceKey {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&*self.0, f)
    }
}

impl Display for ServiceKey {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceKey {
    #[inline]
    fn from(name: &str) -> Self {
        Self(Arc::from(name))
    }
}

impl From<String> for ServiceKey {
    #[inline]
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&String> for ServiceKey {
    #[inline]
    fn from(name: &String) -> Self {
        Self(Arc::from(name.as_str()))
    }
}

impl From<&ServiceKey> for ServiceKey {
    #[inline]
    fn from(key: &ServiceKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for ServiceKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceKey {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ServiceKey {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ServiceKey {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
