//! Per-dispatch scratch space.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Key/value storage used to pass data between pipes and the handler.
///
/// A stash lives for exactly one HTTP request or one WebSocket message.
/// Values are stored type-erased and read back by type; a lookup with the
/// wrong type behaves like a missing key.
///
/// # Example
///
/// ```
/// use bamboo_core::Stash;
///
/// let mut stash = Stash::new();
/// stash.insert("user_id", 42_u64);
///
/// assert_eq!(stash.get::<u64>("user_id"), Some(&42));
/// assert_eq!(stash.get::<String>("user_id"), None);
/// ```
#[derive(Default)]
pub struct Stash {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Stash {
    /// Creates an empty stash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value under the same key.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Stores a value only if the key is not present yet.
    ///
    /// Returns `true` if the value was stored.
    pub fn insert_if_absent<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, Box::new(value));
        true
    }

    /// Returns a reference to the value stored under `key`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    /// Returns a clone of the value under `key`, or `default`.
    #[must_use]
    pub fn get_or<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.get::<T>(key).cloned().unwrap_or(default)
    }

    /// Removes and returns the value under `key`.
    ///
    /// If the stored value has a different type it is left in place.
    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    /// Returns `true` if a value exists under `key`, whatever its type.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Stash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stash")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}
