//! Ambient context carried from the submitting flow into the worker that runs
//! its work.
//!
//! A [`Context`] is an immutable snapshot. Extending it with
//! [`Context::with`] produces a new snapshot and leaves the original alone, so
//! a value attached for one submission can never show up in another. The
//! snapshot travels inside the work item and is handed to the action by
//! reference when a worker runs it; nothing is parked in thread-local storage.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type Value = Arc<dyn Any + Send + Sync>;

/// Typed name for a context entry.
///
/// ```
/// use weft_rs::{Context, ContextKey};
///
/// const REQUEST_ID: ContextKey<u64> = ContextKey::new("request_id");
///
/// let cx = Context::new().with(REQUEST_ID, 7);
/// assert_eq!(cx.get(&REQUEST_ID), Some(&7));
/// ```
pub struct ContextKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextKey<T> {}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextKey").field(&self.name).finish()
    }
}

/// Immutable snapshot of flow-scoped values.
#[derive(Clone, Default)]
pub struct Context {
    entries: Option<Arc<HashMap<&'static str, Value>>>,
}

impl Context {
    /// The empty context.
    pub fn new() -> Self {
        Self { entries: None }
    }

    /// Returns a new context with `key` bound to `value`; `self` is untouched.
    pub fn with<T>(&self, key: ContextKey<T>, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        let mut entries = self
            .entries
            .as_deref()
            .cloned()
            .unwrap_or_default();
        entries.insert(key.name, Arc::new(value));

        Self {
            entries: Some(Arc::new(entries)),
        }
    }

    /// Looks up `key`. A value stored under the same name with a different
    /// type reads as absent.
    pub fn get<T>(&self, key: &ContextKey<T>) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.entries
            .as_ref()?
            .get(key.name)?
            .downcast_ref::<T>()
    }

    pub fn contains<T>(&self, key: &ContextKey<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self
            .entries
            .as_ref()
            .map(|e| e.keys().copied().collect())
            .unwrap_or_default();
        keys.sort_unstable();
        f.debug_struct("Context").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: ContextKey<String> = ContextKey::new("user");
    const DEPTH: ContextKey<u32> = ContextKey::new("depth");

    #[test]
    fn test_empty_context() {
        let cx = Context::new();
        assert!(cx.is_empty());
        assert_eq!(cx.get(&USER), None);
    }

    #[test]
    fn test_with_does_not_mutate_original() {
        let base = Context::new().with(DEPTH, 1);
        let derived = base.with(DEPTH, 2).with(USER, "ada".to_string());

        assert_eq!(base.get(&DEPTH), Some(&1));
        assert!(!base.contains(&USER));
        assert_eq!(derived.get(&DEPTH), Some(&2));
        assert_eq!(derived.get(&USER).map(String::as_str), Some("ada"));
        assert_eq!(derived.len(), 2);
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        const DEPTH_AS_STRING: ContextKey<String> = ContextKey::new("depth");

        let cx = Context::new().with(DEPTH, 9);
        assert_eq!(cx.get(&DEPTH_AS_STRING), None);
    }

    #[test]
    fn test_clone_shares_snapshot() {
        let cx = Context::new().with(DEPTH, 3);
        let copy = cx.clone();
        assert_eq!(copy.get(&DEPTH), Some(&3));
        assert_eq!(format!("{:?}", copy), "Context { keys: [\"depth\"] }");
    }
}
