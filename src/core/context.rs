//! View-tree scoped context registry
//!
//! A `ContextScope` belongs to one node of the view tree. Values set on a
//! scope are visible to that scope and every descendant created with
//! [`ContextScope::child`], so shared objects reach deep views without being
//! threaded through every constructor.

use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors returned when retrieving a context value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("no context provided under key {key:?}")]
    NotProvided { key: &'static str },
    #[error("context under key {key:?} has a different type")]
    TypeMismatch { key: &'static str },
}

type Entries = HashMap<&'static str, Arc<dyn Any + Send + Sync>>;

struct ScopeInner {
    parent: Option<ContextScope>,
    entries: RwLock<Entries>,
}

/// Context registry for one view subtree
#[derive(Clone)]
pub struct ContextScope {
    inner: Arc<ScopeInner>,
}

impl ContextScope {
    /// Create a scope for a view-tree root
    pub fn root() -> Self {
        Self::with_parent(None)
    }

    /// Create a scope for a descendant view
    pub fn child(&self) -> Self {
        Self::with_parent(Some(self.clone()))
    }

    fn with_parent(parent: Option<ContextScope>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                parent,
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Register `value` under `key` on this scope, shadowing any ancestor's value
    pub fn set<T: Any + Send + Sync>(&self, key: &'static str, value: T) {
        self.inner.entries.write().insert(key, Arc::new(value));
    }

    /// Look up `key` on this scope, then on each ancestor
    pub fn get<T: Any + Send + Sync + Clone>(&self, key: &'static str) -> Result<T, ContextError> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(entry) = current.inner.entries.read().get(key) {
                return entry
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or(ContextError::TypeMismatch { key });
            }
            scope = current.inner.parent.as_ref();
        }
        Err(ContextError::NotProvided { key })
    }

    /// Whether `key` is visible from this scope
    pub fn has(&self, key: &'static str) -> bool {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if current.inner.entries.read().contains_key(key) {
                return true;
            }
            scope = current.inner.parent.as_ref();
        }
        false
    }
}

impl std::fmt::Debug for ContextScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&'static str> = self.inner.entries.read().keys().copied().collect();
        f.debug_struct("ContextScope")
            .field("keys", &keys)
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}
