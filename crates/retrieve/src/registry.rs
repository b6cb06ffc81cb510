//! Id-keyed strategy registry.

use std::collections::BTreeMap;
use std::sync::Arc;

/// A small table of named strategies sharing one capability interface.
///
/// Registration is idempotent under the strategy id: registering the same
/// id again replaces the previous entry, so repeated startup wiring is
/// harmless and applications can override a built-in by reusing its id.
pub struct Registry<S: ?Sized> {
    entries: BTreeMap<String, Arc<S>>,
}

impl<S: ?Sized> Registry<S> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, id: impl Into<String>, strategy: Arc<S>) {
        let id = id.into();
        tracing::debug!(id = %id, "registering strategy");
        self.entries.insert(id, strategy);
    }

    pub fn get(&self, id: &str) -> Option<Arc<S>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: ?Sized> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("ids", &self.ids())
            .finish()
    }
}
