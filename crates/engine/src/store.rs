//! Mutable string-keyed variable store shared by a run (or a sequence of runs).

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::templates;

/// Variable name to value mapping. Values are opaque strings.
///
/// Insertion order is preserved for snapshots only; it carries no semantics.
/// Absent keys read as `None`, which is distinct from the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableStore {
    variables: IndexMap<String, String>,
}

impl VariableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value, or `None` when the variable was never set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Stores `value` under `key`. Blank keys are ignored.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key.trim().is_empty() {
            debug!("ignoring write to blank variable name");
            return;
        }
        self.variables.insert(key, value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Read-only ordered copy of the current contents.
    pub fn snapshot(&self) -> IndexMap<String, String> {
        self.variables.clone()
    }

    /// Interpolates `${name}` markers in `text` against this store.
    pub fn interpolate(&self, text: &str) -> String {
        templates::interpolate(text, self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(entries: I) -> Self {
        let mut store = VariableStore::new();
        for (key, value) in entries {
            store.set(key, value);
        }
        store
    }
}
