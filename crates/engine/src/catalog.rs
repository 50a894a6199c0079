//! Ordered, id-indexed task catalog.
//!
//! Declarations are stored in an `IndexMap` keyed by task id, which doubles as
//! the positional arena: declaration order is the default execution order and
//! the successor of a task is the entry at the next index. The catalog is built
//! once and never mutated, so it can be shared freely between runs.

use indexmap::IndexMap;
use taskflow_types::TaskDeclaration;

use crate::error::EngineError;

/// Ordered sequence of task declarations with constant-time id lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCatalog {
    tasks: IndexMap<String, TaskDeclaration>,
}

impl TaskCatalog {
    /// Builds a catalog from declarations in authoring order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedCatalog`] when the list is empty or
    /// contains a duplicate id. No partial catalog is produced.
    pub fn new(declarations: impl IntoIterator<Item = TaskDeclaration>) -> Result<Self, EngineError> {
        let mut tasks = IndexMap::new();

        for declaration in declarations {
            let id = declaration.id().to_string();
            if tasks.contains_key(&id) {
                return Err(EngineError::MalformedCatalog {
                    reason: format!("duplicate task id '{id}'"),
                });
            }
            tasks.insert(id, declaration);
        }

        if tasks.is_empty() {
            return Err(EngineError::MalformedCatalog {
                reason: "a workflow must declare at least one task".to_string(),
            });
        }

        Ok(Self { tasks })
    }

    /// Resolves a task id, failing with [`EngineError::TaskNotFound`] when absent.
    pub fn lookup(&self, task_id: &str) -> Result<&TaskDeclaration, EngineError> {
        self.get(task_id).ok_or_else(|| EngineError::TaskNotFound {
            task_id: task_id.to_string(),
        })
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskDeclaration> {
        self.tasks.get(task_id)
    }

    /// Id of the declaration immediately after `task_id`, or `None` for the last
    /// declaration (and for ids the catalog does not contain).
    pub fn successor_of(&self, task_id: &str) -> Option<&str> {
        let position = self.tasks.get_index_of(task_id)?;
        self.tasks.get_index(position + 1).map(|(id, _)| id.as_str())
    }

    /// Id of the first declaration.
    pub fn first_id(&self) -> &str {
        // Construction guarantees at least one entry.
        self.tasks.get_index(0).map(|(id, _)| id.as_str()).unwrap_or_default()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Always `false` for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates declarations in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskDeclaration> {
        self.tasks.values()
    }
}
