//! Declarative schema rules for raw workflow documents.
//!
//! The schema is evaluated before any [`TaskDeclaration`](super::TaskDeclaration)
//! is built so that authors see every violation in one pass. Loaders decide
//! whether violations are fatal or only logged; the engine re-checks its own
//! structural requirements regardless of the outcome here.

use std::{collections::HashSet, fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{TaskAttribute, TaskDocument, TaskKind, WorkflowDocument};

/// How schema violations are handled when a document is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Skip schema validation entirely.
    None,
    /// Log every violation and keep loading.
    WarnOnly,
    /// Reject the document when any violation is found.
    #[default]
    FailFast,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::None => "none",
            ValidationMode::WarnOnly => "warn-only",
            ValidationMode::FailFast => "fail-fast",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown validation mode '{0}' (expected none, warn-only, or fail-fast)")]
pub struct UnknownValidationMode(pub String);

impl FromStr for ValidationMode {
    type Err = UnknownValidationMode;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" | "off" => Ok(ValidationMode::None),
            "warn" | "warn-only" => Ok(ValidationMode::WarnOnly),
            "fail-fast" | "strict" => Ok(ValidationMode::FailFast),
            _ => Err(UnknownValidationMode(raw.to_string())),
        }
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Zero-based position of the offending task, when the violation concerns one.
    pub task_index: Option<usize>,
    /// Identifier of the offending task, when it has one.
    pub task_id: Option<String>,
    pub message: String,
}

impl SchemaViolation {
    fn document(message: impl Into<String>) -> Self {
        Self {
            task_index: None,
            task_id: None,
            message: message.into(),
        }
    }

    fn task(index: usize, task: &TaskDocument, message: impl Into<String>) -> Self {
        Self {
            task_index: Some(index),
            task_id: non_blank(task.id.as_deref()).map(str::to_string),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.task_id, self.task_index) {
            (Some(task_id), _) => write!(f, "task '{}': {}", task_id, self.message),
            (None, Some(index)) => write!(f, "task #{}: {}", index, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Compiled rule tables. Build once with [`WorkflowSchema::compile`] and reuse.
#[derive(Debug, Clone)]
pub struct WorkflowSchema {
    required_by_kind: IndexMap<TaskKind, &'static [TaskAttribute]>,
}

impl WorkflowSchema {
    /// Builds the rule tables for every recognized instruction kind.
    pub fn compile() -> Self {
        let required_by_kind = TaskKind::ALL
            .into_iter()
            .map(|kind| (kind, kind.required_attributes()))
            .collect();
        Self { required_by_kind }
    }

    /// Validates a raw document, returning every violation found (empty when valid).
    pub fn validate(&self, document: &WorkflowDocument) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if document.tasks.is_empty() {
            violations.push(SchemaViolation::document("workflow must declare at least one task"));
        }

        let mut seen_ids = HashSet::new();
        for (index, task) in document.tasks.iter().enumerate() {
            match task.id.as_deref().filter(|id| !id.trim().is_empty()) {
                Some(id) => {
                    if !seen_ids.insert(id) {
                        violations.push(SchemaViolation::task(index, task, format!("duplicate task id '{id}'")));
                    }
                }
                None => violations.push(SchemaViolation::task(index, task, "missing required attribute 'id'")),
            }

            for name in task.attributes.keys() {
                if TaskAttribute::from_name(name).is_none() {
                    violations.push(SchemaViolation::task(index, task, format!("unknown attribute '{name}'")));
                }
            }

            let Some(task_type) = non_blank(task.task_type.as_deref()) else {
                violations.push(SchemaViolation::task(index, task, "missing required attribute 'type'"));
                continue;
            };
            let Ok(kind) = task_type.parse::<TaskKind>() else {
                violations.push(SchemaViolation::task(index, task, format!("unknown task type '{task_type}'")));
                continue;
            };

            let required = self.required_by_kind.get(&kind).copied().unwrap_or_default();
            for attribute in required {
                if !has_non_blank_attribute(task, *attribute) {
                    violations.push(SchemaViolation::task(
                        index,
                        task,
                        format!("'{kind}' requires attribute '{attribute}'"),
                    ));
                }
            }
        }

        violations
    }
}

fn has_non_blank_attribute(task: &TaskDocument, attribute: TaskAttribute) -> bool {
    task.attributes.iter().any(|(name, value)| {
        TaskAttribute::from_name(name) == Some(attribute) && value.as_text().is_some_and(|text| !text.trim().is_empty())
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}
