//! Error types raised while building catalogs and executing workflows.
//!
//! Every variant is fatal to the run that raised it. The engine never retries
//! or skips; callers decide what to do with the store afterwards.

use taskflow_types::{DeclarationError, TaskAttribute, TaskKind};
use thiserror::Error;

use crate::executor::{EffectError, PresenterError};

/// Main error type for catalog construction and workflow execution.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty task list or duplicate task id.
    #[error("malformed catalog: {reason}")]
    MalformedCatalog { reason: String },

    /// A task lacks an attribute its instruction kind requires.
    #[error("task '{task_id}' ({kind}) is missing required attribute '{attribute}'")]
    MissingAttribute {
        task_id: String,
        kind: TaskKind,
        attribute: TaskAttribute,
    },

    /// The cursor references an id that is not in the catalog.
    #[error("task not found: '{task_id}'")]
    TaskNotFound { task_id: String },

    /// The `type` tag does not name a recognized instruction.
    #[error("unknown instruction type '{task_type}' for task '{task_id}'")]
    UnknownInstruction { task_id: String, task_type: String },

    /// A task declaration has no usable id.
    #[error("task #{index} is missing the required 'id' attribute")]
    MissingTaskId { index: usize },

    /// A task declaration has no usable type.
    #[error("task '{task_id}' is missing the required 'type' attribute")]
    MissingTaskType { task_id: String },

    /// The effect dispatcher does not recognize the effect name.
    #[error("unknown effect '{effect}' requested by task '{task_id}'")]
    UnknownEffect { task_id: String, effect: String },

    /// The effect dispatcher recognized the effect but could not apply it.
    #[error("effect '{effect}' failed in task '{task_id}': {reason}")]
    EffectFailed {
        task_id: String,
        effect: String,
        reason: String,
    },

    /// The choice surface could not obtain a selection.
    #[error("choice presentation failed in task '{task_id}': {source}")]
    Presenter {
        task_id: String,
        #[source]
        source: PresenterError,
    },

    /// `resume` was called while no choice was pending.
    #[error("workflow '{workflow_id}' is not awaiting a choice")]
    NotAwaitingChoice { workflow_id: String },
}

impl EngineError {
    pub(crate) fn from_effect(task_id: &str, error: EffectError) -> Self {
        match error {
            EffectError::UnknownEffect { effect } => EngineError::UnknownEffect {
                task_id: task_id.to_string(),
                effect,
            },
            EffectError::InvalidParameters { effect, reason } | EffectError::Failed { effect, reason } => EngineError::EffectFailed {
                task_id: task_id.to_string(),
                effect,
                reason,
            },
        }
    }
}

impl From<DeclarationError> for EngineError {
    fn from(error: DeclarationError) -> Self {
        match error {
            DeclarationError::MissingTaskId { index } => EngineError::MissingTaskId { index },
            DeclarationError::MissingTaskType { task_id } => EngineError::MissingTaskType { task_id },
            DeclarationError::UnknownInstruction { task_id, task_type } => EngineError::UnknownInstruction { task_id, task_type },
        }
    }
}
