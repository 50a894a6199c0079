//! Strongly typed task declarations shared by the loader, the engine, and the CLI.
//!
//! A workflow document is read into the raw [`WorkflowDocument`] shape first so
//! schema validation can report every problem at once. Each raw task is then
//! converted into an immutable [`TaskDeclaration`], which parses the `type` tag
//! into the closed [`TaskKind`] enumeration and normalizes attributes.
//! Attributes keep authoring order (via `IndexMap`) for diagnostics.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod validation;

/// Workflow identifier used when a document does not declare one.
pub const UNKNOWN_WORKFLOW_ID: &str = "unknown";

/// Recognized instruction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    /// Writes an interpolated value into the variable store.
    SetVar,
    /// Emits an interpolated message.
    Log,
    /// Presents two options and stores the chosen value.
    Choice,
    /// Jumps to `thenGo` or `elseGo` based on an equality test.
    Branch,
    /// Jumps unconditionally.
    Goto,
    /// Delegates a named side effect to the host application.
    Effect,
    /// Halts the run.
    End,
}

impl TaskKind {
    /// Every recognized kind, in documentation order.
    pub const ALL: [TaskKind; 7] = [
        TaskKind::SetVar,
        TaskKind::Log,
        TaskKind::Choice,
        TaskKind::Branch,
        TaskKind::Goto,
        TaskKind::Effect,
        TaskKind::End,
    ];

    /// Returns the authoring tag for this kind (the value of the `type` attribute).
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SetVar => "setVar",
            TaskKind::Log => "log",
            TaskKind::Choice => "choice",
            TaskKind::Branch => "branch",
            TaskKind::Goto => "goto",
            TaskKind::Effect => "effect",
            TaskKind::End => "end",
        }
    }

    /// Attributes that must be present (and non-blank) for this kind to execute.
    pub fn required_attributes(&self) -> &'static [TaskAttribute] {
        match self {
            TaskKind::SetVar => &[TaskAttribute::Key],
            TaskKind::Log | TaskKind::End => &[],
            TaskKind::Choice => &[
                TaskAttribute::Key,
                TaskAttribute::Prompt,
                TaskAttribute::OptionAText,
                TaskAttribute::OptionAValue,
                TaskAttribute::OptionBText,
                TaskAttribute::OptionBValue,
            ],
            TaskKind::Branch => &[TaskAttribute::IfEqualsKey, TaskAttribute::ThenGo, TaskAttribute::ElseGo],
            TaskKind::Goto => &[TaskAttribute::Go],
            TaskKind::Effect => &[TaskAttribute::Effect],
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a `type` tag does not name a recognized instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized instruction type '{0}'")]
pub struct UnknownTaskKind(pub String);

impl FromStr for TaskKind {
    type Err = UnknownTaskKind;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| UnknownTaskKind(tag.to_string()))
    }
}

/// Named attributes a task may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskAttribute {
    Key,
    Value,
    Message,
    IfEqualsKey,
    IfEqualsValue,
    ThenGo,
    ElseGo,
    Go,
    Prompt,
    OptionAText,
    OptionAValue,
    OptionBText,
    OptionBValue,
    Effect,
    Amount,
}

impl TaskAttribute {
    /// Every attribute, in documentation order.
    pub const ALL: [TaskAttribute; 15] = [
        TaskAttribute::Key,
        TaskAttribute::Value,
        TaskAttribute::Message,
        TaskAttribute::IfEqualsKey,
        TaskAttribute::IfEqualsValue,
        TaskAttribute::ThenGo,
        TaskAttribute::ElseGo,
        TaskAttribute::Go,
        TaskAttribute::Prompt,
        TaskAttribute::OptionAText,
        TaskAttribute::OptionAValue,
        TaskAttribute::OptionBText,
        TaskAttribute::OptionBValue,
        TaskAttribute::Effect,
        TaskAttribute::Amount,
    ];

    /// Canonical authoring name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAttribute::Key => "key",
            TaskAttribute::Value => "value",
            TaskAttribute::Message => "message",
            TaskAttribute::IfEqualsKey => "ifEqualsKey",
            TaskAttribute::IfEqualsValue => "ifEqualsValue",
            TaskAttribute::ThenGo => "thenGo",
            TaskAttribute::ElseGo => "elseGo",
            TaskAttribute::Go => "go",
            TaskAttribute::Prompt => "prompt",
            TaskAttribute::OptionAText => "optionAText",
            TaskAttribute::OptionAValue => "optionAValue",
            TaskAttribute::OptionBText => "optionBText",
            TaskAttribute::OptionBValue => "optionBValue",
            TaskAttribute::Effect => "effect",
            TaskAttribute::Amount => "amount",
        }
    }

    /// Resolves an authoring name, accepting the legacy `optionA`/`valueA`/`optionB`/`valueB` spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "optionA" => Some(TaskAttribute::OptionAText),
            "valueA" => Some(TaskAttribute::OptionAValue),
            "optionB" => Some(TaskAttribute::OptionBText),
            "valueB" => Some(TaskAttribute::OptionBValue),
            other => TaskAttribute::ALL.into_iter().find(|attribute| attribute.as_str() == other),
        }
    }
}

impl fmt::Display for TaskAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized attribute set of a task. Blank values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskAttributes {
    values: IndexMap<TaskAttribute, String>,
}

impl TaskAttributes {
    /// Creates an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; blank values are dropped.
    pub fn with(mut self, attribute: TaskAttribute, value: impl Into<String>) -> Self {
        self.insert(attribute, value);
        self
    }

    /// Inserts a value, treating empty or whitespace-only text as absent.
    pub fn insert(&mut self, attribute: TaskAttribute, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.values.shift_remove(&attribute);
            return;
        }
        self.values.insert(attribute, value);
    }

    /// Returns the value of an attribute when present.
    pub fn get(&self, attribute: TaskAttribute) -> Option<&str> {
        self.values.get(&attribute).map(String::as_str)
    }

    pub fn contains(&self, attribute: TaskAttribute) -> bool {
        self.values.contains_key(&attribute)
    }

    /// Iterates populated attributes in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskAttribute, &str)> {
        self.values.iter().map(|(attribute, value)| (*attribute, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Errors raised while converting a raw task into a [`TaskDeclaration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The task at `index` has no usable `id`.
    #[error("task #{index} is missing the required 'id' attribute")]
    MissingTaskId { index: usize },

    /// The task has no usable `type`.
    #[error("task '{task_id}' is missing the required 'type' attribute")]
    MissingTaskType { task_id: String },

    /// The `type` tag does not name a recognized instruction.
    #[error("unknown instruction type '{task_type}' for task '{task_id}'")]
    UnknownInstruction { task_id: String, task_type: String },
}

/// One immutable instruction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDeclaration {
    id: String,
    kind: TaskKind,
    attributes: TaskAttributes,
}

impl TaskDeclaration {
    /// Creates a declaration from already-typed parts.
    pub fn new(id: impl Into<String>, kind: TaskKind, attributes: TaskAttributes) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes,
        }
    }

    /// Converts a raw document task, parsing its `type` tag eagerly.
    ///
    /// Unknown attribute names are ignored here; schema validation reports them.
    pub fn from_document(index: usize, task: &TaskDocument) -> Result<Self, DeclarationError> {
        // Ids are kept verbatim so jump targets match them exactly.
        let id = task
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(DeclarationError::MissingTaskId { index })?;

        let task_type = task
            .task_type
            .as_deref()
            .map(str::trim)
            .filter(|task_type| !task_type.is_empty())
            .ok_or_else(|| DeclarationError::MissingTaskType { task_id: id.to_string() })?;

        let kind = task_type.parse::<TaskKind>().map_err(|_| DeclarationError::UnknownInstruction {
            task_id: id.to_string(),
            task_type: task_type.to_string(),
        })?;

        let mut attributes = TaskAttributes::new();
        for (name, value) in &task.attributes {
            if let (Some(attribute), Some(text)) = (TaskAttribute::from_name(name), value.as_text()) {
                attributes.insert(attribute, text);
            }
        }

        Ok(Self::new(id, kind, attributes))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn attributes(&self) -> &TaskAttributes {
        &self.attributes
    }

    /// Shorthand for `attributes().get(attribute)`.
    pub fn attribute(&self, attribute: TaskAttribute) -> Option<&str> {
        self.attributes.get(attribute)
    }
}

/// Raw workflow document as authored, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Optional workflow identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Tasks in declaration order.
    #[serde(default)]
    pub tasks: Vec<TaskDocument>,
}

impl WorkflowDocument {
    /// Workflow identifier, defaulting to [`UNKNOWN_WORKFLOW_ID`] when absent or blank.
    pub fn workflow_id(&self) -> &str {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_WORKFLOW_ID)
    }
}

/// Raw task entry as authored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDocument {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub task_type: Option<String>,
    /// Every other attribute, keyed by its authored name.
    #[serde(flatten)]
    pub attributes: IndexMap<String, AttributeValue>,
}

/// Scalar attribute value. YAML and JSON authors may write numbers or booleans
/// where the engine expects text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
    Null,
}

impl AttributeValue {
    /// Textual form used by the engine; `None` for null.
    pub fn as_text(&self) -> Option<String> {
        match self {
            AttributeValue::Text(text) => Some(text.clone()),
            AttributeValue::Integer(number) => Some(number.to_string()),
            AttributeValue::Float(number) => Some(number.to_string()),
            AttributeValue::Flag(flag) => Some(flag.to_string()),
            AttributeValue::Null => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        AttributeValue::Text(text.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        AttributeValue::Text(text)
    }
}
