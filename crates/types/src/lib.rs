//! Shared type definitions for Taskflow workflow documents and task declarations.

pub mod workflow;

pub use workflow::validation::{SchemaViolation, UnknownValidationMode, ValidationMode, WorkflowSchema};
pub use workflow::{
    AttributeValue, DeclarationError, TaskAttribute, TaskAttributes, TaskDeclaration, TaskDocument, TaskKind, UNKNOWN_WORKFLOW_ID,
    UnknownTaskKind, WorkflowDocument,
};
