//! Workflow document loading.
//!
//! Reads XML, YAML, or JSON into the shared [`WorkflowDocument`] shape, checks
//! it against the cached [`WorkflowSchema`] according to a [`ValidationMode`],
//! and converts it into a [`Workflow`]. Catalog construction still rejects
//! duplicate ids and unknown instructions when validation is relaxed.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use once_cell::sync::OnceCell;
use taskflow_types::{SchemaViolation, TaskDeclaration, ValidationMode, WorkflowDocument, WorkflowSchema};
use thiserror::Error;
use tracing::{debug, warn};

use super::{Workflow, xml};
use crate::error::EngineError;

static SCHEMA: OnceCell<WorkflowSchema> = OnceCell::new();

/// Serialization formats accepted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Xml,
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Format implied by the file extension, if recognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "xml" => Some(DocumentFormat::Xml),
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    /// Extension first, then content sniffing: a leading `<` means XML,
    /// anything else is read as YAML (which also accepts JSON).
    pub fn detect(path: &Path, text: &str) -> Self {
        Self::from_path(path).unwrap_or_else(|| {
            if text.trim_start().starts_with('<') {
                DocumentFormat::Xml
            } else {
                DocumentFormat::Yaml
            }
        })
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Xml => f.write_str("XML"),
            DocumentFormat::Yaml => f.write_str("YAML"),
            DocumentFormat::Json => f.write_str("JSON"),
        }
    }
}

/// Errors raised while loading a workflow document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read workflow file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed XML: {reason}")]
    Xml { reason: String },

    #[error("malformed {format} workflow document: {reason}")]
    Document { format: DocumentFormat, reason: String },

    #[error("root element must be 'workflow', found '{found}'")]
    NotAWorkflow { found: String },

    #[error("workflow '{workflow_id}' violates the task schema:\n{}", render_violations(.violations))]
    Schema {
        workflow_id: String,
        violations: Vec<SchemaViolation>,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

fn render_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Process-wide schema, compiled on first use.
pub fn workflow_schema() -> &'static WorkflowSchema {
    SCHEMA.get_or_init(WorkflowSchema::compile)
}

/// Loads a workflow file, detecting the format from its extension or content.
///
/// # Errors
///
/// Returns [`LoadError`] when the file cannot be read or parsed, when `mode` is
/// [`ValidationMode::FailFast`] and the schema is violated, or when the tasks
/// cannot form a catalog.
pub fn load_workflow_file(path: impl AsRef<Path>, mode: ValidationMode) -> Result<Workflow, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = DocumentFormat::detect(path, &text);
    debug!(path = %path.display(), format = %format, mode = %mode, "loading workflow document");
    load_workflow_str(&text, format, mode)
}

/// Loads a workflow from in-memory text of a known format.
pub fn load_workflow_str(text: &str, format: DocumentFormat, mode: ValidationMode) -> Result<Workflow, LoadError> {
    let document = parse_document(text, format)?;
    validate_document(&document, mode)?;
    workflow_from_document(&document)
}

/// Parses text into the raw document shape without validating it.
pub fn parse_document(text: &str, format: DocumentFormat) -> Result<WorkflowDocument, LoadError> {
    match format {
        DocumentFormat::Xml => xml::parse_workflow_xml(text),
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|error| LoadError::Document {
            format,
            reason: error.to_string(),
        }),
        DocumentFormat::Json => serde_json::from_str(text).map_err(|error| LoadError::Document {
            format,
            reason: error.to_string(),
        }),
    }
}

/// Applies `mode` to the schema violations of `document`.
pub fn validate_document(document: &WorkflowDocument, mode: ValidationMode) -> Result<(), LoadError> {
    if mode == ValidationMode::None {
        return Ok(());
    }

    let violations = workflow_schema().validate(document);
    if violations.is_empty() {
        return Ok(());
    }

    match mode {
        ValidationMode::FailFast => Err(LoadError::Schema {
            workflow_id: document.workflow_id().to_string(),
            violations,
        }),
        _ => {
            for violation in &violations {
                warn!(workflow = %document.workflow_id(), violation = %violation, "workflow schema violation");
            }
            Ok(())
        }
    }
}

/// Builds declarations and the task catalog from a raw document.
pub fn workflow_from_document(document: &WorkflowDocument) -> Result<Workflow, LoadError> {
    let declarations = document
        .tasks
        .iter()
        .enumerate()
        .map(|(index, task)| TaskDeclaration::from_document(index, task))
        .collect::<Result<Vec<_>, _>>()
        .map_err(EngineError::from)?;

    Ok(Workflow::from_declarations(document.workflow_id(), declarations)?)
}
