//! XML reader for workflow documents.
//!
//! The root element must be `workflow`; every `task` element below it, at any
//! depth, becomes one raw task in document order. Namespace prefixes on element
//! names are ignored and prefixed attributes (`xmlns:*`, `xsi:*`) are skipped.

use std::fmt::Display;

use quick_xml::{Reader, events::BytesStart, events::Event};
use taskflow_types::{AttributeValue, TaskDocument, WorkflowDocument};

use super::document::LoadError;

const ROOT_ELEMENT: &str = "workflow";
const TASK_ELEMENT: &str = "task";

pub(crate) fn parse_workflow_xml(text: &str) -> Result<WorkflowDocument, LoadError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut document = WorkflowDocument::default();
    let mut root_seen = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(error) => {
                return Err(LoadError::Xml {
                    reason: format!("at byte {}: {error}", reader.buffer_position()),
                });
            }
        };

        match event {
            Event::Start(element) | Event::Empty(element) => {
                let name = local_name(&element)?;
                if !root_seen {
                    if name != ROOT_ELEMENT {
                        return Err(LoadError::NotAWorkflow { found: name });
                    }
                    root_seen = true;
                    document.id = read_task_attributes(&element)?.id;
                } else if name == TASK_ELEMENT {
                    document.tasks.push(read_task_attributes(&element)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(LoadError::Xml {
            reason: "document has no root element".to_string(),
        });
    }
    Ok(document)
}

fn local_name(element: &BytesStart<'_>) -> Result<String, LoadError> {
    std::str::from_utf8(element.local_name().as_ref())
        .map(str::to_string)
        .map_err(xml_error)
}

fn read_task_attributes(element: &BytesStart<'_>) -> Result<TaskDocument, LoadError> {
    let mut task = TaskDocument::default();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        if attribute.key.prefix().is_some() || attribute.key.as_namespace_binding().is_some() {
            continue;
        }

        let name = std::str::from_utf8(attribute.key.local_name().as_ref())
            .map_err(xml_error)?
            .to_string();
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();

        match name.as_str() {
            "id" => task.id = Some(value),
            "type" => task.task_type = Some(value),
            _ => {
                task.attributes.insert(name, AttributeValue::Text(value));
            }
        }
    }

    Ok(task)
}

fn xml_error(error: impl Display) -> LoadError {
    LoadError::Xml {
        reason: error.to_string(),
    }
}
