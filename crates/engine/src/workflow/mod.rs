//! Named workflows and the pieces that load and drive them.
//!
//! - [`document`] turns XML, YAML, or JSON text into a [`Workflow`], applying the
//!   configured [`taskflow_types::ValidationMode`].
//! - [`runner`] drives an [`Execution`] to completion, answering suspensions with
//!   a [`ChoicePresenter`].

use taskflow_types::TaskDeclaration;

use crate::{
    catalog::TaskCatalog,
    error::EngineError,
    executor::{ChoicePresenter, EffectDispatcher, Execution, LogSink, TracingLogSink},
    store::VariableStore,
};

pub mod document;
pub mod runner;
mod xml;

pub use runner::{RunReport, drive_execution, run_in_sequence};

/// A task catalog together with the identifier of the document it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    id: String,
    catalog: TaskCatalog,
}

impl Workflow {
    pub fn new(id: impl Into<String>, catalog: TaskCatalog) -> Self {
        Self { id: id.into(), catalog }
    }

    /// Builds the catalog from declarations in authoring order.
    pub fn from_declarations(id: impl Into<String>, declarations: impl IntoIterator<Item = TaskDeclaration>) -> Result<Self, EngineError> {
        Ok(Self::new(id, TaskCatalog::new(declarations)?))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Creates a resumable execution positioned at the first task.
    pub fn start(&self) -> Execution<'_> {
        Execution::new(&self.id, &self.catalog)
    }

    /// Runs the workflow to completion against `store`, sending `log` output to
    /// `tracing`.
    pub fn run(
        &self,
        store: &mut VariableStore,
        presenter: &mut dyn ChoicePresenter,
        effects: &mut dyn EffectDispatcher,
    ) -> Result<RunReport, EngineError> {
        self.run_with_log(store, presenter, effects, &mut TracingLogSink)
    }

    /// Same as [`Workflow::run`] with an explicit log sink.
    pub fn run_with_log(
        &self,
        store: &mut VariableStore,
        presenter: &mut dyn ChoicePresenter,
        effects: &mut dyn EffectDispatcher,
        log: &mut dyn LogSink,
    ) -> Result<RunReport, EngineError> {
        runner::drive_execution(self.start(), presenter, store, effects, log)
    }
}
