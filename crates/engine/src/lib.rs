//! # Taskflow Engine
//!
//! Interprets data-driven task sequences: an ordered catalog of typed tasks
//! (`setVar`, `log`, `choice`, `branch`, `goto`, `effect`, `end`) executed one
//! at a time against a shared string-keyed [`VariableStore`].
//!
//! ## Usage
//!
//! ```rust
//! use taskflow_engine::{DocumentFormat, NoEffects, RecordingLogSink, ScriptedPresenter, VariableStore, load_workflow_str};
//! use taskflow_types::ValidationMode;
//!
//! let workflow = load_workflow_str(
//!     r#"<workflow id="intro">
//!          <task id="t1" type="setVar" key="gold" value="10"/>
//!          <task id="t2" type="log" message="gold=${gold}"/>
//!        </workflow>"#,
//!     DocumentFormat::Xml,
//!     ValidationMode::FailFast,
//! )?;
//!
//! let mut store = VariableStore::new();
//! let mut log = RecordingLogSink::new();
//! workflow.run_with_log(&mut store, &mut ScriptedPresenter::default(), &mut NoEffects, &mut log)?;
//! assert_eq!(log.messages(), ["gold=10"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`catalog`**: ordered, id-unique task lookup with successor resolution
//! - **`store`** / **`templates`**: variable storage and `${name}` interpolation
//! - **`executor`**: the resumable execution state machine plus the choice,
//!   effect, and log contracts the host implements
//! - **`workflow`**: document loading, schema validation modes, and the
//!   synchronous runner

pub mod catalog;
pub mod error;
pub mod executor;
pub mod store;
pub mod templates;
pub mod workflow;

pub use catalog::TaskCatalog;
pub use error::EngineError;
pub use executor::{
    ChoiceEntry, ChoiceOption, ChoicePresenter, ChoiceRequest, DemoGameEffects, EffectDispatcher, EffectError, EffectParameters, Execution,
    InvalidChoiceOption, LogSink, NoEffects, PendingChoice, PresenterError, RecordingLogSink, RunContext, RunOutcome, ScriptedPresenter,
    TracingLogSink,
};
pub use store::VariableStore;
pub use workflow::document::{
    DocumentFormat, LoadError, load_workflow_file, load_workflow_str, parse_document, validate_document, workflow_from_document,
    workflow_schema,
};
pub use workflow::{RunReport, Workflow, run_in_sequence};
