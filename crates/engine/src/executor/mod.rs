//! Execution engine: a fetch-dispatch-transition loop over a [`TaskCatalog`].
//!
//! - [`Execution`] is the resumable state machine. Its only control state is the
//!   cursor (the id of the task about to run) plus an optional pending choice.
//! - `choice` tasks suspend the loop and surface a [`PendingChoice`]; the caller
//!   resolves it with [`Execution::resume`], which performs the store write and
//!   continues from the task after the choice.
//! - `effect` tasks are delegated to an [`EffectDispatcher`]; `log` messages go
//!   to a [`LogSink`].
//!
//! The synchronous runner in [`crate::workflow::runner`] drives this machine and
//! answers suspensions with a [`ChoicePresenter`] in the same call stack.

use std::collections::VecDeque;

use taskflow_types::{TaskAttribute, TaskDeclaration, TaskKind};
use tracing::debug;

use crate::{catalog::TaskCatalog, error::EngineError, store::VariableStore};

pub mod effects;
pub mod log_sink;
pub mod presenter;

pub use effects::{DemoGameEffects, EffectDispatcher, EffectError, EffectParameters, NoEffects};
pub use log_sink::{LogSink, RecordingLogSink, TracingLogSink};
pub use presenter::{ChoiceEntry, ChoiceOption, ChoicePresenter, ChoiceRequest, InvalidChoiceOption, PresenterError, ScriptedPresenter};

/// Number of most recent task ids an execution remembers.
pub const VISITED_HISTORY_LIMIT: usize = 256;

/// Attributes forwarded to the effect dispatcher, in parameter order.
const EFFECT_PARAMETER_ATTRIBUTES: [TaskAttribute; 3] = [TaskAttribute::Amount, TaskAttribute::Key, TaskAttribute::Value];

/// Host collaborators a run reads and writes.
pub struct RunContext<'a> {
    /// Variable store mutated by `setVar`, resolved choices, and effects.
    pub store: &'a mut VariableStore,
    /// Executes `effect` tasks.
    pub effects: &'a mut dyn EffectDispatcher,
    /// Receives interpolated `log` messages.
    pub log: &'a mut dyn LogSink,
}

/// A choice the execution is suspended on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChoice {
    task_id: String,
    key: String,
    request: ChoiceRequest,
    resume_at: Option<String>,
}

impl PendingChoice {
    /// Id of the `choice` task that suspended the run.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Store key the chosen value is written to.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn request(&self) -> &ChoiceRequest {
        &self.request
    }

    /// Task the run continues with once the choice is resolved.
    pub fn resume_at(&self) -> Option<&str> {
        self.resume_at.as_deref()
    }
}

/// Result of driving an execution until it can go no further on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The cursor ran off the end of the catalog or hit an `end` task.
    Completed,
    /// A `choice` task is waiting for [`Execution::resume`].
    AwaitingChoice(PendingChoice),
}

enum Transition {
    Continue(Option<String>),
    Await(PendingChoice),
    Halt,
}

/// Resumable execution state of one workflow run.
#[derive(Debug, Clone)]
pub struct Execution<'w> {
    workflow_id: &'w str,
    catalog: &'w TaskCatalog,
    cursor: Option<String>,
    pending: Option<PendingChoice>,
    visited: VecDeque<String>,
    steps: usize,
}

impl<'w> Execution<'w> {
    /// Creates an execution positioned at the catalog's first task.
    pub fn new(workflow_id: &'w str, catalog: &'w TaskCatalog) -> Self {
        Self {
            workflow_id,
            catalog,
            cursor: Some(catalog.first_id().to_string()),
            pending: None,
            visited: VecDeque::new(),
            steps: 0,
        }
    }

    pub fn workflow_id(&self) -> &str {
        self.workflow_id
    }

    /// Id of the next task to run; `None` once the run is terminal.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        self.pending.as_ref()
    }

    /// Ids of the most recently dispatched tasks, oldest first. At most
    /// [`VISITED_HISTORY_LIMIT`] ids are kept, so looping workflows stay bounded.
    pub fn visited(&self) -> impl Iterator<Item = &str> {
        self.visited.iter().map(String::as_str)
    }

    /// Total number of tasks dispatched, including ids dropped from the history.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn into_visited(self) -> Vec<String> {
        self.visited.into()
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_none() && self.pending.is_none()
    }

    /// Runs tasks until the workflow completes or suspends on a choice.
    ///
    /// Calling `advance` while a choice is pending returns the same pending
    /// choice without running anything.
    ///
    /// # Errors
    ///
    /// Any [`EngineError`] aborts the run; the cursor stays on the failing task.
    pub fn advance(&mut self, context: &mut RunContext<'_>) -> Result<RunOutcome, EngineError> {
        if let Some(pending) = &self.pending {
            return Ok(RunOutcome::AwaitingChoice(pending.clone()));
        }

        let catalog = self.catalog;
        while let Some(task_id) = self.cursor.clone() {
            let task = catalog.lookup(&task_id)?;
            self.record_visit(task_id);

            match self.dispatch(task, context)? {
                Transition::Continue(next) => self.cursor = next,
                Transition::Await(pending) => {
                    self.cursor = pending.resume_at.clone();
                    self.pending = Some(pending.clone());
                    return Ok(RunOutcome::AwaitingChoice(pending));
                }
                Transition::Halt => self.cursor = None,
            }
        }

        Ok(RunOutcome::Completed)
    }

    /// Resolves the pending choice with `option`, writes the chosen value into
    /// the store, and continues the run.
    pub fn resume(&mut self, option: ChoiceOption, context: &mut RunContext<'_>) -> Result<RunOutcome, EngineError> {
        let pending = self.pending.take().ok_or_else(|| EngineError::NotAwaitingChoice {
            workflow_id: self.workflow_id.to_string(),
        })?;

        let value = pending.request.value_of(option).to_string();
        debug!(
            workflow = %self.workflow_id,
            task_id = %pending.task_id,
            option = %option,
            key = %pending.key,
            "choice resolved"
        );
        context.store.set(pending.key, value);

        self.advance(context)
    }

    fn record_visit(&mut self, task_id: String) {
        if self.visited.len() == VISITED_HISTORY_LIMIT {
            self.visited.pop_front();
        }
        self.visited.push_back(task_id);
        self.steps += 1;
    }

    fn dispatch(&self, task: &TaskDeclaration, context: &mut RunContext<'_>) -> Result<Transition, EngineError> {
        let task_id = task.id();
        let successor = || self.catalog.successor_of(task_id).map(str::to_string);
        debug!(workflow = %self.workflow_id, task_id = %task_id, kind = %task.kind(), "dispatching task");

        match task.kind() {
            TaskKind::SetVar => {
                let key = require(task, TaskAttribute::Key)?;
                let value = task
                    .attribute(TaskAttribute::Value)
                    .map(|raw| context.store.interpolate(raw))
                    .unwrap_or_default();
                context.store.set(key, value);
                Ok(Transition::Continue(successor()))
            }
            TaskKind::Log => {
                let message = context.store.interpolate(task.attribute(TaskAttribute::Message).unwrap_or_default());
                context.log.emit(self.workflow_id, task_id, &message);
                Ok(Transition::Continue(successor()))
            }
            TaskKind::Choice => {
                let key = require(task, TaskAttribute::Key)?;
                let prompt = require(task, TaskAttribute::Prompt)?;
                let option_a_text = require(task, TaskAttribute::OptionAText)?;
                let option_a_value = require(task, TaskAttribute::OptionAValue)?;
                let option_b_text = require(task, TaskAttribute::OptionBText)?;
                let option_b_value = require(task, TaskAttribute::OptionBValue)?;

                let request = ChoiceRequest {
                    prompt: context.store.interpolate(prompt),
                    option_a: ChoiceEntry {
                        text: context.store.interpolate(option_a_text),
                        value: option_a_value.to_string(),
                    },
                    option_b: ChoiceEntry {
                        text: context.store.interpolate(option_b_text),
                        value: option_b_value.to_string(),
                    },
                };

                Ok(Transition::Await(PendingChoice {
                    task_id: task_id.to_string(),
                    key: key.to_string(),
                    request,
                    resume_at: successor(),
                }))
            }
            TaskKind::Branch => {
                let key = require(task, TaskAttribute::IfEqualsKey)?;
                let then_go = require(task, TaskAttribute::ThenGo)?;
                let else_go = require(task, TaskAttribute::ElseGo)?;

                // A variable that was never set matches nothing.
                let actual = context.store.get(key);
                let matched = actual.is_some() && actual == task.attribute(TaskAttribute::IfEqualsValue);
                let target = if matched { then_go } else { else_go };
                debug!(task_id = %task_id, key = %key, matched, next = %target, "branch evaluated");
                Ok(Transition::Continue(Some(target.to_string())))
            }
            TaskKind::Goto => {
                let target = require(task, TaskAttribute::Go)?;
                Ok(Transition::Continue(Some(target.to_string())))
            }
            TaskKind::Effect => {
                let effect = require(task, TaskAttribute::Effect)?;
                let parameters = effect_parameters(task, context.store);
                debug!(task_id = %task_id, effect = %effect, parameters = parameters.len(), "dispatching effect");
                context
                    .effects
                    .dispatch(effect, &parameters, context.store)
                    .map_err(|error| EngineError::from_effect(task_id, error))?;
                Ok(Transition::Continue(successor()))
            }
            TaskKind::End => Ok(Transition::Halt),
        }
    }
}

/// Builds the effect parameter map from the task's populated attributes.
pub fn effect_parameters(task: &TaskDeclaration, store: &VariableStore) -> EffectParameters {
    EFFECT_PARAMETER_ATTRIBUTES
        .into_iter()
        .filter_map(|attribute| {
            task.attribute(attribute)
                .map(|raw| (attribute.as_str().to_string(), store.interpolate(raw)))
        })
        .collect()
}

fn require(task: &TaskDeclaration, attribute: TaskAttribute) -> Result<&str, EngineError> {
    task.attribute(attribute).ok_or_else(|| EngineError::MissingAttribute {
        task_id: task.id().to_string(),
        kind: task.kind(),
        attribute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskflow_types::TaskAttributes;

    fn task(id: &str, kind: TaskKind, attributes: &[(TaskAttribute, &str)]) -> TaskDeclaration {
        let attributes = attributes
            .iter()
            .fold(TaskAttributes::new(), |set, (attribute, value)| set.with(*attribute, *value));
        TaskDeclaration::new(id, kind, attributes)
    }

    struct Harness {
        store: VariableStore,
        effects: DemoGameEffects,
        log: RecordingLogSink,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: VariableStore::new(),
                effects: DemoGameEffects,
                log: RecordingLogSink::new(),
            }
        }

        fn context(&mut self) -> RunContext<'_> {
            RunContext {
                store: &mut self.store,
                effects: &mut self.effects,
                log: &mut self.log,
            }
        }
    }

    fn run_to_completion(catalog: &TaskCatalog, harness: &mut Harness) -> Result<Vec<String>, EngineError> {
        let mut execution = Execution::new("test", catalog);
        let outcome = execution.advance(&mut harness.context())?;
        assert_eq!(outcome, RunOutcome::Completed);
        Ok(execution.into_visited())
    }

    #[test]
    fn set_var_value_is_visible_to_later_log() {
        let catalog = TaskCatalog::new(vec![
            task("t1", TaskKind::SetVar, &[(TaskAttribute::Key, "gold"), (TaskAttribute::Value, "10")]),
            task("t2", TaskKind::Log, &[(TaskAttribute::Message, "${gold}")]),
        ])
        .expect("catalog");
        let mut harness = Harness::new();

        run_to_completion(&catalog, &mut harness).expect("run");
        assert_eq!(harness.log.messages(), ["10"]);
    }

    #[test]
    fn set_var_without_value_stores_empty_string() {
        let catalog = TaskCatalog::new(vec![task("t1", TaskKind::SetVar, &[(TaskAttribute::Key, "note")])]).expect("catalog");
        let mut harness = Harness::new();

        run_to_completion(&catalog, &mut harness).expect("run");
        assert_eq!(harness.store.get("note"), Some(""));
    }

    #[test]
    fn set_var_interpolates_its_value() {
        let catalog = TaskCatalog::new(vec![
            task("t1", TaskKind::SetVar, &[(TaskAttribute::Key, "name"), (TaskAttribute::Value, "Aki")]),
            task(
                "t2",
                TaskKind::SetVar,
                &[(TaskAttribute::Key, "greeting"), (TaskAttribute::Value, "hi ${name}")],
            ),
        ])
        .expect("catalog");
        let mut harness = Harness::new();

        run_to_completion(&catalog, &mut harness).expect("run");
        assert_eq!(harness.store.get("greeting"), Some("hi Aki"));
    }

    fn branch_catalog() -> TaskCatalog {
        TaskCatalog::new(vec![
            task(
                "check",
                TaskKind::Branch,
                &[
                    (TaskAttribute::IfEqualsKey, "flag"),
                    (TaskAttribute::IfEqualsValue, "true"),
                    (TaskAttribute::ThenGo, "yes"),
                    (TaskAttribute::ElseGo, "no"),
                ],
            ),
            task("yes", TaskKind::Log, &[(TaskAttribute::Message, "then")]),
            task("yes_end", TaskKind::End, &[]),
            task("no", TaskKind::Log, &[(TaskAttribute::Message, "else")]),
        ])
        .expect("catalog")
    }

    #[test]
    fn branch_takes_then_on_exact_match() {
        let catalog = branch_catalog();
        let mut harness = Harness::new();
        harness.store.set("flag", "true");

        let visited = run_to_completion(&catalog, &mut harness).expect("run");
        assert_eq!(visited, ["check", "yes", "yes_end"]);
        assert_eq!(harness.log.messages(), ["then"]);
    }

    #[test]
    fn branch_takes_else_on_mismatch_or_missing_variable() {
        for stored in [Some("false"), Some("TRUE"), None] {
            let catalog = branch_catalog();
            let mut harness = Harness::new();
            if let Some(value) = stored {
                harness.store.set("flag", value);
            }

            let visited = run_to_completion(&catalog, &mut harness).expect("run");
            assert_eq!(visited, ["check", "no"], "stored value {stored:?}");
        }
    }

    #[test]
    fn goto_to_missing_task_fails_with_task_not_found() {
        let catalog = TaskCatalog::new(vec![
            task("jump", TaskKind::Goto, &[(TaskAttribute::Go, "nowhere")]),
            task("after", TaskKind::Log, &[]),
        ])
        .expect("catalog");
        let mut harness = Harness::new();
        let mut execution = Execution::new("test", &catalog);

        let error = execution.advance(&mut harness.context()).expect_err("dangling goto");
        assert!(matches!(error, EngineError::TaskNotFound { ref task_id } if task_id == "nowhere"), "{error}");
        assert_eq!(execution.cursor(), Some("nowhere"));
    }

    #[test]
    fn missing_required_attribute_is_fatal() {
        let catalog = TaskCatalog::new(vec![
            task("bad", TaskKind::Branch, &[(TaskAttribute::IfEqualsKey, "flag"), (TaskAttribute::ThenGo, "x")]),
            task("x", TaskKind::Log, &[]),
        ])
        .expect("catalog");
        let mut harness = Harness::new();

        let error = run_to_completion(&catalog, &mut harness).expect_err("missing elseGo");
        assert!(
            matches!(
                error,
                EngineError::MissingAttribute {
                    ref task_id,
                    attribute: TaskAttribute::ElseGo,
                    ..
                } if task_id == "bad"
            ),
            "{error}"
        );
        assert!(harness.log.messages().is_empty());
    }

    #[test]
    fn looping_workflow_keeps_a_bounded_history() {
        let catalog = TaskCatalog::new(vec![
            task("tick", TaskKind::Effect, &[(TaskAttribute::Effect, "addGold"), (TaskAttribute::Amount, "1")]),
            task(
                "check",
                TaskKind::Branch,
                &[
                    (TaskAttribute::IfEqualsKey, "gold"),
                    (TaskAttribute::IfEqualsValue, "300"),
                    (TaskAttribute::ThenGo, "done"),
                    (TaskAttribute::ElseGo, "tick"),
                ],
            ),
            task("done", TaskKind::End, &[]),
        ])
        .expect("catalog");
        let mut harness = Harness::new();
        let mut execution = Execution::new("test", &catalog);

        let outcome = execution.advance(&mut harness.context()).expect("run");
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(harness.store.get("gold"), Some("300"));
        assert_eq!(execution.steps(), 601);
        assert_eq!(execution.visited().count(), VISITED_HISTORY_LIMIT);
        assert_eq!(execution.visited().last(), Some("done"));
    }

    #[test]
    fn end_halts_before_later_tasks() {
        let catalog = TaskCatalog::new(vec![
            task("stop", TaskKind::End, &[]),
            task("never", TaskKind::Log, &[(TaskAttribute::Message, "unreachable")]),
        ])
        .expect("catalog");
        let mut harness = Harness::new();

        let visited = run_to_completion(&catalog, &mut harness).expect("run");
        assert_eq!(visited, ["stop"]);
        assert!(harness.log.messages().is_empty());
    }

    #[test]
    fn effect_receives_interpolated_parameters() {
        let catalog = TaskCatalog::new(vec![task(
            "fx",
            TaskKind::Effect,
            &[
                (TaskAttribute::Effect, "record"),
                (TaskAttribute::Amount, "${n}"),
                (TaskAttribute::Key, "k_${n}"),
            ],
        )])
        .expect("catalog");

        let mut store: VariableStore = [("n", "7")].into_iter().collect();
        let mut seen = Vec::new();
        let mut effects = |effect: &str, parameters: &EffectParameters, _store: &mut VariableStore| {
            seen.push((effect.to_string(), parameters.clone()));
            Ok::<(), EffectError>(())
        };
        let mut log = RecordingLogSink::new();
        let mut context = RunContext {
            store: &mut store,
            effects: &mut effects,
            log: &mut log,
        };

        Execution::new("test", &catalog).advance(&mut context).expect("run");
        drop(context);

        let (effect, parameters) = &seen[0];
        assert_eq!(effect, "record");
        let entries: Vec<(&str, &str)> = parameters.iter().map(|(name, value)| (name.as_str(), value.as_str())).collect();
        assert_eq!(entries, vec![("amount", "7"), ("key", "k_7")]);
    }

    #[test]
    fn unknown_effect_is_fatal() {
        let catalog = TaskCatalog::new(vec![task("fx", TaskKind::Effect, &[(TaskAttribute::Effect, "summonDragon")])]).expect("catalog");
        let mut harness = Harness::new();

        let error = run_to_completion(&catalog, &mut harness).expect_err("unknown effect");
        assert!(matches!(error, EngineError::UnknownEffect { ref effect, .. } if effect == "summonDragon"), "{error}");
    }

    fn choice_catalog() -> TaskCatalog {
        TaskCatalog::new(vec![
            task("name", TaskKind::SetVar, &[(TaskAttribute::Key, "who"), (TaskAttribute::Value, "traveller")]),
            task(
                "ask",
                TaskKind::Choice,
                &[
                    (TaskAttribute::Key, "answer"),
                    (TaskAttribute::Prompt, "Help the ${who}?"),
                    (TaskAttribute::OptionAText, "Yes"),
                    (TaskAttribute::OptionAValue, "help"),
                    (TaskAttribute::OptionBText, "No"),
                    (TaskAttribute::OptionBValue, "ignore"),
                ],
            ),
            task("done", TaskKind::Log, &[(TaskAttribute::Message, "answer=${answer}")]),
        ])
        .expect("catalog")
    }

    #[test]
    fn choice_suspends_and_resume_writes_the_chosen_value() {
        let catalog = choice_catalog();
        let mut harness = Harness::new();
        let mut execution = Execution::new("test", &catalog);

        let outcome = execution.advance(&mut harness.context()).expect("advance");
        let RunOutcome::AwaitingChoice(pending) = outcome else {
            panic!("expected a pending choice, got {outcome:?}");
        };
        assert_eq!(pending.task_id(), "ask");
        assert_eq!(pending.request().prompt, "Help the traveller?");
        assert_eq!(pending.resume_at(), Some("done"));
        assert_eq!(harness.store.get("answer"), None, "store is untouched until the choice resolves");

        let again = execution.advance(&mut harness.context()).expect("advance while pending");
        assert_eq!(again, RunOutcome::AwaitingChoice(pending));

        let outcome = execution.resume(ChoiceOption::B, &mut harness.context()).expect("resume");
        assert_eq!(outcome, RunOutcome::Completed);
        assert!(execution.is_finished());
        assert_eq!(harness.store.get("answer"), Some("ignore"));
        assert_eq!(harness.log.messages(), ["answer=ignore"]);
    }

    #[test]
    fn resume_without_pending_choice_is_rejected() {
        let catalog = choice_catalog();
        let mut harness = Harness::new();
        let mut execution = Execution::new("test", &catalog);

        let error = execution.resume(ChoiceOption::A, &mut harness.context()).expect_err("nothing pending");
        assert!(matches!(error, EngineError::NotAwaitingChoice { .. }));
    }

    #[test]
    fn choice_missing_option_is_fatal() {
        let catalog = TaskCatalog::new(vec![task(
            "ask",
            TaskKind::Choice,
            &[
                (TaskAttribute::Key, "answer"),
                (TaskAttribute::Prompt, "?"),
                (TaskAttribute::OptionAText, "Yes"),
                (TaskAttribute::OptionAValue, "y"),
                (TaskAttribute::OptionBText, "No"),
            ],
        )])
        .expect("catalog");
        let mut harness = Harness::new();

        let error = Execution::new("test", &catalog)
            .advance(&mut harness.context())
            .expect_err("missing optionBValue");
        assert!(error.to_string().contains("optionBValue"), "{error}");
    }
}
