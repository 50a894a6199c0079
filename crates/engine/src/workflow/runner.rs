//! Synchronous workflow runner.
//!
//! Drives an [`Execution`] in the caller's thread. Every suspension on a
//! `choice` is handed to the presenter and resumed with its answer before the
//! call returns, so the presenter's return value doubles as the completion
//! callback.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::EngineError,
    executor::{ChoicePresenter, EffectDispatcher, Execution, LogSink, RunContext, RunOutcome},
    store::VariableStore,
    workflow::Workflow,
};

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub workflow_id: String,
    /// Ids of the most recently dispatched tasks in execution order, bounded
    /// by [`crate::executor::VISITED_HISTORY_LIMIT`].
    pub visited: Vec<String>,
    /// Total number of dispatched tasks.
    pub steps: usize,
    /// Number of choices resolved during the run.
    pub choices: usize,
}

/// Drives `execution` until it completes, presenting every pending choice.
pub fn drive_execution(
    mut execution: Execution<'_>,
    presenter: &mut dyn ChoicePresenter,
    store: &mut VariableStore,
    effects: &mut dyn EffectDispatcher,
    log: &mut dyn LogSink,
) -> Result<RunReport, EngineError> {
    let workflow_id = execution.workflow_id().to_string();
    info!(workflow = %workflow_id, "workflow run started");

    let mut context = RunContext { store, effects, log };
    let choices = match resolve_choices(&mut execution, presenter, &mut context) {
        Ok(choices) => choices,
        Err(error) => {
            warn!(workflow = %workflow_id, task_id = ?execution.cursor(), error = %error, "workflow run aborted");
            return Err(error);
        }
    };

    let steps = execution.steps();
    let visited = execution.into_visited();
    info!(workflow = %workflow_id, steps, choices, "workflow run finished");
    Ok(RunReport {
        workflow_id,
        visited,
        steps,
        choices,
    })
}

fn resolve_choices(
    execution: &mut Execution<'_>,
    presenter: &mut dyn ChoicePresenter,
    context: &mut RunContext<'_>,
) -> Result<usize, EngineError> {
    let mut choices = 0;
    let mut outcome = execution.advance(context)?;
    while let RunOutcome::AwaitingChoice(pending) = outcome {
        debug!(workflow = %execution.workflow_id(), task_id = %pending.task_id(), "presenting choice");
        let option = presenter
            .present(pending.request())
            .map_err(|source| EngineError::Presenter {
                task_id: pending.task_id().to_string(),
                source,
            })?;
        choices += 1;
        outcome = execution.resume(option, context)?;
    }
    Ok(choices)
}

/// Runs `workflows` one after another over a single shared store.
///
/// Values written by earlier workflows are visible to later ones. The first
/// failure stops the sequence; the store keeps whatever was written so far.
pub fn run_in_sequence<'w>(
    workflows: impl IntoIterator<Item = &'w Workflow>,
    store: &mut VariableStore,
    presenter: &mut dyn ChoicePresenter,
    effects: &mut dyn EffectDispatcher,
    log: &mut dyn LogSink,
) -> Result<Vec<RunReport>, EngineError> {
    workflows
        .into_iter()
        .map(|workflow| workflow.run_with_log(store, presenter, effects, log))
        .collect()
}

#[cfg(test)]
mod tests {
    use taskflow_types::{TaskAttribute, TaskAttributes, TaskDeclaration, TaskKind};

    use super::*;
    use crate::executor::{ChoiceOption, DemoGameEffects, NoEffects, PresenterError, RecordingLogSink, ScriptedPresenter};

    fn choice_workflow() -> Workflow {
        Workflow::from_declarations(
            "quest",
            vec![
                TaskDeclaration::new(
                    "ask",
                    TaskKind::Choice,
                    TaskAttributes::new()
                        .with(TaskAttribute::Key, "route")
                        .with(TaskAttribute::Prompt, "Which way?")
                        .with(TaskAttribute::OptionAText, "Left")
                        .with(TaskAttribute::OptionAValue, "left")
                        .with(TaskAttribute::OptionBText, "Right")
                        .with(TaskAttribute::OptionBValue, "right"),
                ),
                TaskDeclaration::new(
                    "say",
                    TaskKind::Log,
                    TaskAttributes::new().with(TaskAttribute::Message, "went ${route}"),
                ),
            ],
        )
        .expect("workflow")
    }

    #[test]
    fn presenter_answer_is_written_before_the_next_task() {
        let workflow = choice_workflow();
        let mut store = VariableStore::new();
        let mut presenter = ScriptedPresenter::new([ChoiceOption::A]);
        let mut log = RecordingLogSink::new();

        let report = workflow
            .run_with_log(&mut store, &mut presenter, &mut NoEffects, &mut log)
            .expect("run");

        assert_eq!(report.visited, ["ask", "say"]);
        assert_eq!(report.steps, 2);
        assert_eq!(report.choices, 1);
        assert_eq!(store.get("route"), Some("left"));
        assert_eq!(log.messages(), ["went left"]);
        assert_eq!(presenter.presented()[0].option_b.text, "Right");
    }

    #[test]
    fn presenter_failure_aborts_the_run() {
        let workflow = choice_workflow();
        let mut store = VariableStore::new();
        let mut presenter = |request: &crate::executor::ChoiceRequest| {
            Err::<ChoiceOption, _>(PresenterError::InputClosed {
                prompt: request.prompt.clone(),
            })
        };

        let error = workflow
            .run(&mut store, &mut presenter, &mut DemoGameEffects)
            .expect_err("presenter failed");
        assert!(matches!(error, EngineError::Presenter { ref task_id, .. } if task_id == "ask"), "{error}");
        assert!(store.is_empty());
    }

    #[test]
    fn sequence_shares_the_store_between_workflows() {
        let first = Workflow::from_declarations(
            "first",
            vec![TaskDeclaration::new(
                "set",
                TaskKind::SetVar,
                TaskAttributes::new().with(TaskAttribute::Key, "gold").with(TaskAttribute::Value, "3"),
            )],
        )
        .expect("first");
        let second = Workflow::from_declarations(
            "second",
            vec![TaskDeclaration::new(
                "show",
                TaskKind::Log,
                TaskAttributes::new().with(TaskAttribute::Message, "gold=${gold}"),
            )],
        )
        .expect("second");

        let mut store = VariableStore::new();
        let mut log = RecordingLogSink::new();
        let reports = run_in_sequence(
            [&first, &second],
            &mut store,
            &mut ScriptedPresenter::default(),
            &mut NoEffects,
            &mut log,
        )
        .expect("sequence");

        assert_eq!(reports.len(), 2);
        assert_eq!(log.messages(), ["gold=3"]);
    }
}
