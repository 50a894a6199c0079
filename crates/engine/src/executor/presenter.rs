//! Choice presentation contract.
//!
//! A presenter owns *how* a two-way choice is obtained (console, widget,
//! network). It returns which option was chosen; writing the chosen value into
//! the variable store is always the engine's job.

use std::{collections::VecDeque, fmt, io, str::FromStr};

use thiserror::Error;

/// One of the two options of a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceOption {
    A,
    B,
}

impl fmt::Display for ChoiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceOption::A => f.write_str("A"),
            ChoiceOption::B => f.write_str("B"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid choice '{0}' (expected 1, 2, a, or b)")]
pub struct InvalidChoiceOption(pub String);

impl FromStr for ChoiceOption {
    type Err = InvalidChoiceOption;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "1" | "a" | "A" => Ok(ChoiceOption::A),
            "2" | "b" | "B" => Ok(ChoiceOption::B),
            other => Err(InvalidChoiceOption(other.to_string())),
        }
    }
}

/// Display text and stored value of one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceEntry {
    /// Interpolated text shown to the user.
    pub text: String,
    /// Value written to the store when this option is chosen.
    pub value: String,
}

/// Everything a presenter needs to render a choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequest {
    /// Interpolated prompt.
    pub prompt: String,
    pub option_a: ChoiceEntry,
    pub option_b: ChoiceEntry,
}

impl ChoiceRequest {
    pub fn entry(&self, option: ChoiceOption) -> &ChoiceEntry {
        match option {
            ChoiceOption::A => &self.option_a,
            ChoiceOption::B => &self.option_b,
        }
    }

    /// Value stored for `option`.
    pub fn value_of(&self, option: ChoiceOption) -> &str {
        &self.entry(option).value
    }
}

/// Error surfaced when a presenter cannot obtain a selection.
#[derive(Debug, Error)]
pub enum PresenterError {
    #[error("presenter I/O error: {0}")]
    Io(#[from] io::Error),

    /// Input ended before a valid selection was made.
    #[error("input closed before a choice was made for '{prompt}'")]
    InputClosed { prompt: String },

    /// A scripted presenter ran out of answers.
    #[error("no scripted answer left for '{prompt}'")]
    Exhausted { prompt: String },
}

/// Interactive surface used by the synchronous runner.
pub trait ChoicePresenter {
    /// Presents both options and returns the chosen one. Blocks until a
    /// selection is available.
    fn present(&mut self, request: &ChoiceRequest) -> Result<ChoiceOption, PresenterError>;
}

impl<F> ChoicePresenter for F
where
    F: FnMut(&ChoiceRequest) -> Result<ChoiceOption, PresenterError>,
{
    fn present(&mut self, request: &ChoiceRequest) -> Result<ChoiceOption, PresenterError> {
        self(request)
    }
}

/// Presenter that answers from a predefined queue and records every request.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPresenter {
    answers: VecDeque<ChoiceOption>,
    presented: Vec<ChoiceRequest>,
}

impl ScriptedPresenter {
    pub fn new(answers: impl IntoIterator<Item = ChoiceOption>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            presented: Vec::new(),
        }
    }

    /// Requests seen so far, in presentation order.
    pub fn presented(&self) -> &[ChoiceRequest] {
        &self.presented
    }
}

impl ChoicePresenter for ScriptedPresenter {
    fn present(&mut self, request: &ChoiceRequest) -> Result<ChoiceOption, PresenterError> {
        self.presented.push(request.clone());
        self.answers.pop_front().ok_or_else(|| PresenterError::Exhausted {
            prompt: request.prompt.clone(),
        })
    }
}
