//! Console surfaces: a line-oriented choice presenter and a stdout log sink.

use std::io::{self, BufRead, Stdout, StdinLock, Write};

use taskflow_engine::{ChoiceOption, ChoicePresenter, ChoiceRequest, LogSink, PresenterError};
use tracing::warn;

const LOG_PREFIX: &str = "[TaskFlow]";

/// Prints the prompt and both options, then reads lines until `1` or `2`.
pub struct ConsolePresenter<R, W> {
    input: R,
    output: W,
}

impl ConsolePresenter<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePresenter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> ChoicePresenter for ConsolePresenter<R, W> {
    fn present(&mut self, request: &ChoiceRequest) -> Result<ChoiceOption, PresenterError> {
        writeln!(self.output, "[Choice] {}", request.prompt)?;
        writeln!(self.output, "1) {}", request.option_a.text)?;
        writeln!(self.output, "2) {}", request.option_b.text)?;

        let mut line = String::new();
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(PresenterError::InputClosed {
                    prompt: request.prompt.clone(),
                });
            }

            match line.trim() {
                "1" => return Ok(ChoiceOption::A),
                "2" => return Ok(ChoiceOption::B),
                _ => writeln!(self.output, "Please enter 1 or 2.")?,
            }
        }
    }
}

/// Writes every `log` task message as `[TaskFlow] message`.
pub struct ConsoleLogSink<W> {
    output: W,
}

impl ConsoleLogSink<Stdout> {
    pub fn stdout() -> Self {
        Self { output: io::stdout() }
    }
}

impl<W: Write> ConsoleLogSink<W> {
    #[cfg(test)]
    fn new(output: W) -> Self {
        Self { output }
    }
}

impl<W: Write> LogSink for ConsoleLogSink<W> {
    fn emit(&mut self, workflow_id: &str, task_id: &str, message: &str) {
        if let Err(error) = writeln!(self.output, "{LOG_PREFIX} {message}") {
            warn!(workflow = %workflow_id, task_id = %task_id, error = %error, "failed to write log message");
        }
    }
}
