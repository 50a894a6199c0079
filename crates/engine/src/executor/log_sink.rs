//! Destinations for interpolated `log` task messages.

use tracing::info;

/// Receives the interpolated message of every executed `log` task.
pub trait LogSink {
    fn emit(&mut self, workflow_id: &str, task_id: &str, message: &str);
}

/// Forwards messages to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&mut self, workflow_id: &str, task_id: &str, message: &str) {
        info!(workflow = %workflow_id, task_id = %task_id, "{message}");
    }
}

/// Collects messages in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogSink {
    messages: Vec<String>,
}

impl RecordingLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}

impl LogSink for RecordingLogSink {
    fn emit(&mut self, _workflow_id: &str, _task_id: &str, message: &str) {
        self.messages.push(message.to_string());
    }
}
