//! What a device answered to text written on a channel.

use std::time::Duration;

use crate::error::{DriverError, Result};

/// Device answer to one `send`.
#[derive(Debug, Clone)]
pub struct Response {
    /// Text that was written.
    pub command: String,

    /// Device output with echoes and intermediate prompts removed.
    pub output: String,

    /// Prompt the device was left at.
    pub prompt: String,

    pub elapsed: Duration,

    /// Error marker the device printed, if any.
    pub rejection: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        output: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            prompt: prompt.into(),
            elapsed,
            rejection: None,
        }
    }

    /// Mark the answer as rejected by the device.
    pub fn rejected(mut self, marker: impl Into<String>) -> Self {
        self.rejection = Some(marker.into());
        self
    }

    /// `Err(DriverError::CommandFailed)` when the device rejected the text.
    pub fn into_result(mut self) -> Result<Self> {
        match self.rejection.take() {
            Some(marker) => Err(DriverError::CommandFailed {
                message: format!("{} (answering {:?})", marker, self.command),
            }
            .into()),
            None => Ok(self),
        }
    }
}
