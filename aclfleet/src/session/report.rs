//! Per-device outcome of a session.

use std::time::Duration;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::state::{DeviceSession, SessionState};
use crate::error::DeviceError;

/// Outcome of one device's session.
#[derive(Debug)]
pub enum DeviceResult {
    Success,
    Failure(DeviceError),
}

impl DeviceResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DeviceResult::Success)
    }

    /// The failure, if the session failed.
    pub fn error(&self) -> Option<&DeviceError> {
        match self {
            DeviceResult::Success => None,
            DeviceResult::Failure(e) => Some(e),
        }
    }
}

impl Serialize for DeviceResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeviceResult::Success => {
                let mut s = serializer.serialize_struct("DeviceResult", 1)?;
                s.serialize_field("status", "success")?;
                s.end()
            }
            DeviceResult::Failure(e) => {
                let mut s = serializer.serialize_struct("DeviceResult", 4)?;
                s.serialize_field("status", "failure")?;
                s.serialize_field("kind", &e.kind())?;
                s.serialize_field("message", &e.cause().to_string())?;
                s.serialize_field("change_may_be_live", &e.change_may_be_live())?;
                s.end()
            }
        }
    }
}

/// Everything recorded about one device once its session has closed.
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    /// Device address as listed in the batch file.
    pub address: String,

    /// Success, or the failure with the step it happened in.
    pub result: DeviceResult,

    /// System name reported by the device.
    pub hostname: Option<String>,

    /// Output of the access-list command.
    pub response: Option<String>,

    /// Teardown failures. Informational only.
    pub cleanup_errors: Vec<String>,

    /// States visited, `Idle` first and `Closed` last.
    pub history: Vec<SessionState>,

    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl DeviceReport {
    /// Build the report from a closed session.
    pub fn from_session(session: DeviceSession, elapsed: Duration) -> Self {
        let result = match session.last_error {
            Some(e) => DeviceResult::Failure(e),
            None => DeviceResult::Success,
        };
        Self {
            address: session.address,
            result,
            hostname: session.property.map(|p| p.sys_name),
            response: session.last_response,
            cleanup_errors: session.cleanup_errors,
            history: session.history,
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

fn as_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
