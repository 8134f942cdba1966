//! Error types for aclfleet.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type raised by a device session client.
#[derive(Error, Debug)]
pub enum Error {
    /// Secure transport errors (connection, authentication, host key)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// VTY channel errors (prompt detection, channel lifecycle)
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Device-level errors (rejected commands, unreadable properties)
    #[error("Device error: {0}")]
    Driver(#[from] DriverError),

    /// The run was cancelled before the step completed
    #[error("Run cancelled")]
    Cancelled,
}

/// Transport layer errors (connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Client key or certificate could not be loaded
    #[error("Client key error: {0}")]
    Key(String),

    /// Device key not present in the configured root file
    #[error("Device key for {host}:{port} is not trusted by the configured root file")]
    HostKeyUnknown { host: String, port: u16 },

    /// Device key differs from the one recorded in the root file
    #[error("Device key for {host}:{port} changed (root file line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Root file could not be read
    #[error("Root file error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// VTY channel errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Prompt not seen before the deadline
    #[error("Prompt not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed by the device
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Exec request exited unsuccessfully
    #[error("'{command}' exited with status {status}")]
    ExecFailed { command: String, status: u32 },
}

/// Device-level errors.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The device answered with an error marker
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    /// The device property record could not be interpreted
    #[error("Property unavailable: {message}")]
    PropertyUnavailable { message: String },
}

/// Batch configuration file errors. Fatal to the whole run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("{}: {source}", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file exists but could not be read
    #[error("{}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure of one device's session, tagged with the step that failed.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("connection failed: {0}")]
    Connection(#[source] Error),

    #[error("property query failed: {0}")]
    Query(#[source] Error),

    #[error("channel open failed: {0}")]
    Channel(#[source] Error),

    #[error("command failed: {0}")]
    Command(#[source] Error),

    #[error("save failed, change may be live but unsaved: {0}")]
    Persist(#[source] Error),
}

impl DeviceError {
    /// The step that failed.
    pub fn kind(&self) -> FailureKind {
        match self {
            DeviceError::Connection(_) => FailureKind::Connection,
            DeviceError::Query(_) => FailureKind::Query,
            DeviceError::Channel(_) => FailureKind::Channel,
            DeviceError::Command(_) => FailureKind::Command,
            DeviceError::Persist(_) => FailureKind::Persist,
        }
    }

    /// The underlying client error.
    pub fn cause(&self) -> &Error {
        match self {
            DeviceError::Connection(e)
            | DeviceError::Query(e)
            | DeviceError::Channel(e)
            | DeviceError::Command(e)
            | DeviceError::Persist(e) => e,
        }
    }

    /// Whether the access-list edit may already be applied on the device.
    pub fn change_may_be_live(&self) -> bool {
        matches!(self, DeviceError::Persist(_))
    }
}

/// Session step a [`DeviceError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Connection,
    Query,
    Channel,
    Command,
    Persist,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Connection => "connection",
            FailureKind::Query => "query",
            FailureKind::Channel => "channel",
            FailureKind::Command => "command",
            FailureKind::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Result type alias using aclfleet's Error.
pub type Result<T> = std::result::Result<T, Error>;
