//! Per-device session lifecycle.
//!
//! A [`DeviceSessionClient`] is the boundary to whatever speaks the device
//! management protocol. The [`SessionOrchestrator`] drives one device through
//! connect, property query, channel open, command, save and teardown on top
//! of it, releasing everything it acquired before it returns.

mod orchestrator;
mod report;
pub(crate) mod response;
mod state;

pub use orchestrator::{PropertyPolicy, SessionOrchestrator};
pub use report::{DeviceReport, DeviceResult};
pub use response::Response;
pub use state::{DeviceSession, SessionState};

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;

use crate::config::{Credentials, TlsMaterial};
use crate::error::Result;

/// Well-known management port every device listens on.
pub const MANAGEMENT_PORT: u16 = 15002;

/// Identity record reported by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperty {
    /// The device's configured system name.
    pub sys_name: String,
}

/// Operations a device management client provides.
///
/// `Session` is an authenticated connection to one device and `Channel` a
/// command stream opened inside it. Both are handed back by value to
/// [`close_channel`](Self::close_channel) and
/// [`disconnect`](Self::disconnect), so a released resource cannot be used
/// again.
pub trait DeviceSessionClient: Send + Sync {
    /// Authenticated connection to one device.
    type Session: Send;

    /// Command/response stream inside a session.
    type Channel: Send;

    /// Connect and authenticate to `address`.
    fn connect(
        &self,
        address: &str,
        credentials: Credentials<'_>,
        tls: &TlsMaterial,
    ) -> impl Future<Output = Result<Self::Session>> + Send;

    /// Query the device's identity record.
    fn fetch_property(
        &self,
        session: &mut Self::Session,
    ) -> impl Future<Output = Result<DeviceProperty>> + Send;

    /// Open a command channel.
    fn open_channel(
        &self,
        session: &mut Self::Session,
    ) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// Write command text and collect the device's answer.
    fn send(
        &self,
        channel: &mut Self::Channel,
        command: &str,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Release a channel.
    fn close_channel(&self, channel: Self::Channel) -> impl Future<Output = Result<()>> + Send;

    /// Release a session.
    fn disconnect(&self, session: Self::Session) -> impl Future<Output = Result<()>> + Send;
}
