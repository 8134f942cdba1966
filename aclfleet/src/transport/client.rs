//! [`DeviceSessionClient`] backed by SSH sessions and VTY channels.

use std::time::Duration;

use log::debug;

use super::config::SessionConfig;
use super::ssh::SshTransport;
use crate::channel::{VtyChannel, VtyProfile};
use crate::config::{Credentials, TlsMaterial};
use crate::error::Result;
use crate::session::{DeviceProperty, DeviceSessionClient, MANAGEMENT_PORT, Response};

/// Talks to devices over encrypted SSH management sessions.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use aclfleet::transport::SshSessionClient;
///
/// let client = SshSessionClient::default()
///     .port(2222)
///     .timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct SshSessionClient {
    port: u16,
    timeout: Duration,
    profile: VtyProfile,
}

impl Default for SshSessionClient {
    fn default() -> Self {
        Self {
            port: MANAGEMENT_PORT,
            timeout: Duration::from_secs(30),
            profile: VtyProfile::default(),
        }
    }
}

impl SshSessionClient {
    /// Set the management port (default: 15002).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection and prompt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the command line conventions of the devices.
    pub fn profile(mut self, profile: VtyProfile) -> Self {
        self.profile = profile;
        self
    }
}

impl DeviceSessionClient for SshSessionClient {
    type Session = SshTransport;
    type Channel = VtyChannel;

    async fn connect(
        &self,
        address: &str,
        credentials: Credentials<'_>,
        tls: &TlsMaterial,
    ) -> Result<SshTransport> {
        let config = SessionConfig::for_device(address, self.port, credentials, tls, self.timeout);
        SshTransport::connect(config).await
    }

    async fn fetch_property(&self, session: &mut SshTransport) -> Result<DeviceProperty> {
        let output = session.exec(&self.profile.property_command).await?;
        self.profile.parse_property(&output)
    }

    async fn open_channel(&self, session: &mut SshTransport) -> Result<VtyChannel> {
        let channel = session
            .open_vty(self.profile.terminal_width, self.profile.terminal_height)
            .await?;
        VtyChannel::open(channel, self.profile.clone(), self.timeout).await
    }

    async fn send(&self, channel: &mut VtyChannel, command: &str) -> Result<Response> {
        let response = channel.send(command).await?;
        debug!("response in {:?}: {:?}", response.elapsed, response.output);
        Ok(response)
    }

    async fn close_channel(&self, channel: VtyChannel) -> Result<()> {
        channel.close().await
    }

    async fn disconnect(&self, session: SshTransport) -> Result<()> {
        session.close().await
    }
}
