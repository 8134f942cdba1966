//! Drives one device through its session lifecycle.

use std::future::Future;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::report::DeviceReport;
use super::state::{DeviceSession, SessionState};
use super::DeviceSessionClient;
use crate::command::{CommandBuilder, Directive, SAVE_COMMAND};
use crate::config::{Credentials, TlsMaterial};
use crate::error::{DeviceError, Error, Result, TransportError};

/// What a failed property query does to the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropertyPolicy {
    /// Fail the device with a query error.
    #[default]
    Strict,
    /// Log a warning and carry on to the channel.
    Relaxed,
}

/// Runs the lifecycle state machine for one device at a time.
///
/// Resources are acquired into local slots and released in reverse order
/// (channel, then session) on every exit path. A release failure is
/// recorded on the report and never changes its result.
///
/// # Example
///
/// ```rust,no_run
/// use aclfleet::{AccessAction, Directive, FleetConfig, SessionOrchestrator, TlsMaterial};
/// use aclfleet::transport::SshSessionClient;
///
/// # async fn example(config: &FleetConfig) {
/// let client = SshSessionClient::default();
/// let tls = TlsMaterial::from_config(config);
/// let orchestrator = SessionOrchestrator::new(&client, config.credentials(), &tls);
///
/// let directive = Directive::new("10.0.0.0 0.255.255.255", AccessAction::Permit);
/// let report = orchestrator.run("192.0.2.10", &directive).await;
/// println!("{}: {}", report.address, report.is_success());
/// # }
/// ```
pub struct SessionOrchestrator<'a, C> {
    client: &'a C,
    credentials: Credentials<'a>,
    tls: &'a TlsMaterial,
    property_policy: PropertyPolicy,
    step_timeout: Duration,
    cancel: CancellationToken,
}

impl<'a, C: DeviceSessionClient> SessionOrchestrator<'a, C> {
    /// Create an orchestrator with the strict property policy and a 30s
    /// step timeout.
    pub fn new(client: &'a C, credentials: Credentials<'a>, tls: &'a TlsMaterial) -> Self {
        Self {
            client,
            credentials,
            tls,
            property_policy: PropertyPolicy::default(),
            step_timeout: Duration::from_secs(30),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the property query policy.
    pub fn property_policy(mut self, policy: PropertyPolicy) -> Self {
        self.property_policy = policy;
        self
    }

    /// Bound every step, teardown included, by `timeout`.
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Abort in-flight steps when `cancel` fires.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply `directive` to the device at `address`.
    ///
    /// Always returns with the session in [`SessionState::Closed`].
    pub async fn run(&self, address: &str, directive: &Directive) -> DeviceReport {
        let start = Instant::now();
        let mut device = DeviceSession::new(address);
        let mut session = None;
        let mut channel = None;

        info!("{}: issuing '{}'", address, directive);

        if let Err(e) = self
            .drive(&mut device, directive, &mut session, &mut channel)
            .await
        {
            warn!("{}: {}", address, e);
            device.fail(e);
        }

        self.release(&mut device, session, channel).await;
        device.advance(SessionState::Closed);

        DeviceReport::from_session(device, start.elapsed())
    }

    async fn drive(
        &self,
        device: &mut DeviceSession,
        directive: &Directive,
        session_slot: &mut Option<C::Session>,
        channel_slot: &mut Option<C::Channel>,
    ) -> std::result::Result<(), DeviceError> {
        let address = device.address().to_string();

        let session = self
            .step(self.client.connect(&address, self.credentials, self.tls))
            .await
            .map_err(DeviceError::Connection)?;
        let session = session_slot.insert(session);
        device.advance(SessionState::Connected);

        match self.step(self.client.fetch_property(session)).await {
            Ok(property) => {
                info!("{}: connected to {}", address, property.sys_name);
                device.set_property(property);
                device.advance(SessionState::PropertyFetched);
            }
            Err(e) => match self.property_policy {
                PropertyPolicy::Strict => return Err(DeviceError::Query(e)),
                PropertyPolicy::Relaxed => {
                    warn!("{}: property query failed, continuing: {}", address, e);
                }
            },
        }

        let channel = self
            .step(self.client.open_channel(session))
            .await
            .map_err(DeviceError::Channel)?;
        let channel = channel_slot.insert(channel);
        device.advance(SessionState::ChannelOpen);

        let command = CommandBuilder::build(directive);
        debug!("{}: writing {:?}", address, command);
        let response = self
            .step(self.client.send(channel, &command))
            .await
            .map_err(DeviceError::Command)?;
        device.set_response(response.output.clone());
        response.into_result().map_err(DeviceError::Command)?;
        device.advance(SessionState::CommandsIssued);

        info!("{}: saving configuration", address);
        let saved = self
            .step(self.client.send(channel, SAVE_COMMAND))
            .await
            .map_err(DeviceError::Persist)?;
        debug!("{}: save answered {:?}", address, saved.output);
        saved.into_result().map_err(DeviceError::Persist)?;
        device.advance(SessionState::Saved);

        Ok(())
    }

    /// Close the channel, then the session. Each is released once.
    async fn release(
        &self,
        device: &mut DeviceSession,
        session: Option<C::Session>,
        channel: Option<C::Channel>,
    ) {
        if let Some(channel) = channel {
            let result = self.bounded(self.client.close_channel(channel)).await;
            self.note_cleanup(device, "close channel", result);
        }
        if let Some(session) = session {
            let result = self.bounded(self.client.disconnect(session)).await;
            self.note_cleanup(device, "disconnect", result);
        }
    }

    fn note_cleanup(&self, device: &mut DeviceSession, what: &str, result: Result<()>) {
        match result {
            Ok(()) => debug!("{}: {} done", device.address(), what),
            Err(e) => {
                warn!("{}: {} failed: {}", device.address(), what, e);
                device.record_cleanup_failure(format!("{what}: {e}"));
            }
        }
    }

    /// Run a state-machine step, bounded by the step timeout and aborted on
    /// cancellation.
    async fn step<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = self.bounded(fut) => result,
        }
    }

    /// Run `fut` under the step timeout only. Teardown uses this so a
    /// cancelled run still releases what it holds.
    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.step_timeout).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AccessAction;
    use crate::config::FleetConfig;
    use crate::error::FailureKind;
    use crate::session::mock::{FailAt, MockClient};
    use SessionState::*;

    fn fleet() -> FleetConfig {
        FleetConfig::parse("routers=10.0.0.1\nusername=admin\npassword=secret\n")
    }

    fn permit() -> Directive {
        Directive::new("10.0.0.0/8", AccessAction::Permit)
    }

    #[tokio::test]
    async fn test_happy_path() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new();
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .run("10.0.0.1", &permit())
            .await;

        assert!(report.is_success());
        assert_eq!(
            report.history,
            vec![
                Idle,
                Connected,
                PropertyFetched,
                ChannelOpen,
                CommandsIssued,
                Saved,
                Closed
            ]
        );
        assert_eq!(report.hostname.as_deref(), Some("rtr-10.0.0.1"));
        assert!(report.cleanup_errors.is_empty());

        let sent = client.sent("10.0.0.1");
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("permit 10.0.0.0/8"));
        assert_eq!(sent[1], SAVE_COMMAND);

        assert_eq!(client.channels_closed(), 1);
        assert_eq!(client.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_for_every_failure_point() {
        let cases = [
            (FailAt::Connect, FailureKind::Connection, 0, 0),
            (FailAt::Property, FailureKind::Query, 0, 1),
            (FailAt::OpenChannel, FailureKind::Channel, 0, 1),
            (FailAt::Command, FailureKind::Command, 1, 1),
            (FailAt::Save, FailureKind::Persist, 1, 1),
        ];

        for (fail_at, kind, channels_closed, disconnects) in cases {
            let config = fleet();
            let tls = TlsMaterial::default();
            let client = MockClient::new().fail("10.0.0.1", fail_at);
            let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
                .run("10.0.0.1", &permit())
                .await;

            let error = report.result.error().expect("session should fail");
            assert_eq!(error.kind(), kind, "{:?}", fail_at);

            let closes = report.history.iter().filter(|s| **s == Closed).count();
            assert_eq!(closes, 1, "{:?}", fail_at);
            assert_eq!(report.history.last(), Some(&Closed));
            assert_eq!(report.history[report.history.len() - 2], Failed);

            assert_eq!(client.channels_opened(), channels_closed, "{:?}", fail_at);
            assert_eq!(client.channels_closed(), channels_closed, "{:?}", fail_at);
            assert_eq!(client.disconnects(), disconnects, "{:?}", fail_at);
        }
    }

    #[tokio::test]
    async fn test_save_failure_is_distinct() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().fail("10.0.0.1", FailAt::Save);
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .run("10.0.0.1", &permit())
            .await;

        let error = report.result.error().unwrap();
        assert!(error.change_may_be_live());
        assert!(report.history.contains(&CommandsIssued));
        assert!(!report.history.contains(&Saved));
    }

    #[tokio::test]
    async fn test_relaxed_property_policy_continues() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().fail("10.0.0.1", FailAt::Property);
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .property_policy(PropertyPolicy::Relaxed)
            .run("10.0.0.1", &permit())
            .await;

        assert!(report.is_success());
        assert!(report.hostname.is_none());
        assert!(!report.history.contains(&PropertyFetched));
        assert_eq!(client.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_device_error_marker_is_command_error() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().reject_commands("10.0.0.1");
        let directive = Directive::new("10.9.9.9", AccessAction::Remove);
        let orchestrator = SessionOrchestrator::new(&client, config.credentials(), &tls);

        // Removing the same rule twice must fail cleanly both times.
        for _ in 0..2 {
            let report = orchestrator.run("10.0.0.1", &directive).await;
            let error = report.result.error().unwrap();
            assert_eq!(error.kind(), FailureKind::Command);
            assert!(report.response.as_deref().unwrap().contains("% Invalid input"));
            assert_eq!(report.history.last(), Some(&Closed));
        }
        assert_eq!(client.channels_closed(), 2);
        assert_eq!(client.disconnects(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_override_success() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().fail("10.0.0.1", FailAt::Disconnect);
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .run("10.0.0.1", &permit())
            .await;

        assert!(report.is_success());
        assert_eq!(report.cleanup_errors.len(), 1);
        assert!(report.cleanup_errors[0].starts_with("disconnect"));
    }

    #[tokio::test]
    async fn test_cleanup_failure_does_not_override_failure() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new()
            .fail("10.0.0.1", FailAt::Command)
            .fail("10.0.0.1", FailAt::CloseChannel);
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .run("10.0.0.1", &permit())
            .await;

        assert_eq!(report.result.error().unwrap().kind(), FailureKind::Command);
        assert_eq!(report.cleanup_errors.len(), 1);
        // session is still released after the channel close failed
        assert_eq!(client.disconnects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout_proceeds_to_cleanup() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().hang("10.0.0.1", FailAt::OpenChannel);
        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .step_timeout(Duration::from_secs(5))
            .run("10.0.0.1", &permit())
            .await;

        let error = report.result.error().unwrap();
        assert_eq!(error.kind(), FailureKind::Channel);
        assert!(matches!(
            error.cause(),
            Error::Transport(TransportError::Timeout(_))
        ));
        assert_eq!(client.disconnects(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start_touches_nothing() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new();
        let token = CancellationToken::new();
        token.cancel();

        let report = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .cancel_token(token)
            .run("10.0.0.1", &permit())
            .await;

        let error = report.result.error().unwrap();
        assert_eq!(error.kind(), FailureKind::Connection);
        assert!(matches!(error.cause(), Error::Cancelled));
        assert_eq!(client.connects(), 0);
        assert_eq!(report.history, vec![Idle, Failed, Closed]);
    }

    #[tokio::test]
    async fn test_cancel_mid_session_releases_resources() {
        let config = fleet();
        let tls = TlsMaterial::default();
        let client = MockClient::new().hang("10.0.0.1", FailAt::Command);
        let token = CancellationToken::new();
        let handle = token.clone();

        let orchestrator = SessionOrchestrator::new(&client, config.credentials(), &tls)
            .step_timeout(Duration::from_secs(3600))
            .cancel_token(token);
        let directive = permit();
        let run = orchestrator.run("10.0.0.1", &directive);
        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (report, ()) = tokio::join!(run, cancel);

        let error = report.result.error().unwrap();
        assert_eq!(error.kind(), FailureKind::Command);
        assert!(matches!(error.cause(), Error::Cancelled));
        assert_eq!(client.channels_closed(), 1);
        assert_eq!(client.disconnects(), 1);
    }
}
