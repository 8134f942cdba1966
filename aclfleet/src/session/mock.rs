//! Scripted in-memory client for exercising the orchestrator.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::{DeviceProperty, DeviceSessionClient, Response};
use crate::config::{Credentials, TlsMaterial};
use crate::error::{ChannelError, DriverError, Result, TransportError};

/// Operation a scripted failure or hang is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailAt {
    Connect,
    Property,
    OpenChannel,
    Command,
    Save,
    CloseChannel,
    Disconnect,
}

#[derive(Debug, Default)]
struct Counters {
    connects: usize,
    channels_opened: usize,
    channels_closed: usize,
    disconnects: usize,
    sent: HashMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
pub struct MockClient {
    failures: HashSet<(String, FailAt)>,
    hangs: HashSet<(String, FailAt)>,
    rejecting: HashSet<String>,
    delay: Option<Duration>,
    counters: Mutex<Counters>,
    in_flight: Mutex<(usize, usize)>,
}

pub struct MockSession {
    address: String,
}

pub struct MockChannel {
    address: String,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `at` fail for `address`.
    pub fn fail(mut self, address: &str, at: FailAt) -> Self {
        self.failures.insert((address.to_string(), at));
        self
    }

    /// Make `at` never complete for `address`.
    pub fn hang(mut self, address: &str, at: FailAt) -> Self {
        self.hangs.insert((address.to_string(), at));
        self
    }

    /// Answer every access-list command on `address` with a device error.
    pub fn reject_commands(mut self, address: &str) -> Self {
        self.rejecting.insert(address.to_string());
        self
    }

    /// Delay every connect, to observe overlapping sessions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn connects(&self) -> usize {
        self.counters.lock().unwrap().connects
    }

    pub fn channels_opened(&self) -> usize {
        self.counters.lock().unwrap().channels_opened
    }

    pub fn channels_closed(&self) -> usize {
        self.counters.lock().unwrap().channels_closed
    }

    pub fn disconnects(&self) -> usize {
        self.counters.lock().unwrap().disconnects
    }

    /// Highest number of sessions connected at the same time.
    pub fn peak_sessions(&self) -> usize {
        self.in_flight.lock().unwrap().1
    }

    /// Command text written to `address`, in order.
    pub fn sent(&self, address: &str) -> Vec<String> {
        self.counters
            .lock()
            .unwrap()
            .sent
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    async fn script(&self, address: &str, at: FailAt) -> Result<()> {
        let key = (address.to_string(), at);
        if self.hangs.contains(&key) {
            std::future::pending::<()>().await;
        }
        if self.failures.contains(&key) {
            return Err(match at {
                FailAt::Connect => TransportError::AuthenticationFailed {
                    user: "admin".to_string(),
                }
                .into(),
                FailAt::Property => DriverError::PropertyUnavailable {
                    message: "no sys name".to_string(),
                }
                .into(),
                _ => ChannelError::Closed.into(),
            });
        }
        Ok(())
    }
}

impl DeviceSessionClient for MockClient {
    type Session = MockSession;
    type Channel = MockChannel;

    async fn connect(
        &self,
        address: &str,
        _credentials: Credentials<'_>,
        _tls: &TlsMaterial,
    ) -> Result<MockSession> {
        self.counters.lock().unwrap().connects += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script(address, FailAt::Connect).await?;
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            in_flight.0 += 1;
            in_flight.1 = in_flight.1.max(in_flight.0);
        }
        Ok(MockSession {
            address: address.to_string(),
        })
    }

    async fn fetch_property(&self, session: &mut MockSession) -> Result<DeviceProperty> {
        self.script(&session.address, FailAt::Property).await?;
        Ok(DeviceProperty {
            sys_name: format!("rtr-{}", session.address),
        })
    }

    async fn open_channel(&self, session: &mut MockSession) -> Result<MockChannel> {
        self.script(&session.address, FailAt::OpenChannel).await?;
        self.counters.lock().unwrap().channels_opened += 1;
        Ok(MockChannel {
            address: session.address.clone(),
        })
    }

    async fn send(&self, channel: &mut MockChannel, command: &str) -> Result<Response> {
        self.counters
            .lock()
            .unwrap()
            .sent
            .entry(channel.address.clone())
            .or_default()
            .push(command.to_string());

        let at = if command == crate::command::SAVE_COMMAND {
            FailAt::Save
        } else {
            FailAt::Command
        };
        self.script(&channel.address, at).await?;

        if at == FailAt::Command && self.rejecting.contains(&channel.address) {
            return Ok(Response::new(
                command,
                "% Invalid input detected at '^' marker.",
                "router(config-std-nacl)#",
                Duration::ZERO,
            )
            .rejected("% Invalid input"));
        }
        Ok(Response::new(command, "", "router#", Duration::ZERO))
    }

    async fn close_channel(&self, channel: MockChannel) -> Result<()> {
        self.counters.lock().unwrap().channels_closed += 1;
        self.script(&channel.address, FailAt::CloseChannel).await
    }

    async fn disconnect(&self, session: MockSession) -> Result<()> {
        self.counters.lock().unwrap().disconnects += 1;
        self.in_flight.lock().unwrap().0 -= 1;
        self.script(&session.address, FailAt::Disconnect).await
    }
}
