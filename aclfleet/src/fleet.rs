//! Fleet-wide run over every configured device.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use log::{info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::command::Directive;
use crate::config::{FleetConfig, TlsMaterial};
use crate::error::Error;
use crate::session::{
    DeviceReport, DeviceSessionClient, PropertyPolicy, SessionOrchestrator,
};

/// Knobs for a fleet run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Sessions allowed at once. `1` runs devices strictly one after another.
    pub concurrency: usize,

    /// Bound on each session step.
    pub step_timeout: Duration,

    /// What a failed property query does.
    pub property_policy: PropertyPolicy,

    /// Run-level cancellation.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            step_timeout: Duration::from_secs(30),
            property_policy: PropertyPolicy::Strict,
            cancel: CancellationToken::new(),
        }
    }
}

/// Result of a whole fleet run, one report per configured device in list
/// order.
#[derive(Debug, Default, Serialize)]
pub struct FleetOutcome {
    pub devices: Vec<DeviceReport>,
}

impl FleetOutcome {
    /// Whether every attempted device succeeded. An empty fleet succeeds.
    pub fn is_success(&self) -> bool {
        self.devices.iter().all(DeviceReport::is_success)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.devices.iter().filter(|d| d.is_success()).count()
    }

    /// Reports of devices that failed.
    pub fn failures(&self) -> impl Iterator<Item = &DeviceReport> {
        self.devices.iter().filter(|d| !d.is_success())
    }

    /// Whether any device was cut short by run cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.devices.iter().any(|d| {
            d.result
                .error()
                .is_some_and(|e| matches!(e.cause(), Error::Cancelled))
        })
    }

    /// First report for `address`.
    pub fn get(&self, address: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.address == address)
    }
}

/// Applies one directive to every device of a fleet.
///
/// A device failure is recorded in its report and never stops the
/// remaining devices from being attempted.
pub struct FleetRunner<'a, C> {
    client: &'a C,
    tls: &'a TlsMaterial,
    options: RunOptions,
}

impl<'a, C: DeviceSessionClient> FleetRunner<'a, C> {
    pub fn new(client: &'a C, tls: &'a TlsMaterial, options: RunOptions) -> Self {
        Self {
            client,
            tls,
            options,
        }
    }

    /// Run the directive against every device in `config`.
    pub async fn run(&self, config: &FleetConfig, directive: &Directive) -> FleetOutcome {
        if config.devices.is_empty() {
            info!("no devices configured, nothing to do");
            return FleetOutcome::default();
        }

        let concurrency = self.options.concurrency.max(1);
        info!(
            "applying '{}' to {} device(s), {} at a time",
            directive,
            config.devices.len(),
            concurrency
        );

        let orchestrator = SessionOrchestrator::new(self.client, config.credentials(), self.tls)
            .property_policy(self.options.property_policy)
            .step_timeout(self.options.step_timeout)
            .cancel_token(self.options.cancel.clone());
        let orchestrator = &orchestrator;

        // `buffered` yields in input order, so the single consumer below
        // collects reports without any locking.
        let devices = stream::iter(config.devices.iter())
            .map(move |address| orchestrator.run(address, directive))
            .buffered(concurrency)
            .inspect(|report| match report.result.error() {
                None => info!("{}: done", report.address),
                Some(e) => warn!("{}: {}: {}", report.address, e.kind(), e.cause()),
            })
            .collect::<Vec<_>>()
            .await;

        FleetOutcome { devices }
    }
}
