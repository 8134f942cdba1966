use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use aclfleet::session::MANAGEMENT_PORT;
use aclfleet::{
    AccessAction, Directive, FleetConfig, FleetOutcome, PropertyPolicy, RunOptions, TlsMaterial,
};

/// Every device succeeded, or there was nothing to do.
pub const EXIT_OK: u8 = 0;
/// The batch file could not be loaded; no device was touched.
pub const EXIT_CONFIG: u8 = 3;
/// At least one device failed.
pub const EXIT_DEVICE_FAILURE: u8 = 4;
/// The run was interrupted.
pub const EXIT_CANCELLED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "aclfleet")]
#[command(version)]
#[command(about = "Add or remove a DENYACCESS permit rule on every router in a batch file")]
#[command(long_about = None)]
pub struct Cli {
    /// Batch configuration file (routers, username, password, certificateFile)
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: PathBuf,

    /// Address or address/mask the permit rule names
    #[arg(short = 'i', long = "ip-mask", value_name = "IP_OR_MASK")]
    pub ip_mask: String,

    /// `a`, `A` or `deny` removes the permit rule; any other value adds it
    #[arg(short = 'a', long = "allow", value_name = "allow|deny")]
    pub allow: String,

    /// Management port
    #[arg(long, default_value_t = MANAGEMENT_PORT)]
    pub port: u16,

    /// Client certificate presented to the devices
    #[arg(long, value_name = "FILE")]
    pub client_cert: Option<PathBuf>,

    /// Client private key; selects key authentication
    #[arg(long, value_name = "FILE")]
    pub client_key: Option<PathBuf>,

    /// Passphrase of the client private key
    #[arg(long, env = "ACLFLEET_KEY_PASSPHRASE", hide_env_values = true)]
    pub key_passphrase: Option<String>,

    /// Devices configured at the same time
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// Seconds allowed for each session step
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: u64,

    /// Carry on when a device's system name cannot be read
    #[arg(long)]
    pub relaxed_property: bool,

    /// Print the fleet outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn directive(&self) -> Directive {
        Directive::new(&self.ip_mask, AccessAction::from_flag(&self.allow))
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn tls_material(&self, config: &FleetConfig) -> TlsMaterial {
        let mut tls = TlsMaterial::from_config(config);
        if let Some(path) = &self.client_cert {
            tls = tls.with_client_cert(path);
        }
        if let Some(path) = &self.client_key {
            tls = tls.with_client_key(path);
        }
        if let Some(passphrase) = &self.key_passphrase {
            tls = tls.with_key_passphrase(passphrase);
        }
        tls
    }

    pub fn run_options(&self, cancel: CancellationToken) -> RunOptions {
        RunOptions {
            concurrency: usize::from(self.concurrency),
            step_timeout: self.step_timeout(),
            property_policy: if self.relaxed_property {
                PropertyPolicy::Relaxed
            } else {
                PropertyPolicy::Strict
            },
            cancel,
        }
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Process exit status for a finished run.
pub fn exit_status(outcome: &FleetOutcome) -> u8 {
    if outcome.was_cancelled() {
        EXIT_CANCELLED
    } else if outcome.is_success() {
        EXIT_OK
    } else {
        EXIT_DEVICE_FAILURE
    }
}

/// One line per device, then a total.
pub fn summary(outcome: &FleetOutcome) -> String {
    let mut lines = Vec::with_capacity(outcome.len() + 1);
    for device in &outcome.devices {
        let name = device
            .hostname
            .as_deref()
            .map(|h| format!(" ({h})"))
            .unwrap_or_default();
        match device.result.error() {
            None => lines.push(format!("OK    {}{}", device.address, name)),
            Some(e) => lines.push(format!(
                "FAIL  {}{}  {}: {}",
                device.address,
                name,
                e.kind(),
                e.cause()
            )),
        }
    }
    lines.push(format!(
        "{} of {} device(s) updated",
        outcome.succeeded(),
        outcome.len()
    ));
    lines.join("\n")
}
