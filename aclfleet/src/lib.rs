//! # aclfleet
//!
//! Push a `permit` rule change on the standard access list `DENYACCESS` to a
//! fleet of routers.
//!
//! A batch file names the devices and the credentials they share. Each device
//! gets its own management session that connects, reads the device's system
//! name, opens a VTY channel, edits the access list, saves the running
//! configuration and tears everything down again. A failing device is
//! recorded and the run moves on to the next one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use aclfleet::transport::SshSessionClient;
//! use aclfleet::{AccessAction, ConfigLoader, Directive, FleetRunner, RunOptions, TlsMaterial};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::load("fleet.conf")?;
//!     let tls = TlsMaterial::from_config(&config);
//!     let client = SshSessionClient::default();
//!
//!     let directive = Directive::new("10.20.0.0 0.0.255.255", AccessAction::Permit);
//!     let outcome = FleetRunner::new(&client, &tls, RunOptions::default())
//!         .run(&config, &directive)
//!         .await;
//!
//!     for device in outcome.failures() {
//!         eprintln!("{} failed", device.address);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod fleet;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use command::{AccessAction, CommandBuilder, Directive};
pub use config::{ConfigLoader, Credentials, FleetConfig, TlsMaterial};
pub use error::{ConfigError, DeviceError, Error, FailureKind};
pub use fleet::{FleetOutcome, FleetRunner, RunOptions};
pub use session::{
    DeviceReport, DeviceResult, DeviceSessionClient, PropertyPolicy,
    SessionOrchestrator, SessionState,
};
