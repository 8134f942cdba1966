//! Secure transport layer wrapping russh.
//!
//! Provides the session client the binary runs fleets with: connection
//! setup, device key verification, authentication, and the exec and VTY
//! channels used by the session lifecycle.

mod client;
pub mod config;
mod ssh;

pub use client::SshSessionClient;
pub use config::{AuthMethod, HostKeyVerification, SessionConfig};
pub use ssh::SshTransport;
