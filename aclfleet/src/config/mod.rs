//! Batch configuration: the fleet descriptor and the certificate material
//! shared by every device session.

mod loader;
mod tls;

pub use loader::ConfigLoader;
pub use tls::TlsMaterial;

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

/// Parsed batch descriptor.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// Device addresses in order of appearance. Duplicates are kept.
    pub devices: Vec<String>,

    /// Username shared by every device.
    pub username: String,

    /// Password shared by every device.
    pub password: SecretString,

    /// Root certificate used to trust devices, if configured.
    pub certificate_file: Option<PathBuf>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            username: String::new(),
            password: SecretString::from(String::new()),
            certificate_file: None,
        }
    }
}

impl FleetConfig {
    /// Borrow the shared credential pair.
    pub fn credentials(&self) -> Credentials<'_> {
        Credentials {
            username: &self.username,
            password: &self.password,
        }
    }
}

/// Credential pair handed to a session client.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a SecretString,
}

impl Credentials<'_> {
    /// Whether a password was configured at all.
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().is_empty()
    }
}
