//! Certificate material shared by every device session.

use std::path::PathBuf;

use secrecy::SecretString;

use super::FleetConfig;

/// Client identity and device trust anchor.
///
/// Built once per run and only ever handed out by reference, so concurrent
/// sessions read it without synchronization.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    /// Client certificate presented to the device.
    pub client_cert: Option<PathBuf>,

    /// Client private key.
    pub client_key: Option<PathBuf>,

    /// Passphrase for an encrypted client private key.
    pub key_passphrase: Option<SecretString>,

    /// Root file the device's key must chain to.
    pub peer_root_cert: Option<PathBuf>,
}

impl TlsMaterial {
    /// Material trusting the root configured in the batch file.
    pub fn from_config(config: &FleetConfig) -> Self {
        Self {
            peer_root_cert: config.certificate_file.clone(),
            ..Default::default()
        }
    }

    /// Set the client certificate.
    pub fn with_client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(path.into());
        self
    }

    /// Set the client private key.
    pub fn with_client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.client_key = Some(path.into());
        self
    }

    /// Set the client private key passphrase.
    pub fn with_key_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.key_passphrase = Some(SecretString::from(passphrase.into()));
        self
    }
}
