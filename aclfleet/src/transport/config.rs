//! Secure session configuration for one device.

use std::path::PathBuf;
use std::time::Duration;

use log::warn;
use secrecy::SecretString;

use crate::config::{Credentials, TlsMaterial};

/// Device key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Used whenever a root file is
    /// configured, which must then already list the device.
    Strict,

    /// Accept and record unknown keys, reject changed keys.
    #[default]
    AcceptNew,
}

/// Secure session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target device (hostname or IP address).
    pub host: String,

    /// Management port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Authentication method.
    pub auth: AuthMethod,

    /// Connection and inactivity timeout.
    pub timeout: Duration,

    /// Device key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// File listing trusted device keys. `None` uses the user's known_hosts.
    pub known_hosts_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Configuration for `host` from the fleet's shared credentials and
    /// certificate material.
    ///
    /// A configured client key selects key authentication, presenting the
    /// client certificate when one is set. Otherwise the password is used.
    pub fn for_device(
        host: &str,
        port: u16,
        credentials: Credentials<'_>,
        tls: &TlsMaterial,
        timeout: Duration,
    ) -> Self {
        let auth = match &tls.client_key {
            Some(path) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: tls.key_passphrase.clone(),
                certificate: tls.client_cert.clone(),
            },
            None => AuthMethod::Password(credentials.password.clone()),
        };

        let host_key_verification = if tls.peer_root_cert.is_some() {
            HostKeyVerification::Strict
        } else {
            warn!(
                "{}: no root file configured, trusting an unknown device key on first use",
                host
            );
            HostKeyVerification::AcceptNew
        };

        Self {
            host: host.to_string(),
            port,
            username: credentials.username.to_string(),
            auth,
            timeout,
            host_key_verification,
            known_hosts_path: tls.peer_root_cert.clone(),
        }
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Authentication method for a device session.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Password authentication.
    Password(SecretString),

    /// Private key authentication.
    PrivateKey {
        /// Path to the private key file.
        path: PathBuf,
        /// Optional passphrase for encrypted keys.
        passphrase: Option<SecretString>,
        /// Optional OpenSSH certificate issued for the key.
        certificate: Option<PathBuf>,
    },
}
