//! `key=value` batch file parser.
//!
//! The format is deliberately forgiving: lines without a separator and keys
//! nobody asked for are skipped, and a repeated key simply overwrites the
//! previous value.
//!
//! ```text
//! routers=10.0.0.1,10.0.0.2,10.0.0.3
//! username=admin
//! password=secret
//! certificateFile=/path/to/cert.pem
//! ```

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use secrecy::SecretString;

use super::FleetConfig;
use crate::error::ConfigError;

const ROUTERS_KEY: &str = "routers";
const USERNAME_KEY: &str = "username";
const PASSWORD_KEY: &str = "password";
const CERTIFICATE_FILE_KEY: &str = "certificateFile";

/// Loads a [`FleetConfig`] from disk.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Read and parse the batch file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<FleetConfig, ConfigError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
                source,
            },
            _ => ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let text = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = text {
            warn!(
                "{} is not valid UTF-8, invalid bytes were replaced",
                path.display()
            );
        }

        let config = FleetConfig::parse(&text);
        debug!(
            "loaded {} with {} device(s)",
            path.display(),
            config.devices.len()
        );
        if config.username.is_empty() {
            warn!("{} does not set '{}'", path.display(), USERNAME_KEY);
        }
        if !config.credentials().has_password() {
            debug!("{} does not set '{}'", path.display(), PASSWORD_KEY);
        }
        Ok(config)
    }
}

impl FleetConfig {
    /// Parse batch file text.
    pub fn parse(text: &str) -> Self {
        let mut config = FleetConfig::default();

        // `lines` strips both `\n` and `\r\n`, and yields a final line
        // that has no terminator.
        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };

            match key {
                ROUTERS_KEY => config.devices = split_devices(value),
                USERNAME_KEY => config.username = value.to_string(),
                PASSWORD_KEY => config.password = SecretString::from(value.to_string()),
                CERTIFICATE_FILE_KEY => config.certificate_file = Some(PathBuf::from(value)),
                other => debug!("ignoring unknown config key '{}'", other),
            }
        }

        config
    }
}

/// Split a `routers` value into device addresses. Empty tokens carry no
/// address and are dropped; everything else is kept verbatim.
fn split_devices(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
