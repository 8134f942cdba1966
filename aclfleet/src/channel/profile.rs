//! Prompt and failure conventions of a device command line.
//!
//! Prompt patterns follow the IOS-style shapes:
//!
//! ```text
//! router>                      # user exec
//! router#                      # privileged exec
//! router(config)#              # global configuration
//! router(config-std-nacl)#     # standard access-list configuration
//! ```

use regex::bytes::Regex;

use crate::error::{ChannelError, DriverError, Result};
use crate::session::DeviceProperty;

/// Prompt shapes for every exec and configuration mode.
const IOS_PROMPT: &str = r"(?m)^[\w.\-@()/: ]{1,63}[>#]\s?$";

/// `show version` line naming the system, e.g. `router1 uptime is 3 weeks`.
const UPTIME_MARKER: &str = " uptime is ";

/// Command line conventions of a device family.
#[derive(Debug, Clone)]
pub struct VtyProfile {
    /// Matches any prompt the device may show.
    pub prompt: Regex,

    /// Output fragments that mean the device rejected a command.
    pub failed_when_contains: Vec<String>,

    /// Commands sent right after the channel opens.
    pub on_open_commands: Vec<String>,

    /// Command whose output names the device.
    pub property_command: String,

    /// Terminal width for the PTY.
    pub terminal_width: u32,

    /// Terminal height for the PTY.
    pub terminal_height: u32,

    /// Bytes from the end of the output searched for the prompt.
    pub search_depth: usize,
}

impl VtyProfile {
    /// Profile with a custom prompt pattern and no failure markers.
    pub fn new(prompt: &str) -> Result<Self> {
        Ok(Self {
            prompt: Regex::new(prompt).map_err(ChannelError::InvalidPattern)?,
            failed_when_contains: Vec::new(),
            on_open_commands: Vec::new(),
            property_command: "show version".to_string(),
            terminal_width: 511,
            terminal_height: 24,
            search_depth: 1000,
        })
    }

    /// IOS-style routers.
    pub fn ios() -> Self {
        Self {
            prompt: Regex::new(IOS_PROMPT).expect("IOS prompt pattern is valid"),
            failed_when_contains: Vec::new(),
            on_open_commands: Vec::new(),
            property_command: "show version".to_string(),
            terminal_width: 511,
            terminal_height: 24,
            search_depth: 1000,
        }
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unknown command")
        .with_failure_pattern("% Access denied")
        .with_failure_pattern("% Error")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on-open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// First failure marker found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }

    /// Read the system name from the property command's output.
    pub fn parse_property(&self, output: &str) -> Result<DeviceProperty> {
        let sys_name = output
            .lines()
            .find_map(|line| line.split_once(UPTIME_MARKER))
            .map(|(name, _)| name.trim())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DriverError::PropertyUnavailable {
                message: format!("no system name in '{}' output", self.property_command),
            })?;

        Ok(DeviceProperty {
            sys_name: sys_name.to_string(),
        })
    }
}

impl Default for VtyProfile {
    fn default() -> Self {
        Self::ios()
    }
}
