//! Command text synthesis for the access-list change.

use std::fmt;

/// Standard access list every directive edits.
pub const ACCESS_LIST_NAME: &str = "DENYACCESS";

/// Persists the running configuration.
pub const SAVE_COMMAND: &str = "write memory";

/// Line terminator the VTY expects between configuration lines.
const LINE_END: &str = "\r\n";

/// What to do with the `permit` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessAction {
    /// Add `permit <address>`.
    Permit,
    /// Remove it with `no permit <address>`.
    Remove,
}

/// Flag values selecting [`AccessAction::Remove`]. Matched case-insensitively;
/// every other value selects [`AccessAction::Permit`].
pub const REMOVE_FLAGS: &[&str] = &["a", "deny"];

impl AccessAction {
    /// Resolve the raw `-a` flag value.
    ///
    /// `a`/`A` keeps the historical single-letter trigger for removal,
    /// `deny` is its spelled-out form. `allow` and anything else add the rule.
    pub fn from_flag(value: &str) -> Self {
        if REMOVE_FLAGS.iter().any(|flag| value.eq_ignore_ascii_case(flag)) {
            AccessAction::Remove
        } else {
            AccessAction::Permit
        }
    }
}

/// Fleet-wide change intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Address or address/mask the rule names.
    pub address: String,

    /// `true` removes the permit rule, `false` adds it.
    pub deny: bool,
}

impl Directive {
    /// Create a directive.
    pub fn new(address: impl Into<String>, action: AccessAction) -> Self {
        Self {
            address: address.into(),
            deny: action == AccessAction::Remove,
        }
    }

    /// The resolved action.
    pub fn action(&self) -> AccessAction {
        if self.deny {
            AccessAction::Remove
        } else {
            AccessAction::Permit
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action() {
            AccessAction::Permit => write!(f, "permit {}", self.address),
            AccessAction::Remove => write!(f, "no permit {}", self.address),
        }
    }
}

/// Builds the configuration-mode command text for a [`Directive`].
pub struct CommandBuilder;

impl CommandBuilder {
    /// Configuration lines, in order.
    pub fn lines(directive: &Directive) -> Vec<String> {
        vec![
            "configure terminal".to_string(),
            format!("ip access-list standard {}", ACCESS_LIST_NAME),
            directive.to_string(),
            "end".to_string(),
        ]
    }

    /// The full multi-line command text, each line terminated.
    pub fn build(directive: &Directive) -> String {
        Self::lines(directive)
            .iter()
            .map(|line| format!("{line}{LINE_END}"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_command() {
        let text = CommandBuilder::build(&Directive::new("10.0.0.0/8", AccessAction::Permit));
        assert!(text.contains("permit 10.0.0.0/8"));
        assert!(!text.contains("no permit"));
    }

    #[test]
    fn test_remove_command() {
        let text = CommandBuilder::build(&Directive::new("10.0.0.0/8", AccessAction::Remove));
        assert!(text.contains("no permit 10.0.0.0/8"));
    }

    #[test]
    fn test_command_layout() {
        let text = CommandBuilder::build(&Directive::new("192.168.1.7", AccessAction::Permit));
        assert_eq!(
            text,
            "configure terminal\r\n\
             ip access-list standard DENYACCESS\r\n\
             permit 192.168.1.7\r\n\
             end\r\n"
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let directive = Directive::new("172.16.0.0 0.0.255.255", AccessAction::Remove);
        assert_eq!(CommandBuilder::build(&directive), CommandBuilder::build(&directive));
    }

    #[test]
    fn test_flag_table() {
        assert_eq!(AccessAction::from_flag("a"), AccessAction::Remove);
        assert_eq!(AccessAction::from_flag("A"), AccessAction::Remove);
        assert_eq!(AccessAction::from_flag("deny"), AccessAction::Remove);
        assert_eq!(AccessAction::from_flag("DENY"), AccessAction::Remove);

        assert_eq!(AccessAction::from_flag("allow"), AccessAction::Permit);
        assert_eq!(AccessAction::from_flag("Allow"), AccessAction::Permit);
        assert_eq!(AccessAction::from_flag("permit"), AccessAction::Permit);
        assert_eq!(AccessAction::from_flag("d"), AccessAction::Permit);
        assert_eq!(AccessAction::from_flag(""), AccessAction::Permit);
    }

    #[test]
    fn test_directive_action_round_trip() {
        let directive = Directive::new("10.1.1.1", AccessAction::Remove);
        assert!(directive.deny);
        assert_eq!(directive.action(), AccessAction::Remove);
        assert_eq!(directive.to_string(), "no permit 10.1.1.1");
    }
}
