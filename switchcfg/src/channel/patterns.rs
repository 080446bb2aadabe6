//! Prompt patterns for classifying where the remote session currently is.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// What a matched prompt means for the interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// `Password:` request during login.
    PasswordRequest,
    /// `yes/no` host key confirmation from the SSH client.
    HostKeyConfirmation,
    /// "Press any key to continue" interstitial after login.
    Banner,
    /// Exec prompt ending in `#`.
    Privileged,
    /// Exec prompt ending in `>`.
    Unprivileged,
    /// Exec prompt (either form) that terminates command output.
    Exec,
    /// Configuration-mode prompt, e.g. `switch(config)#`.
    Config,
    /// `-- MORE --` pagination interstitial.
    Pagination,
}

/// A compiled pattern tagged with its meaning.
///
/// Patterns are never anchored to a line end: prompts arrive without a
/// trailing newline and must match a partial line.
#[derive(Debug, Clone)]
pub struct PromptPattern {
    kind: PromptKind,
    regex: Regex,
}

impl PromptPattern {
    /// Compile a pattern for the given kind.
    pub fn new(kind: PromptKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
        })
    }

    /// The semantic tag of this pattern.
    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Byte span of the leftmost match in `data`.
    pub fn find(&self, data: &[u8]) -> Option<(usize, usize)> {
        self.regex.find(data).map(|m| (m.start(), m.end()))
    }
}

/// Prompt pattern sources, as they appear in a job file.
///
/// Defaults match HP/Aruba ProCurve style switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub password: String,
    pub host_key: String,
    pub banner: String,
    pub privileged: String,
    pub unprivileged: String,
    pub exec: String,
    pub config: String,
    pub pagination: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            password: r"[Pp]assword:".to_string(),
            host_key: r"yes/no".to_string(),
            banner: r"Press any key to continue".to_string(),
            privileged: r".*#".to_string(),
            unprivileged: r".*>".to_string(),
            exec: r"[a-zA-Z0-9_-]+[#>]".to_string(),
            config: r".*\(config[^)]*\)#".to_string(),
            pagination: r"--\s*MORE\s*.*".to_string(),
        }
    }
}

impl PromptConfig {
    /// Compile every pattern, failing on the first invalid one.
    pub fn compile(&self) -> Result<PromptSet, regex::Error> {
        Ok(PromptSet {
            password: PromptPattern::new(PromptKind::PasswordRequest, &self.password)?,
            host_key: PromptPattern::new(PromptKind::HostKeyConfirmation, &self.host_key)?,
            banner: PromptPattern::new(PromptKind::Banner, &self.banner)?,
            privileged: PromptPattern::new(PromptKind::Privileged, &self.privileged)?,
            unprivileged: PromptPattern::new(PromptKind::Unprivileged, &self.unprivileged)?,
            exec: PromptPattern::new(PromptKind::Exec, &self.exec)?,
            config: PromptPattern::new(PromptKind::Config, &self.config)?,
            pagination: PromptPattern::new(PromptKind::Pagination, &self.pagination)?,
        })
    }
}

/// The full set of compiled prompt patterns used by the drivers.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub password: PromptPattern,
    pub host_key: PromptPattern,
    pub banner: PromptPattern,
    pub privileged: PromptPattern,
    pub unprivileged: PromptPattern,
    pub exec: PromptPattern,
    pub config: PromptPattern,
    pub pagination: PromptPattern,
}

impl PromptSet {
    /// Compile the default ProCurve-style pattern set.
    pub fn standard() -> Result<Self, regex::Error> {
        PromptConfig::default().compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompts() -> PromptSet {
        PromptSet::standard().unwrap()
    }

    #[test]
    fn test_exec_prompt_matches_partial_line() {
        let prompts = prompts();
        assert!(prompts.exec.find(b"\r\nswitch-1# ").is_some());
        assert!(prompts.exec.find(b"core_sw>").is_some());
        assert!(prompts.exec.find(b"Running configuration:\r\n").is_none());
    }

    #[test]
    fn test_config_prompt() {
        let prompts = prompts();
        assert!(prompts.config.find(b"switch(config)# ").is_some());
        assert!(prompts.config.find(b"switch(config-if)#").is_some());
        assert!(prompts.config.find(b"switch# ").is_none());
    }

    #[test]
    fn test_pagination_marker() {
        let prompts = prompts();
        let (start, _) = prompts
            .pagination
            .find(b"vlan 1\r\n-- MORE --, next page: Space")
            .unwrap();
        assert_eq!(start, 8);
        assert!(prompts.pagination.find(b"--MORE--").is_some());
        assert!(prompts.pagination.find(b"no more output").is_none());
    }

    #[test]
    fn test_login_prompts() {
        let prompts = prompts();
        assert!(prompts.password.find(b"admin@10.0.0.5's password: ").is_some());
        assert!(prompts.password.find(b"Password:").is_some());
        assert!(
            prompts
                .host_key
                .find(b"Are you sure you want to continue connecting (yes/no/[fingerprint])?")
                .is_some()
        );
        assert_eq!(prompts.banner.kind(), PromptKind::Banner);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let config = PromptConfig {
            pagination: "--(MORE".to_string(),
            ..PromptConfig::default()
        };
        assert!(config.compile().is_err());
    }
}
