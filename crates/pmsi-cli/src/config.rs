//! CLI configuration file
//!
//! ```toml
//! log_level = "info"
//! log_format = "text"
//! pretty = false
//! tests = false
//! fail_on_line_errors = false
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Default tracing filter when neither `RUST_LOG` nor `-v`/`-q` is given
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Collect reference grouping results from GRP/RSA inputs
    pub tests: bool,
    /// Exit with failure when any record line could not be decoded
    pub fail_on_line_errors: bool,
}

impl CliConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a TOML configuration file
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// With log level
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// With pretty JSON output
    #[inline]
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// With reference results
    #[inline]
    #[must_use]
    pub fn with_tests(mut self, tests: bool) -> Self {
        self.tests = tests;
        self
    }

    /// With strict line error handling
    #[inline]
    #[must_use]
    pub fn with_fail_on_line_errors(mut self, fail: bool) -> Self {
        self.fail_on_line_errors = fail;
        self
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            pretty: false,
            tests: false,
            fail_on_line_errors: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: CliConfig = toml::from_str("pretty = true\nlog_format = \"json\"").unwrap();
        assert_eq!(
            config,
            CliConfig::new()
                .with_pretty(true)
                .with_log_format(LogFormat::Json)
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<CliConfig>("colour = true").is_err());
    }

    #[test]
    fn load_reports_path() {
        let err = CliConfig::load(Path::new("/nonexistent/pmsi.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pmsi.toml"));
    }
}
