//! Structured logging for the Studio session tools.
//!
//! A binary calls [`init`] once; libraries only emit `tracing` events. Events
//! go to a shared JSONL file (`~/.studio/logs/dev.jsonl` unless configured)
//! and optionally to stderr.
//!
//! Token material never reaches either sink. Keys such as `refresh_token`
//! or `code` and JWT-shaped values are replaced before serialization. In
//! [`ObservabilityMode::ProdMetadataOnly`] only a small allowlist of fields
//! survives.
//!
//! ```rust,ignore
//! observability::init(
//!     observability::LogConfig::new("studio-session")
//!         .with_filter("debug")
//!         .with_stderr(true),
//! );
//! ```

mod json_layer;
mod redact;
mod sink;

pub use redact::sanitize_value;
pub use sink::JsonlFile;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// How much of each event's fields is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservabilityMode {
    /// Every field, after secret redaction.
    #[default]
    DevVerbose,
    /// Allowlisted metadata fields only.
    ProdMetadataOnly,
}

impl ObservabilityMode {
    /// `prod`/`production` select metadata-only; anything else is verbose.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::ProdMetadataOnly,
            _ => Self::DevVerbose,
        }
    }
}

/// Subscriber settings for one process.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Written as `service` on every line.
    pub service: String,
    /// Fallback directive when `RUST_LOG` is unset.
    pub filter: String,
    /// JSONL destination. `None` means the default under the home directory.
    pub file: Option<PathBuf>,
    pub stderr: bool,
    pub mode: ObservabilityMode,
}

impl LogConfig {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            filter: "info".to_string(),
            file: None,
            stderr: false,
            mode: ObservabilityMode::default(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_mode(mut self, mode: ObservabilityMode) -> Self {
        self.mode = mode;
        self
    }

    /// The JSONL path this config writes to, if one can be resolved.
    pub fn resolved_file(&self) -> Option<PathBuf> {
        self.file.clone().or_else(sink::default_log_path)
    }

    pub(crate) fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed in this process.
/// If the log file cannot be opened, stderr is used instead.
pub fn init(config: LogConfig) -> bool {
    sink::install(&config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = LogConfig::new("studio-session");
        assert_eq!(config.service, "studio-session");
        assert_eq!(config.filter, "info");
        assert!(config.file.is_none());
        assert!(!config.stderr);
        assert_eq!(config.mode, ObservabilityMode::DevVerbose);
    }

    #[test]
    fn test_builder_overrides() {
        let config = LogConfig::new("svc")
            .with_filter("debug")
            .with_file("/tmp/x.jsonl")
            .with_stderr(true)
            .with_mode(ObservabilityMode::ProdMetadataOnly);

        assert_eq!(config.filter, "debug");
        assert_eq!(config.resolved_file(), Some(PathBuf::from("/tmp/x.jsonl")));
        assert!(config.stderr);
        assert_eq!(config.mode, ObservabilityMode::ProdMetadataOnly);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(ObservabilityMode::parse("prod"), ObservabilityMode::ProdMetadataOnly);
        assert_eq!(
            ObservabilityMode::parse(" Production "),
            ObservabilityMode::ProdMetadataOnly
        );
        assert_eq!(ObservabilityMode::parse("dev"), ObservabilityMode::DevVerbose);
        assert_eq!(ObservabilityMode::parse(""), ObservabilityMode::DevVerbose);
    }
}
