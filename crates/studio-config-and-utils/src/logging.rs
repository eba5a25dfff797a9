//! Logging setup for the session tools.

use crate::Paths;
use observability::{LogConfig, ObservabilityMode};

const SERVICE_NAME: &str = "studio-session";

/// Install JSONL logging under `paths` plus a stderr echo.
///
/// `RUST_LOG` overrides `level`. `STUDIO_OBS_MODE=prod` keeps metadata
/// fields only.
pub fn init_logging(level: &str, paths: &Paths) {
    init_logging_for_service(SERVICE_NAME, level, paths);
}

pub fn init_logging_for_service(service: &str, level: &str, paths: &Paths) {
    let mode = std::env::var("STUDIO_OBS_MODE").ok();
    observability::init(log_config(service, level, paths, mode.as_deref()));
}

fn log_config(service: &str, level: &str, paths: &Paths, mode: Option<&str>) -> LogConfig {
    LogConfig::new(service)
        .with_filter(level)
        .with_file(paths.log_file())
        .with_stderr(true)
        .with_mode(mode.map(ObservabilityMode::parse).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_writes_under_paths() {
        let paths = Paths::at("/tmp/studio-logs");
        let config = log_config("studio-session", "debug", &paths, None);

        assert_eq!(config.service, "studio-session");
        assert_eq!(config.filter, "debug");
        assert_eq!(config.file, Some(paths.log_file()));
        assert!(config.stderr);
        assert_eq!(config.mode, ObservabilityMode::DevVerbose);
    }

    #[test]
    fn test_log_config_prod_mode() {
        let config = log_config("studio-session", "info", &Paths::at("/tmp"), Some("PROD"));
        assert_eq!(config.mode, ObservabilityMode::ProdMetadataOnly);
    }
}
