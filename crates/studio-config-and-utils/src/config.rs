//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default backend API base URL. Endpoint names are appended to it.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

/// Origin the console is served from, sent as `X-Domain`.
pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:3000";

/// Background refresh period.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 1320;

/// Per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const DEFAULT_SCOPE: &str = "aws.cognito.signin.user.admin email openid phone profile";

/// Deployment mode.
///
/// In `Local` mode the OAuth endpoints come from static configuration. In
/// `Remote` mode they are fetched from the backend's `siteconfig` endpoint
/// before any session work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    #[default]
    Local,
    Remote,
}

impl FromStr for AppMode {
    type Err = CoreError;

    /// `local` selects local mode; any other non-empty value is remote.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(CoreError::Config("empty app mode".to_string())),
            "local" => Ok(Self::Local),
            _ => Ok(Self::Remote),
        }
    }
}

/// Which refresh timers a live session keeps armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStrategy {
    /// Fixed-interval background refresh only.
    #[default]
    Interval,
    /// Expiry-aware one-shot refresh only, re-armed after every cycle.
    Smart,
    /// Both timers, uncoordinated.
    Both,
}

impl RefreshStrategy {
    pub fn uses_interval(self) -> bool {
        matches!(self, Self::Interval | Self::Both)
    }

    pub fn uses_smart(self) -> bool {
        matches!(self, Self::Smart | Self::Both)
    }
}

impl FromStr for RefreshStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interval" => Ok(Self::Interval),
            "smart" => Ok(Self::Smart),
            "both" => Ok(Self::Both),
            other => Err(CoreError::Config(format!(
                "unknown refresh strategy '{other}' (expected interval, smart or both)"
            ))),
        }
    }
}

/// Refresh timing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSettings {
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub strategy: RefreshStrategy,
    #[serde(default = "default_smart_margin_secs")]
    pub smart_margin_secs: u64,
    #[serde(default = "default_smart_floor_secs")]
    pub smart_floor_secs: u64,
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_smart_margin_secs() -> u64 {
    300
}

fn default_smart_floor_secs() -> u64 {
    60
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            strategy: RefreshStrategy::default(),
            smart_margin_secs: default_smart_margin_secs(),
            smart_floor_secs: default_smart_floor_secs(),
        }
    }
}

impl RefreshSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn smart_margin(&self) -> Duration {
        Duration::from_secs(self.smart_margin_secs)
    }

    pub fn smart_floor(&self) -> Duration {
        Duration::from_secs(self.smart_floor_secs)
    }
}

/// Identity provider (Cognito) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CognitoConfig {
    /// AWS region hosting the user pool.
    pub region: String,
    /// Hosted UI domain, e.g. `https://auth.example.com/oauth2`.
    pub domain: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub user_pool_id: String,
    /// Federated identity provider name used on the authorize URL.
    pub identity_provider: String,
    pub scope: String,
    /// Overrides the regional JSON API endpoint (private endpoints, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl Default for CognitoConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            domain: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            user_pool_id: String::new(),
            identity_provider: "AzureAD".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            api_endpoint: None,
        }
    }
}

impl CognitoConfig {
    /// `{domain}/token`.
    pub fn token_endpoint(&self) -> String {
        format!("{}/token", self.domain.trim_end_matches('/'))
    }

    /// The identity provider's JSON API endpoint for this region.
    pub fn identity_api_endpoint(&self) -> String {
        match &self.api_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.region),
        }
    }

    /// Hosted UI authorize URL built from static settings.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/authorize?identity_provider={}&redirect_uri={}&response_type=CODE&client_id={}&scope={}",
            self.domain.trim_end_matches('/'),
            urlencoding::encode(&self.identity_provider),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.scope),
        )
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub mode: AppMode,
    #[serde(default)]
    pub cognito: CognitoConfig,
    /// Backend API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Origin the console is served from.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    #[serde(default)]
    pub refresh: RefreshSettings,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_site_origin() -> String {
    DEFAULT_SITE_ORIGIN.to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            mode: AppMode::default(),
            cognito: CognitoConfig::default(),
            api_url: default_api_url(),
            site_origin: default_site_origin(),
            refresh: RefreshSettings::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (if any), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the refresh timers and HTTP clients cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.refresh.interval_secs == 0 {
            return Err(CoreError::Config(
                "refresh.interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(CoreError::Config(
                "http_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `STUDIO_*` overrides looked up through `lookup`.
    ///
    /// Empty values are ignored. Unparseable numeric or enum values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let strings: [(&str, &mut String); 11] = [
            ("STUDIO_LOG_LEVEL", &mut self.log_level),
            ("STUDIO_COGNITO_REGION", &mut self.cognito.region),
            ("STUDIO_COGNITO_DOMAIN", &mut self.cognito.domain),
            ("STUDIO_COGNITO_CLIENT_ID", &mut self.cognito.client_id),
            ("STUDIO_COGNITO_CLIENT_SECRET", &mut self.cognito.client_secret),
            ("STUDIO_COGNITO_REDIRECT_URI", &mut self.cognito.redirect_uri),
            ("STUDIO_COGNITO_USER_POOL_ID", &mut self.cognito.user_pool_id),
            ("STUDIO_COGNITO_IDP_NAME", &mut self.cognito.identity_provider),
            ("STUDIO_COGNITO_SCOPE", &mut self.cognito.scope),
            ("STUDIO_API_BASE_URL", &mut self.api_url),
            ("STUDIO_SITE_ORIGIN", &mut self.site_origin),
        ];
        for (name, slot) in strings {
            if let Some(value) = get(name) {
                *slot = value;
            }
        }

        if let Some(raw) = get("STUDIO_APP_MODE") {
            match raw.parse() {
                Ok(mode) => self.mode = mode,
                Err(e) => tracing::warn!(error = %e, "Ignoring STUDIO_APP_MODE"),
            }
        }

        if let Some(raw) = get("STUDIO_REFRESH_STRATEGY") {
            match raw.parse() {
                Ok(strategy) => self.refresh.strategy = strategy,
                Err(e) => tracing::warn!(error = %e, "Ignoring STUDIO_REFRESH_STRATEGY"),
            }
        }

        if let Some(raw) = get("STUDIO_REFRESH_INTERVAL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.refresh.interval_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring STUDIO_REFRESH_INTERVAL_SECS"),
            }
        }

        if let Some(raw) = get("STUDIO_HTTP_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.http_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring STUDIO_HTTP_TIMEOUT_SECS"),
            }
        }
    }

    /// Backend API base URL, normalized to end with `/` so endpoint names
    /// join underneath it.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        let mut raw = self.api_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(CoreError::from)
    }

    /// Per-request HTTP timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Whether the site is served over HTTPS (decides the cookie `Secure` flag).
    pub fn is_secure_origin(&self) -> bool {
        Url::parse(&self.site_origin).is_ok_and(|url| url.scheme() == "https")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.mode, AppMode::Local);
        assert_eq!(config.refresh.interval_secs, 1320);
        assert_eq!(config.refresh.strategy, RefreshStrategy::Interval);
        assert_eq!(config.refresh.smart_margin(), Duration::from_secs(300));
        assert_eq!(config.refresh.smart_floor(), Duration::from_secs(60));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert!(!config.is_secure_origin());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug",
            "mode": "remote",
            "cognito": {"domain": "https://auth.example.com", "client_id": "abc"},
            "refresh": {"strategy": "both"}
        }"#;
        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.mode, AppMode::Remote);
        assert_eq!(config.cognito.client_id, "abc");
        assert_eq!(config.cognito.region, "us-east-1");
        assert_eq!(config.refresh.strategy, RefreshStrategy::Both);
        assert_eq!(config.refresh.interval_secs, 1320);
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());

        let mut config = Config::default();
        config.cognito.domain = "https://auth.example.com".to_string();
        config.refresh.strategy = RefreshStrategy::Smart;
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded.cognito, config.cognito);
        assert_eq!(loaded.refresh, config.refresh);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.refresh, RefreshSettings::default());
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(CoreError::Json(_))));
    }

    #[test]
    fn test_zero_interval_or_timeout_in_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"refresh": {"interval_secs": 0}}"#).unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(CoreError::Config(_))));

        std::fs::write(&path, r#"{"http_timeout_secs": 0}"#).unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(CoreError::Config(_))));

        std::fs::write(&path, r#"{"http_timeout_secs": 5}"#).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap().http_timeout_secs, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("STUDIO_APP_MODE", "production"),
            ("STUDIO_COGNITO_REGION", "eu-west-1"),
            ("STUDIO_COGNITO_CLIENT_ID", "client"),
            ("STUDIO_API_BASE_URL", "https://api.example.com/v1"),
            ("STUDIO_SITE_ORIGIN", "https://studio.example.com"),
            ("STUDIO_REFRESH_STRATEGY", "smart"),
            ("STUDIO_REFRESH_INTERVAL_SECS", "600"),
            ("STUDIO_HTTP_TIMEOUT_SECS", "5"),
            ("STUDIO_LOG_LEVEL", "  "),
        ]));

        assert_eq!(config.mode, AppMode::Remote);
        assert_eq!(config.cognito.region, "eu-west-1");
        assert_eq!(config.cognito.client_id, "client");
        assert_eq!(config.refresh.strategy, RefreshStrategy::Smart);
        assert_eq!(config.refresh.interval_secs, 600);
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.is_secure_origin());
        assert_eq!(
            config.api_base_url().unwrap().as_str(),
            "https://api.example.com/v1/"
        );
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("STUDIO_REFRESH_STRATEGY", "sometimes"),
            ("STUDIO_HTTP_TIMEOUT_SECS", "0"),
            ("STUDIO_REFRESH_INTERVAL_SECS", "soon"),
        ]));
        assert_eq!(config.refresh, RefreshSettings::default());
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_app_mode_parse() {
        assert_eq!("local".parse::<AppMode>().unwrap(), AppMode::Local);
        assert_eq!("LOCAL".parse::<AppMode>().unwrap(), AppMode::Local);
        assert_eq!("dev".parse::<AppMode>().unwrap(), AppMode::Remote);
        assert!("".parse::<AppMode>().is_err());
    }

    #[test]
    fn test_strategy_flags() {
        assert!(RefreshStrategy::Interval.uses_interval());
        assert!(!RefreshStrategy::Interval.uses_smart());
        assert!(RefreshStrategy::Smart.uses_smart());
        assert!(!RefreshStrategy::Smart.uses_interval());
        assert!(RefreshStrategy::Both.uses_smart() && RefreshStrategy::Both.uses_interval());
    }

    #[test]
    fn test_cognito_endpoints() {
        let cognito = CognitoConfig {
            region: "eu-west-1".to_string(),
            domain: "https://auth.example.com/oauth2/".to_string(),
            client_id: "abc".to_string(),
            redirect_uri: "https://studio.example.com/loading".to_string(),
            ..Default::default()
        };

        assert_eq!(cognito.token_endpoint(), "https://auth.example.com/oauth2/token");
        assert_eq!(
            cognito.identity_api_endpoint(),
            "https://cognito-idp.eu-west-1.amazonaws.com/"
        );
        let private = CognitoConfig {
            api_endpoint: Some("http://127.0.0.1:9229/".to_string()),
            ..cognito.clone()
        };
        assert_eq!(private.identity_api_endpoint(), "http://127.0.0.1:9229/");

        let url = cognito.authorize_url();
        assert!(url.starts_with("https://auth.example.com/oauth2/authorize?identity_provider=AzureAD&"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fstudio.example.com%2Floading"));
        assert!(url.contains("response_type=CODE&client_id=abc&"));
        assert!(url.ends_with("scope=aws.cognito.signin.user.admin%20email%20openid%20phone%20profile"));
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = Config::default();
        config.api_url = "not a valid url".to_string();
        assert!(config.api_base_url().is_err());
    }
}
