//! Configuration, paths, and logging setup for the Studio session tools.

mod config;
mod endpoints;
mod error;
mod logging;
mod paths;

pub use config::{
    AppMode, CognitoConfig, Config, RefreshSettings, RefreshStrategy, DEFAULT_API_URL,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOG_LEVEL, DEFAULT_REFRESH_INTERVAL_SECS,
    DEFAULT_SITE_ORIGIN,
};
pub use endpoints::{OAuthEndpoints, SiteConfig};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
