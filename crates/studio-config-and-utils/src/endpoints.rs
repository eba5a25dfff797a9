//! Runtime OAuth endpoints.

use crate::CognitoConfig;
use serde::{Deserialize, Serialize};

const SITE_SCOPE: &str = "aws.cognito.signin.user.admin email openid phone profile";

/// Response of the backend `siteconfig` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub app_client_id: String,
    /// User pool hosted UI domain, without the `/oauth2` suffix.
    pub user_pool_domain: String,
}

/// Endpoints used by the token exchange and refresh flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub client_id: String,
    pub token_endpoint: String,
    pub authorize_endpoint: String,
}

impl OAuthEndpoints {
    /// Endpoints from static configuration (local mode, or before the site
    /// configuration has been fetched).
    pub fn from_config(cognito: &CognitoConfig) -> Self {
        Self {
            client_id: cognito.client_id.clone(),
            token_endpoint: cognito.token_endpoint(),
            authorize_endpoint: cognito.authorize_url(),
        }
    }

    /// Endpoints from the backend's site configuration. `site_origin` is the
    /// origin the console is served from; the provider redirects back to its
    /// `/loading` page.
    pub fn from_site_config(site: &SiteConfig, site_origin: &str) -> Self {
        let domain = site.user_pool_domain.trim_end_matches('/');
        let redirect_uri = format!("{}/loading", site_origin.trim_end_matches('/'));
        Self {
            client_id: site.app_client_id.clone(),
            token_endpoint: format!("{domain}/oauth2/token"),
            authorize_endpoint: format!(
                "{domain}/oauth2/authorize?identity_provider=AzureAD&redirect_uri={}&response_type=CODE&client_id={}&scope={}",
                urlencoding::encode(&redirect_uri),
                urlencoding::encode(&site.app_client_id),
                urlencoding::encode(SITE_SCOPE),
            ),
        }
    }
}
