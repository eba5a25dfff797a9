//! Identity provider (Cognito) client.
//!
//! Two surfaces are used:
//! - The hosted UI `/token` endpoint (form-encoded OAuth grants)
//! - The JSON API (`X-Amz-Target` dispatched calls) for GetUser and signup
//!   confirmation

use crate::error::{AuthError, AuthResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use studio_config_and_utils::OAuthEndpoints;
use tracing::{debug, warn};

const AMZ_TARGET_HEADER: &str = "X-Amz-Target";
const AMZ_JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

const DEFAULT_USER_TYPE: &str = "User";

pub(crate) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

pub(crate) fn decode_body<T: DeserializeOwned>(context: &str, body: &str) -> AuthResult<T> {
    serde_json::from_str(body)
        .map_err(|e| AuthError::InvalidResponse(format!("{context}: {e}")))
}

/// Tokens returned by the `/token` endpoint.
///
/// The refresh grant does not return a new refresh token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One `{Name, Value}` pair from GetUser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAttribute {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: String,
}

/// GetUser response.
#[derive(Debug, Clone, Deserialize)]
pub struct GetUserResponse {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "UserAttributes", default)]
    pub user_attributes: Vec<UserAttribute>,
}

impl GetUserResponse {
    pub fn attributes(&self) -> IdentityAttributes {
        IdentityAttributes::from_attributes(&self.user_attributes)
    }
}

/// Identity attributes the backend user check needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityAttributes {
    pub name: String,
    pub email: String,
    pub sub: String,
    pub org_id: Option<String>,
    pub user_type: String,
}

impl IdentityAttributes {
    pub fn from_attributes(attributes: &[UserAttribute]) -> Self {
        let find = |key: &str| {
            attributes
                .iter()
                .find(|attribute| attribute.name == key)
                .map(|attribute| attribute.value.clone())
                .filter(|value| !value.is_empty())
        };

        Self {
            name: find("name").unwrap_or_default(),
            email: find("email").unwrap_or_default(),
            sub: find("sub").unwrap_or_default(),
            org_id: find("custom:org_id"),
            user_type: find("custom:userType").unwrap_or_else(|| DEFAULT_USER_TYPE.to_string()),
        }
    }

    /// The organization domain: `custom:org_id` when set, else the part of
    /// the email after `@`, else empty.
    pub fn org_domain(&self) -> String {
        if let Some(org_id) = &self.org_id {
            return org_id.clone();
        }
        let domain = self
            .email
            .split_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_default();
        debug!(org_domain = %domain, "No custom:org_id attribute, using email domain");
        domain
    }
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    #[serde(rename = "AccessToken")]
    access_token: &'a str,
}

#[derive(Serialize)]
struct ConfirmSignUpRequest<'a> {
    #[serde(rename = "ClientId")]
    client_id: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
    #[serde(rename = "ConfirmationCode")]
    confirmation_code: &'a str,
}

#[derive(Serialize)]
struct ResendConfirmationRequest<'a> {
    #[serde(rename = "ClientId")]
    client_id: &'a str,
    #[serde(rename = "Username")]
    username: &'a str,
}

/// Client for the identity provider.
#[derive(Clone)]
pub struct IdentityProviderClient {
    http_client: reqwest::Client,
    api_endpoint: String,
}

impl IdentityProviderClient {
    /// Create a client. `api_endpoint` is the JSON API URL, e.g.
    /// `https://cognito-idp.us-east-1.amazonaws.com/`.
    pub fn new(api_endpoint: impl Into<String>, timeout: Duration) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, api_endpoint))
    }

    pub fn with_client(http_client: reqwest::Client, api_endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            api_endpoint: api_endpoint.into(),
        }
    }

    /// Trade an authorization code for a full token set.
    pub async fn exchange_code(
        &self,
        endpoints: &OAuthEndpoints,
        client_secret: &str,
        redirect_uri: &str,
        code: &str,
    ) -> AuthResult<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", endpoints.client_id.as_str()),
            ("client_secret", client_secret),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        let tokens = self.token_grant(&endpoints.token_endpoint, &form).await?;
        if tokens.refresh_token.is_none() {
            return Err(AuthError::InvalidResponse(
                "token endpoint: authorization_code grant returned no refresh_token".to_string(),
            ));
        }
        Ok(tokens)
    }

    /// Trade a refresh token for new id and access tokens.
    pub async fn refresh(
        &self,
        endpoints: &OAuthEndpoints,
        refresh_token: &str,
    ) -> AuthResult<TokenSet> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", endpoints.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.token_grant(&endpoints.token_endpoint, &form).await
    }

    async fn token_grant(&self, token_endpoint: &str, form: &[(&str, &str)]) -> AuthResult<TokenSet> {
        debug!(grant = form[0].1, "Requesting tokens");

        let response = self
            .http_client
            .post(token_endpoint)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            warn!(status = %status, body_summary = %body_summary, "Token endpoint rejected grant");
            return Err(AuthError::TokenEndpoint {
                status: status.as_u16(),
                body: body_summary,
            });
        }

        decode_body("token endpoint", &body)
    }

    /// Fetch the user's attributes with an access token.
    pub async fn get_user(&self, access_token: &str) -> AuthResult<GetUserResponse> {
        let body = self
            .json_api_call(
                "GetUser",
                &AccessTokenRequest { access_token },
                |status, body| AuthError::UserInfo { status, body },
            )
            .await?;
        let user: GetUserResponse = decode_body("GetUser", &body)?;
        debug!(
            attribute_count = user.user_attributes.len(),
            "Fetched user attributes"
        );
        Ok(user)
    }

    /// Confirm a signup with the emailed one-time code.
    pub async fn confirm_sign_up(
        &self,
        client_id: &str,
        username: &str,
        confirmation_code: &str,
    ) -> AuthResult<()> {
        self.json_api_call(
            "ConfirmSignUp",
            &ConfirmSignUpRequest {
                client_id,
                username,
                confirmation_code,
            },
            |status, body| AuthError::SignUp { status, body },
        )
        .await?;
        Ok(())
    }

    /// Ask the provider to send a new signup code.
    pub async fn resend_confirmation_code(&self, client_id: &str, username: &str) -> AuthResult<()> {
        self.json_api_call(
            "ResendConfirmationCode",
            &ResendConfirmationRequest {
                client_id,
                username,
            },
            |status, body| AuthError::SignUp { status, body },
        )
        .await?;
        Ok(())
    }

    async fn json_api_call<B, E>(&self, operation: &str, payload: &B, on_error: E) -> AuthResult<String>
    where
        B: Serialize + ?Sized,
        E: FnOnce(u16, String) -> AuthError,
    {
        let response = self
            .http_client
            .post(&self.api_endpoint)
            .header(AMZ_TARGET_HEADER, format!("{TARGET_PREFIX}.{operation}"))
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON_CONTENT_TYPE)
            .body(serde_json::to_vec(payload)?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            warn!(
                operation = operation,
                status = %status,
                body_summary = %body_summary,
                "Identity provider call failed"
            );
            return Err(on_error(status.as_u16(), body_summary));
        }
        Ok(body)
    }
}
