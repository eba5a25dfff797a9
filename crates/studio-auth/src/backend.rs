//! Backend API client.

use crate::error::{AuthError, AuthResult};
use crate::headers::DefaultHeaders;
use crate::identity::{decode_body, summarize_response_body, IdentityAttributes};
use serde::{Deserialize, Serialize};
use session_store::{SessionRecord, UserPerms};
use std::time::Duration;
use studio_config_and_utils::SiteConfig;
use tracing::{debug, warn};
use url::Url;

const SUPER_ADMIN_USER_TYPE: &str = "Superadmin";
const DEFAULT_USER_TYPE: &str = "User";

/// Body of `POST checkUsr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckUserRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub coguser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    pub org_id: String,
    pub external_org: Vec<String>,
    #[serde(rename = "userPerms")]
    pub user_perms: UserPerms,
    pub domain: String,
}

impl CheckUserRequest {
    /// Request built from provider attributes right after a code exchange.
    pub fn for_exchange(attributes: &IdentityAttributes, coguser: &str) -> Self {
        let org_domain = attributes.org_domain();
        Self {
            id: attributes.sub.clone(),
            email: attributes.email.clone(),
            name: attributes.name.clone(),
            coguser: coguser.to_string(),
            user_type: Some(attributes.user_type.clone()),
            org_id: org_domain.clone(),
            external_org: Vec::new(),
            user_perms: UserPerms::default(),
            domain: org_domain,
        }
    }

    /// Request built from the stored record during a refresh.
    ///
    /// `domain` is the stored org domain, else the primary org.
    pub fn for_refresh(record: &SessionRecord) -> Self {
        let org_domain = record.org_domain().unwrap_or_default().to_string();
        let domain = if org_domain.is_empty() {
            record.primary_org.clone().unwrap_or_default()
        } else {
            org_domain.clone()
        };
        Self {
            id: record.usercid.clone().unwrap_or_default(),
            email: record.usermail.clone().unwrap_or_default(),
            name: record.username.clone().unwrap_or_default(),
            coguser: record.coguser.clone().unwrap_or_default(),
            user_type: None,
            org_id: org_domain,
            external_org: Vec::new(),
            user_perms: UserPerms::default(),
            domain,
        }
    }
}

/// Response of `POST checkUsr`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckUserResponse {
    #[serde(default)]
    pub admin_approve: Option<bool>,
    #[serde(default)]
    pub primary_org: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    /// Only meaningful when approved; rejections usually omit it.
    #[serde(rename = "userPerms", default)]
    pub user_perms: UserPerms,
}

impl CheckUserResponse {
    pub fn is_approved(&self) -> bool {
        self.admin_approve == Some(true)
    }

    pub fn is_super_admin(&self) -> bool {
        self.user_type.as_deref() == Some(SUPER_ADMIN_USER_TYPE)
    }

    /// User type, defaulting to `User` when absent or empty.
    pub fn user_type_or_default(&self) -> String {
        self.user_type
            .clone()
            .filter(|user_type| !user_type.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_TYPE.to_string())
    }
}

/// Response of `GET profile/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

#[derive(Serialize)]
struct OrgConfirmationRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct NotifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    orgid: &'a str,
}

/// Client for the console backend. Every request carries the default headers.
#[derive(Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: Url,
    headers: DefaultHeaders,
}

impl BackendClient {
    /// Create a client. `base_url` must end with `/`.
    pub fn new(base_url: Url, headers: DefaultHeaders, timeout: Duration) -> AuthResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, base_url, headers))
    }

    pub fn with_client(http_client: reqwest::Client, base_url: Url, headers: DefaultHeaders) -> Self {
        Self {
            http_client,
            base_url,
            headers,
        }
    }

    fn endpoint(&self, name: &str) -> AuthResult<Url> {
        Ok(self.base_url.join(name)?)
    }

    /// Re-derive the user's live permissions and org context.
    pub async fn check_user(&self, request: &CheckUserRequest) -> AuthResult<CheckUserResponse> {
        let response = self
            .headers
            .apply(self.http_client.post(self.endpoint("checkUsr")?))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body_summary = summarize_response_body(&body);
            warn!(status = %status, body_summary = %body_summary, "User check failed");
            return Err(AuthError::CheckUser {
                status: status.as_u16(),
                body: body_summary,
            });
        }

        let checked: CheckUserResponse = decode_body("checkUsr", &body)?;
        debug!(
            approved = checked.is_approved(),
            has_primary_org = checked.primary_org.is_some(),
            "User check complete"
        );
        Ok(checked)
    }

    /// Fetch the user's profile image URL, if one is set.
    pub async fn fetch_profile_image(&self, user_id: &str) -> AuthResult<Option<String>> {
        let mut url = self.endpoint("profile/get")?;
        url.query_pairs_mut().append_pair("userid", user_id);

        let response = self
            .headers
            .apply(self.http_client.get(url))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Profile {
                status: status.as_u16(),
                body: summarize_response_body(&body),
            });
        }

        let profile: ProfileResponse = decode_body("profile/get", &body)?;
        Ok(profile.image_url.filter(|url| !url.is_empty()))
    }

    /// Fetch the runtime OAuth settings.
    pub async fn fetch_site_config(&self) -> AuthResult<SiteConfig> {
        let response = self
            .headers
            .apply(self.http_client.get(self.endpoint("siteconfig")?))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::SiteConfig {
                status: status.as_u16(),
                body: summarize_response_body(&body),
            });
        }

        decode_body("siteconfig", &body)
    }

    /// Tell the backend an org owner signed up. Failures are logged only.
    pub async fn send_org_owner_confirmation(&self, email: &str, org_id: &str) {
        if let Err(e) = self
            .post_best_effort("sendOrgConfirmation", &OrgConfirmationRequest { email })
            .await
        {
            warn!(error = %e, "Failed to send org owner confirmation");
        }

        if let Err(e) = self
            .post_best_effort(
                "notify",
                &NotifyRequest {
                    kind: "message",
                    orgid: org_id,
                },
            )
            .await
        {
            warn!(error = %e, "Failed to send org notification");
        }
    }

    async fn post_best_effort<B: Serialize>(&self, name: &str, body: &B) -> AuthResult<()> {
        let response = self
            .headers
            .apply(self.http_client.post(self.endpoint(name)?))
            .json(body)
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}
