//! Authorization code exchange.

use crate::auth_fsm::CycleInput;
use crate::backend::CheckUserRequest;
use crate::error::{AuthError, AuthResult};
use crate::navigator::RedirectTarget;
use crate::session::{cancellable, SessionManager};
use session_store::OrgContext;
use tracing::info;

/// Result of a code exchange that reached the backend user check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Session persisted; the user picks an organization next.
    Approved {
        redirect_to: RedirectTarget,
        is_super_admin: bool,
    },
    /// The backend withheld approval. Nothing usable was persisted.
    Rejected,
}

impl ExchangeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeOutcome::Approved { .. })
    }

    pub fn redirect_target(&self) -> Option<RedirectTarget> {
        match self {
            ExchangeOutcome::Approved { redirect_to, .. } => Some(*redirect_to),
            ExchangeOutcome::Rejected => None,
        }
    }
}

impl SessionManager {
    /// Trade an authorization code for a session.
    ///
    /// Network and schema failures clear the session, flag the auth error and
    /// redirect to `/login` before the error is returned. A rejection by the
    /// backend is `Ok(ExchangeOutcome::Rejected)` with no redirect.
    pub async fn exchange_code(&self, code: &str) -> AuthResult<ExchangeOutcome> {
        let _cycle = self.cycle.lock().await;
        let token = self.store.cancellation_token();
        self.transition(&CycleInput::CodeReceived)?;
        info!("Exchanging authorization code");

        let endpoints = self.endpoints();
        let redirect_uri = self.redirect_uri();
        let issued = cancellable(
            &token,
            self.identity.exchange_code(
                &endpoints,
                &self.cognito.client_secret,
                &redirect_uri,
                code,
            ),
        )
        .await;
        let tokens = match issued {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.fail_token_request(e, &token)),
        };
        self.transition(&CycleInput::TokensIssued)?;
        self.headers.set_token(&tokens.id_token);

        let user = match cancellable(&token, self.identity.get_user(&tokens.access_token)).await {
            Ok(user) => user,
            Err(e) => return Err(self.fail_validation(e)),
        };
        let attributes = user.attributes();
        let request = CheckUserRequest::for_exchange(&attributes, &user.username);
        let checked = match cancellable(&token, self.backend.check_user(&request)).await {
            Ok(checked) => checked,
            Err(e) => return Err(self.fail_validation(e)),
        };

        if !checked.is_approved() {
            self.transition(&CycleInput::UserRejected)?;
            info!("User is not approved");
            return Ok(ExchangeOutcome::Rejected);
        }

        let is_super_admin = checked.is_super_admin();
        let committed = self.store.transaction_if_current(&token, |record| {
            record.primary_org = checked.primary_org.clone();
            record.access_token = Some(tokens.access_token.clone());
            record.id_token = Some(tokens.id_token.clone());
            record.refresh_token = tokens.refresh_token.clone();
            record.app_user_logged_in = Some(true);
            record.usercid = Some(attributes.sub.clone());
            record.username = Some(attributes.name.clone());
            record.coguser = Some(user.username.clone());
            record.usermail = Some(attributes.email.clone());
            record.is_super_admin = Some(is_super_admin);
            record.org = Some(OrgContext {
                domain: checked.primary_org.clone().unwrap_or_default(),
                user_perms: checked.user_perms.clone(),
                user_type: checked.user_type_or_default(),
            });
            record.user_type = checked.user_type.clone();
        });
        if committed.is_none() {
            return Err(self.fail_validation(AuthError::Cancelled));
        }

        self.transition(&CycleInput::UserApproved)?;
        self.arm_refresh_timers(&tokens.id_token);
        self.spawn_profile_fetch(attributes.sub.clone(), token);

        let redirect_to = RedirectTarget::ChooseOrganization;
        info!(redirect_to = %redirect_to, is_super_admin, "Code exchange complete");
        Ok(ExchangeOutcome::Approved {
            redirect_to,
            is_super_admin,
        })
    }
}
