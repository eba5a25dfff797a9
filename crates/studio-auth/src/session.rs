//! Session manager.
//!
//! Owns the session store, the two HTTP clients, the default headers and the
//! refresh-cycle FSM. The flows live in `refresh.rs` and `exchange.rs`.

use crate::auth_fsm::{AuthState, AuthStateChangedPayload, CycleInput, CycleMachine};
use crate::backend::BackendClient;
use crate::error::{AuthError, AuthResult};
use crate::headers::DefaultHeaders;
use crate::identity::IdentityProviderClient;
use crate::navigator::{Navigator, RedirectTarget, AUTH_ERROR_MESSAGE};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use session_store::{CancellationToken, CookieJar, OrgContext, SessionStore};
use std::future::Future;
use std::sync::{Arc, Weak};
use studio_config_and_utils::{CognitoConfig, Config, OAuthEndpoints, RefreshSettings};
use tracing::{debug, info, warn};

/// Callback invoked on every auth state change.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

/// Read-only view of the stored session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub authenticated: bool,
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub is_super_admin: bool,
    pub org: Option<OrgContext>,
    pub image_url: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

/// Drives the refresh and exchange flows for one session.
pub struct SessionManager {
    pub(crate) store: Arc<SessionStore>,
    pub(crate) identity: IdentityProviderClient,
    pub(crate) backend: BackendClient,
    pub(crate) headers: DefaultHeaders,
    pub(crate) navigator: Arc<dyn Navigator>,
    pub(crate) cognito: CognitoConfig,
    pub(crate) refresh: RefreshSettings,
    site_origin: String,
    endpoints: RwLock<OAuthEndpoints>,
    fsm: Mutex<CycleMachine>,
    state_callbacks: Mutex<Vec<AuthStateCallback>>,
    /// Serializes refresh and exchange cycles.
    pub(crate) cycle: tokio::sync::Mutex<()>,
    pub(crate) weak_self: Weak<SessionManager>,
}

impl SessionManager {
    /// Open the session store for `config` over `jar`.
    pub fn open_store(config: &Config, jar: Arc<dyn CookieJar>) -> SessionStore {
        SessionStore::for_origin(jar, &config.site_origin).with_smart_refresh_window(
            config.refresh.smart_margin(),
            config.refresh.smart_floor(),
        )
    }

    /// Create a manager. Endpoints start from static configuration; remote
    /// deployments replace them with [`load_site_config`](Self::load_site_config).
    pub fn new(
        config: &Config,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Arc<Self>> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        let headers = DefaultHeaders::new(&config.site_origin);
        let identity = IdentityProviderClient::with_client(
            http_client.clone(),
            config.cognito.identity_api_endpoint(),
        );
        let backend =
            BackendClient::with_client(http_client, config.api_base_url()?, headers.clone());

        Ok(Arc::new_cyclic(|weak_self| Self {
            store,
            identity,
            backend,
            headers,
            navigator,
            cognito: config.cognito.clone(),
            refresh: config.refresh.clone(),
            site_origin: config.site_origin.clone(),
            endpoints: RwLock::new(OAuthEndpoints::from_config(&config.cognito)),
            fsm: Mutex::new(CycleMachine::new()),
            state_callbacks: Mutex::new(Vec::new()),
            cycle: tokio::sync::Mutex::new(()),
            weak_self: weak_self.clone(),
        }))
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn headers(&self) -> &DefaultHeaders {
        &self.headers
    }

    /// Current OAuth endpoints.
    pub fn endpoints(&self) -> OAuthEndpoints {
        self.endpoints.read().clone()
    }

    /// Authorize URL for a fresh login.
    pub fn authorize_url(&self) -> String {
        self.endpoints.read().authorize_endpoint.clone()
    }

    pub fn state(&self) -> AuthState {
        AuthState::from(self.fsm.lock().state())
    }

    /// Register a state-change subscriber.
    ///
    /// Callbacks run synchronously on the transitioning task and must not
    /// subscribe from inside the callback.
    pub fn subscribe(&self, callback: AuthStateCallback) {
        self.state_callbacks.lock().push(callback);
    }

    /// Reset `X-Domain` to the site origin.
    pub fn reset_default_headers(&self) {
        self.headers.set_origin(&self.site_origin);
    }

    /// Replace the endpoints with the backend's site configuration.
    ///
    /// Returns false when the fetch fails; the current endpoints stay in place.
    pub async fn load_site_config(&self) -> bool {
        match self.backend.fetch_site_config().await {
            Ok(site) => {
                *self.endpoints.write() = OAuthEndpoints::from_site_config(&site, &self.site_origin);
                info!("Loaded site configuration");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch site config, keeping static endpoints");
                false
            }
        }
    }

    /// Stored `id_token` is present and not expired.
    pub fn is_authenticated(&self) -> bool {
        self.store
            .get()
            .id_token
            .as_deref()
            .is_some_and(|token| !SessionStore::is_token_expired(token))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let record = self.store.get();
        let token_expires_at = record
            .id_token
            .as_deref()
            .map(SessionStore::token_expiry)
            .filter(|ms| *ms > 0)
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        SessionSnapshot {
            state: self.state(),
            authenticated: self.is_authenticated(),
            is_super_admin: record.is_super_admin.unwrap_or(false),
            id: record.usercid,
            name: record.username,
            email: record.usermail,
            user_type: record.user_type,
            org: record.org,
            image_url: record.image_url,
            token_expires_at,
        }
    }

    /// Clear the session and go to `/`.
    pub fn logout(&self) {
        self.store.clear();
        self.headers.clear_token();
        if let Err(e) = self.transition(&CycleInput::SessionCleared) {
            debug!(error = %e, "Logged out during an in-flight cycle");
        }
        info!("Logged out");
        self.navigator.redirect(RedirectTarget::Home);
    }

    /// Confirm a signup with the emailed code.
    pub async fn confirm_otp(&self, email: &str, code: &str) -> AuthResult<()> {
        let client_id = self.endpoints.read().client_id.clone();
        self.identity.confirm_sign_up(&client_id, email, code).await?;
        info!("Signup confirmed");
        Ok(())
    }

    /// Request a new signup code.
    pub async fn resend_otp(&self, email: &str) -> AuthResult<()> {
        let client_id = self.endpoints.read().client_id.clone();
        self.identity
            .resend_confirmation_code(&client_id, email)
            .await?;
        info!("Signup code resent");
        Ok(())
    }

    /// Best-effort org owner notifications.
    pub async fn send_org_owner_confirmation(&self, email: &str, org_id: &str) {
        self.backend.send_org_owner_confirmation(email, org_id).await;
    }

    /// Redirect URI sent with the code exchange.
    pub(crate) fn redirect_uri(&self) -> String {
        if self.cognito.redirect_uri.is_empty() {
            format!("{}/loading", self.site_origin.trim_end_matches('/'))
        } else {
            self.cognito.redirect_uri.clone()
        }
    }

    pub(crate) fn transition(&self, input: &CycleInput) -> AuthResult<AuthState> {
        let (old_state, new_state) = {
            let mut fsm = self.fsm.lock();
            let old_state = AuthState::from(fsm.state());
            fsm.consume(input).map_err(|_| {
                AuthError::InvalidStateTransition(format!(
                    "Cannot apply {:?} in state {:?}",
                    input, old_state
                ))
            })?;
            (old_state, AuthState::from(fsm.state()))
        };

        debug!(from = ?old_state, to = ?new_state, "Auth state transition");

        if old_state != new_state {
            self.notify_state_change(new_state);
        }
        Ok(new_state)
    }

    fn notify_state_change(&self, state: AuthState) {
        let record = self.store.get();
        let callbacks = self.state_callbacks.lock();
        for callback in callbacks.iter() {
            callback(AuthStateChangedPayload {
                state,
                user_id: record.usercid.clone(),
                email: record.usermail.clone(),
            });
        }
    }

    /// Token endpoint step failed. Marks the user logged out, then clears.
    pub(crate) fn fail_token_request(&self, error: AuthError, token: &CancellationToken) -> AuthError {
        let _ = self.transition(&CycleInput::TokenRequestFailed);
        if error.is_cancelled() {
            debug!("Token request abandoned after session clear");
            return error;
        }
        warn!(error = %error, "Token request failed");
        self.store
            .transaction_if_current(token, |record| record.app_user_logged_in = Some(false));
        self.sign_out_with_error();
        error
    }

    /// User validation step failed.
    pub(crate) fn fail_validation(&self, error: AuthError) -> AuthError {
        let _ = self.transition(&CycleInput::ValidationFailed);
        if error.is_cancelled() {
            debug!("User validation abandoned after session clear");
            return error;
        }
        warn!(error = %error, "User validation failed");
        self.sign_out_with_error();
        error
    }

    fn sign_out_with_error(&self) {
        self.store.clear();
        self.headers.clear_token();
        self.navigator.flag_auth_error(AUTH_ERROR_MESSAGE);
        self.navigator.redirect(RedirectTarget::Login);
    }

    /// Fetch the profile image in the background and store it if the session
    /// is still the one that asked.
    pub(crate) fn spawn_profile_fetch(&self, user_id: String, token: CancellationToken) {
        let backend = self.backend.clone();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match cancellable(&token, backend.fetch_profile_image(&user_id)).await {
                Ok(Some(image_url)) => {
                    if store
                        .transaction_if_current(&token, |record| record.image_url = Some(image_url))
                        .is_some()
                    {
                        debug!("Stored profile image");
                    }
                }
                Ok(None) => debug!("No profile image set"),
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(error = %e, "Profile fetch failed"),
            }
        });
    }
}

/// Run `fut` unless `token` is cancelled first.
pub(crate) async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(AuthError::Cancelled),
        result = fut => result,
    }
}
