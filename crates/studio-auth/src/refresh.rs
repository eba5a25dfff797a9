//! Silent token refresh.
//!
//! One cycle: refresh grant, backend user check, commit, re-arm timers.
//! A failure at either network step clears the session and sends the user to
//! `/login` with the auth error flag set.

use crate::auth_fsm::CycleInput;
use crate::backend::CheckUserRequest;
use crate::error::{AuthError, AuthResult};
use crate::navigator::RedirectTarget;
use crate::session::{cancellable, SessionManager};
use session_store::CancellationToken;
use std::future::Future;
use std::sync::Weak;
use std::time::Duration;
use tracing::{debug, info, warn};

impl SessionManager {
    /// Run one refresh cycle now.
    pub async fn refresh_tokens(&self) -> AuthResult<()> {
        let token = self.store.cancellation_token();
        self.refresh_tokens_for(token).await
    }

    /// Refresh on behalf of the session `token` belongs to.
    ///
    /// If that session was cleared while this call waited for the cycle lock,
    /// it returns `Cancelled` without touching the store or navigating.
    async fn refresh_tokens_for(&self, token: CancellationToken) -> AuthResult<()> {
        let _cycle = self.cycle.lock().await;
        if token.is_cancelled() {
            debug!("Session cleared while refresh was queued, skipping");
            return Err(AuthError::Cancelled);
        }
        self.transition(&CycleInput::RefreshStarted)?;
        info!("Refreshing session tokens");

        let record = self.store.get();
        let endpoints = self.endpoints();
        let issued = match record.refresh_token.as_deref() {
            Some(refresh_token) => {
                cancellable(&token, self.identity.refresh(&endpoints, refresh_token)).await
            }
            None => Err(AuthError::MissingRefreshToken),
        };
        let tokens = match issued {
            Ok(tokens) => tokens,
            Err(e) => return Err(self.fail_token_request(e, &token)),
        };
        self.transition(&CycleInput::TokensIssued)?;

        let request = CheckUserRequest::for_refresh(&record);
        let checked = match cancellable(&token, self.backend.check_user(&request)).await {
            Ok(checked) => checked,
            Err(e) => return Err(self.fail_validation(e)),
        };

        let committed = self.store.transaction_if_current(&token, |record| {
            record.access_token = Some(tokens.access_token.clone());
            record.id_token = Some(tokens.id_token.clone());
            if let Some(rotated) = &tokens.refresh_token {
                record.refresh_token = Some(rotated.clone());
            }
            record.primary_org = checked.primary_org.clone();
            record.user_type = checked.user_type.clone();
            record.is_super_admin = Some(checked.is_super_admin());
            if let Some(org) = record.org.as_mut() {
                org.user_perms = checked.user_perms.clone();
                org.user_type = checked.user_type_or_default();
            }
        });
        let Some(record) = committed else {
            return Err(self.fail_validation(AuthError::Cancelled));
        };

        self.headers.set_token(&tokens.id_token);
        self.transition(&CycleInput::UserApproved)?;
        self.arm_refresh_timers(&tokens.id_token);
        if let Some(user_id) = record.usercid {
            self.spawn_profile_fetch(user_id, token);
        }

        info!("Session refreshed");
        Ok(())
    }

    /// Resume a stored session on page load.
    ///
    /// Runs only when the record has an `id_token` and the logged-in flag.
    /// Returns `/dashboard` on success. Failures have already cleared the
    /// session and redirected to `/login`.
    pub async fn resume_session(&self) -> Option<RedirectTarget> {
        let record = self.store.get();
        if record.id_token.is_none() || !record.is_logged_in_flag() {
            debug!("No resumable session");
            return None;
        }

        match self.refresh_tokens().await {
            Ok(()) => Some(RedirectTarget::Dashboard),
            Err(e) => {
                warn!(error = %e, "Session resume failed");
                None
            }
        }
    }

    /// Arm the fixed-interval refresh timer, replacing any previous one.
    pub fn schedule_refresh(&self) -> bool {
        let weak = self.weak_self.clone();
        self.store
            .timers()
            .arm_interval(self.refresh.interval(), move || refresh_from_timer(weak.clone()))
    }

    /// Arm the expiry-aware one-shot refresh for `id_token`. Returns the delay.
    pub fn schedule_smart_refresh(&self, id_token: &str) -> Duration {
        let weak = self.weak_self.clone();
        self.store
            .schedule_smart_refresh(id_token, move || refresh_from_timer(weak))
    }

    /// Arm the timers the configured strategy asks for.
    pub(crate) fn arm_refresh_timers(&self, id_token: &str) {
        let strategy = self.refresh.strategy;
        debug!(strategy = ?strategy, "Arming refresh timers");
        if strategy.uses_interval() {
            self.schedule_refresh();
        }
        if strategy.uses_smart() {
            self.schedule_smart_refresh(id_token);
        }
    }
}

/// Timer callback. The session token is taken when the timer fires, not when
/// the cycle lock is acquired.
fn refresh_from_timer(
    manager: Weak<SessionManager>,
) -> impl Future<Output = AuthResult<()>> + Send + 'static {
    let fired = manager.upgrade().map(|manager| {
        let token = manager.store.cancellation_token();
        (manager, token)
    });
    async move {
        let Some((manager, token)) = fired else {
            return Ok(());
        };
        match manager.refresh_tokens_for(token).await {
            Err(e) if e.is_cancelled() => {
                debug!("Timer refresh dropped, session was cleared");
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_fsm::AuthState;
    use crate::navigator::RecordingNavigator;
    use session_store::MemoryCookieJar;
    use std::sync::Arc;
    use studio_config_and_utils::Config;

    fn create_test_manager() -> (Arc<SessionManager>, Arc<RecordingNavigator>) {
        let config = Config::default();
        let store = Arc::new(SessionManager::open_store(
            &config,
            Arc::new(MemoryCookieJar::new()),
        ));
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionManager::new(&config, store, navigator.clone()).unwrap();
        (manager, navigator)
    }

    #[tokio::test]
    async fn test_timer_refresh_queued_behind_logout_is_dropped() {
        let (manager, navigator) = create_test_manager();
        manager.store().set("refresh_token", "r-1");

        let busy = manager.cycle.lock().await;
        let queued = tokio::spawn(refresh_from_timer(Arc::downgrade(&manager)));
        tokio::task::yield_now().await;
        manager.logout();
        drop(busy);

        queued.await.unwrap().unwrap();
        assert_eq!(navigator.redirects(), vec![RedirectTarget::Home]);
        assert!(navigator.auth_error().is_none());
        assert_eq!(manager.state(), AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_timer_refresh_after_manager_dropped_is_noop() {
        let (manager, _) = create_test_manager();
        let weak = Arc::downgrade(&manager);
        drop(manager);

        assert!(refresh_from_timer(weak).await.is_ok());
    }
}
