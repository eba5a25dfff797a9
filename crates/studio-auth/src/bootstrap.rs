//! Loading-page orchestrator.
//!
//! Decides once per visit which flows to drive: site configuration first in
//! remote mode, then session resume, then a code exchange when the entry URL
//! carries `code`.

use crate::exchange::ExchangeOutcome;
use crate::navigator::RedirectTarget;
use crate::session::SessionManager;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use studio_config_and_utils::AppMode;
use tracing::{debug, info, warn};
use url::Url;

/// Blank working object for the project wizard, reset on every bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    pub basic_obj: Map<String, Value>,
    pub vpc_obj: Map<String, Value>,
    pub db_obj: Map<String, Value>,
    pub bastion_obj: Map<String, Value>,
    pub application_obj: Map<String, Value>,
    pub workspace_host_obj: Map<String, Value>,
    pub workspace_s3file_obj: Map<String, Value>,
}

/// What a bootstrap run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapOutcome {
    /// Remote mode only: the site configuration was applied.
    pub site_config_loaded: bool,
    pub resumed: bool,
    /// Set when the entry URL carried a code and the exchange reached the
    /// backend user check.
    pub exchange: Option<ExchangeOutcome>,
    /// The last navigation performed, if any.
    pub redirect: Option<RedirectTarget>,
}

pub struct Bootstrap {
    manager: Arc<SessionManager>,
    mode: AppMode,
    draft: Mutex<ProjectDraft>,
}

impl Bootstrap {
    pub fn new(manager: Arc<SessionManager>, mode: AppMode) -> Self {
        Self {
            manager,
            mode,
            draft: Mutex::new(ProjectDraft::default()),
        }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn draft(&self) -> ProjectDraft {
        self.draft.lock().clone()
    }

    /// Run the loading page for `entry_url`.
    pub async fn run(&self, entry_url: &Url) -> BootstrapOutcome {
        *self.draft.lock() = ProjectDraft::default();
        self.manager.reset_default_headers();

        let mut outcome = BootstrapOutcome::default();

        if self.mode == AppMode::Remote {
            outcome.site_config_loaded = self.manager.load_site_config().await;
        }

        if let Some(target) = self.manager.resume_session().await {
            outcome.resumed = true;
            self.navigate(target, &mut outcome);
        }

        if let Some(code) = authorization_code(entry_url) {
            match self.manager.exchange_code(&code).await {
                Ok(exchanged) => {
                    if let Some(target) = exchanged.redirect_target() {
                        self.navigate(target, &mut outcome);
                    }
                    outcome.exchange = Some(exchanged);
                }
                Err(e) => warn!(error = %e, "Code exchange failed"),
            }
        } else {
            debug!("Entry URL has no authorization code");
        }

        if outcome.redirect.is_none() {
            info!("No flow succeeded, staying on loading view");
        }
        outcome
    }

    fn navigate(&self, target: RedirectTarget, outcome: &mut BootstrapOutcome) {
        self.manager.navigator.redirect(target);
        outcome.redirect = Some(target);
    }
}

/// The non-empty `code` query parameter of `url`.
fn authorization_code(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}
