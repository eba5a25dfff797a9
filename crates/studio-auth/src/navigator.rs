//! Where redirects and the auth error flag go.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message recorded for the login page after a failed flow.
pub const AUTH_ERROR_MESSAGE: &str = "Error authenticating";

/// Pages the session flows can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedirectTarget {
    /// `/login`, after any auth failure.
    Login,
    /// `/choose-organization`, after a successful code exchange.
    ChooseOrganization,
    /// `/dashboard`, after a successful resume.
    Dashboard,
    /// `/`, after logout.
    Home,
}

impl RedirectTarget {
    pub fn path(&self) -> &'static str {
        match self {
            RedirectTarget::Login => "/login",
            RedirectTarget::ChooseOrganization => "/choose-organization",
            RedirectTarget::Dashboard => "/dashboard",
            RedirectTarget::Home => "/",
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Host navigation seam.
pub trait Navigator: Send + Sync {
    /// Navigate away from the current page.
    fn redirect(&self, target: RedirectTarget);

    /// Record a message for the next page to surface.
    fn flag_auth_error(&self, message: &str);
}

#[derive(Debug, Default)]
struct Recorded {
    redirects: Vec<RedirectTarget>,
    auth_error: Option<String>,
}

/// Navigator that records what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    recorded: Mutex<Recorded>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<RedirectTarget> {
        self.recorded.lock().redirects.clone()
    }

    pub fn last_redirect(&self) -> Option<RedirectTarget> {
        self.recorded.lock().redirects.last().copied()
    }

    pub fn auth_error(&self) -> Option<String> {
        self.recorded.lock().auth_error.clone()
    }

    /// Read and remove the auth error flag.
    pub fn take_auth_error(&self) -> Option<String> {
        self.recorded.lock().auth_error.take()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, target: RedirectTarget) {
        tracing::info!(redirect_to = %target, "Redirecting");
        self.recorded.lock().redirects.push(target);
    }

    fn flag_auth_error(&self, message: &str) {
        self.recorded.lock().auth_error = Some(message.to_string());
    }
}
