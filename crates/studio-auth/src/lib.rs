//! Session lifecycle for the Studio console.
//!
//! This crate provides:
//! - Authorization code exchange against the identity provider
//! - Silent token refresh with backend re-validation
//! - The bootstrap orchestrator run once per loading-page visit
//! - An explicit FSM for the refresh/exchange cycle

mod auth_fsm;
mod backend;
mod bootstrap;
mod error;
mod exchange;
mod headers;
mod identity;
mod navigator;
mod refresh;
mod session;

pub use auth_fsm::refresh_cycle;
pub use auth_fsm::{AuthState, AuthStateChangedPayload, CycleInput, CycleMachine, CycleState};
pub use backend::{BackendClient, CheckUserRequest, CheckUserResponse, ProfileResponse};
pub use bootstrap::{Bootstrap, BootstrapOutcome, ProjectDraft};
pub use error::{AuthError, AuthResult};
pub use exchange::ExchangeOutcome;
pub use headers::{DefaultHeaders, DOMAIN_HEADER, TOKEN_HEADER};
pub use identity::{GetUserResponse, IdentityAttributes, IdentityProviderClient, TokenSet, UserAttribute};
pub use navigator::{Navigator, RecordingNavigator, RedirectTarget, AUTH_ERROR_MESSAGE};
pub use session::{AuthStateCallback, SessionManager, SessionSnapshot};
