//! Refresh-cycle state machine using rust-fsm.
//!
//! Every refresh and every code exchange walks this machine once. Cycles are
//! serialized by the session manager, so the machine never sees two at a time.
//!
//! ## State Diagram
//!
//! ```text
//!            ┌──────────────┐
//!            │     Idle     │ (initial)
//!            └──────┬───────┘
//!   RefreshStarted  │   CodeReceived
//!        ┌──────────┴──────────┐
//!        ▼                     ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │ RequestingTokens │  │  ExchangingCode  │
//! └────────┬─────────┘  └────────┬─────────┘
//!          │ TokensIssued        │ TokensIssued
//!          └──────────┬──────────┘
//!                     ▼             TokenRequestFailed
//!          ┌──────────────────┐    (from either) ──► SignedOut
//!          │  ValidatingUser  │
//!          └────────┬─────────┘
//!   UserApproved    │    UserRejected ──► Idle
//!                   │    ValidationFailed ──► SignedOut
//!                   ▼
//!          ┌──────────────────┐
//!          │      Active      │ ── RefreshStarted / CodeReceived ──► (next cycle)
//!          └──────────────────┘
//!
//!   Idle | Active | SignedOut ── SessionCleared ──► SignedOut
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub refresh_cycle(Idle)

    Idle => {
        RefreshStarted => RequestingTokens,
        CodeReceived => ExchangingCode,
        SessionCleared => SignedOut
    },
    RequestingTokens => {
        TokensIssued => ValidatingUser,
        TokenRequestFailed => SignedOut
    },
    ExchangingCode => {
        TokensIssued => ValidatingUser,
        TokenRequestFailed => SignedOut
    },
    ValidatingUser => {
        UserApproved => Active,
        // Backend answered but withheld approval; nothing was persisted
        UserRejected => Idle,
        ValidationFailed => SignedOut
    },
    Active => {
        RefreshStarted => RequestingTokens,
        CodeReceived => ExchangingCode,
        SessionCleared => SignedOut
    },
    SignedOut => {
        RefreshStarted => RequestingTokens,
        CodeReceived => ExchangingCode,
        SessionCleared => SignedOut
    }
}

pub use refresh_cycle::Input as CycleInput;
pub use refresh_cycle::State as CycleState;
pub use refresh_cycle::StateMachine as CycleMachine;

/// Session state as reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No cycle has completed yet.
    Idle,
    /// Trading the refresh token for new tokens.
    RequestingTokens,
    /// Trading an authorization code for tokens.
    ExchangingCode,
    /// Re-deriving permissions with the backend.
    ValidatingUser,
    /// Tokens and permissions are current.
    Active,
    /// The session was cleared.
    SignedOut,
}

impl AuthState {
    /// Returns true if the last cycle completed and was approved.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Active)
    }

    /// Returns true while a cycle is in flight.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::RequestingTokens | AuthState::ExchangingCode | AuthState::ValidatingUser
        )
    }
}

impl From<&CycleState> for AuthState {
    fn from(state: &CycleState) -> Self {
        match state {
            CycleState::Idle => AuthState::Idle,
            CycleState::RequestingTokens => AuthState::RequestingTokens,
            CycleState::ExchangingCode => AuthState::ExchangingCode,
            CycleState::ValidatingUser => AuthState::ValidatingUser,
            CycleState::Active => AuthState::Active,
            CycleState::SignedOut => AuthState::SignedOut,
        }
    }
}

/// Payload for auth state change events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    /// Current auth state.
    pub state: AuthState,
    /// Stored user id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Stored user email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
