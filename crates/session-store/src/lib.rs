//! Cookie-backed session storage for the Studio console.
//!
//! This crate provides:
//! - The flat `SessionRecord` persisted as URL-encoded JSON in one `session` cookie
//! - `CookieJar` backends (in-memory, and a cookie file that survives restarts)
//! - JWT expiry inspection that always fails closed
//! - `RefreshTimers`, the single owner of the smart and fixed-interval refresh timers

mod jar;
pub mod jwt;
mod keys;
mod record;
mod store;
mod timers;
mod traits;

pub use jar::{FileCookieJar, MemoryCookieJar};
pub use keys::SessionKeys;
pub use record::{OrgContext, SessionRecord, UserPerms};
pub use store::SessionStore;
pub use timers::{
    smart_refresh_delay, smart_refresh_delay_with, RefreshTimers, SMART_REFRESH_FLOOR,
    SMART_REFRESH_MARGIN,
};
pub use tokio_util::sync::CancellationToken;
pub use traits::CookieJar;

use thiserror::Error;

/// Name of the cookie that carries the serialized session record.
pub const SESSION_COOKIE_NAME: &str = "session";

/// Error type for cookie jar operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure
    #[error("Cookie jar error: {0}")]
    Jar(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
