//! Cookie jar trait definitions.

use crate::StorageResult;
use cookie::Cookie;

/// Trait for cookie jar backends.
///
/// A jar plays the role of the browser's cookie store: it holds cookies by
/// name, and a write replaces the whole cookie.
pub trait CookieJar: Send + Sync {
    /// Look up a cookie by name
    fn get(&self, name: &str) -> StorageResult<Option<Cookie<'static>>>;

    /// Store a cookie, replacing any cookie with the same name
    fn set(&self, cookie: Cookie<'static>) -> StorageResult<()>;

    /// Remove a cookie (the equivalent of expiring it immediately)
    fn remove(&self, name: &str) -> StorageResult<bool>;

    /// Check if a cookie exists
    fn has(&self, name: &str) -> StorageResult<bool> {
        Ok(self.get(name)?.is_some())
    }
}
