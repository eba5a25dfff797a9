//! Cookie-backed session store.

use crate::jwt;
use crate::record::SessionRecord;
use crate::timers::{smart_refresh_delay_with, RefreshTimers};
use crate::timers::{SMART_REFRESH_FLOOR, SMART_REFRESH_MARGIN};
use crate::{CookieJar, SESSION_COOKIE_NAME};
use cookie::{Cookie, SameSite};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Session store: the whole record lives in one URL-encoded JSON cookie.
///
/// Reads never fail; a missing or corrupt cookie reads as an empty record.
/// Writes are whole-record rewrites serialized by an in-process lock.
pub struct SessionStore {
    jar: Arc<dyn CookieJar>,
    secure: bool,
    write_lock: Mutex<()>,
    cancel: Mutex<CancellationToken>,
    timers: RefreshTimers,
    smart_margin: Duration,
    smart_floor: Duration,
}

impl SessionStore {
    /// Create a store over `jar`. `secure` sets the cookie's `Secure` flag.
    pub fn new(jar: Arc<dyn CookieJar>, secure: bool) -> Self {
        Self {
            jar,
            secure,
            write_lock: Mutex::new(()),
            cancel: Mutex::new(CancellationToken::new()),
            timers: RefreshTimers::new(),
            smart_margin: SMART_REFRESH_MARGIN,
            smart_floor: SMART_REFRESH_FLOOR,
        }
    }

    /// Create a store whose cookie is `Secure` when `origin` is served over HTTPS.
    pub fn for_origin(jar: Arc<dyn CookieJar>, origin: &str) -> Self {
        let secure = origin
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"));
        Self::new(jar, secure)
    }

    /// Override the smart refresh margin and floor.
    pub fn with_smart_refresh_window(mut self, margin: Duration, floor: Duration) -> Self {
        self.smart_margin = margin;
        self.smart_floor = floor;
        self
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The raw record object.
    pub fn raw(&self) -> Map<String, Value> {
        let cookie = match self.jar.get(SESSION_COOKIE_NAME) {
            Ok(Some(cookie)) => cookie,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read session cookie");
                return Map::new();
            }
        };

        let decoded = match urlencoding::decode(cookie.value()) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(error = %e, "Session cookie is not valid percent-encoding");
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&decoded) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("Session cookie does not hold a JSON object");
                Map::new()
            }
            Err(e) => {
                debug!(error = %e, "Session cookie is not valid JSON");
                Map::new()
            }
        }
    }

    /// The typed record.
    pub fn get(&self) -> SessionRecord {
        SessionRecord::from_map(self.raw())
    }

    /// A single key of the record.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.raw().remove(key)
    }

    /// Assign one key, leaving every other key untouched.
    pub fn set<V: Serialize>(&self, key: &str, value: V) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Session value is not serializable, ignoring");
                return;
            }
        };

        let _guard = self.write_lock.lock();
        let mut map = self.raw();
        map.insert(key.to_string(), value);
        self.write(&map);
    }

    /// Read the record, apply `f`, write the result back as one unit.
    pub fn transaction<F>(&self, f: F) -> SessionRecord
    where
        F: FnOnce(&mut SessionRecord),
    {
        let _guard = self.write_lock.lock();
        let mut record = SessionRecord::from_map(self.raw());
        f(&mut record);
        self.write(&record.to_map());
        record
    }

    /// Like [`transaction`](Self::transaction), but only while `token` is the
    /// store's live token. Returns `None` when a `clear()` has happened since
    /// the token was taken; nothing is written in that case.
    pub fn transaction_if_current<F>(&self, token: &CancellationToken, f: F) -> Option<SessionRecord>
    where
        F: FnOnce(&mut SessionRecord),
    {
        let _guard = self.write_lock.lock();
        if token.is_cancelled() {
            debug!("Session was cleared during the flow, dropping write");
            return None;
        }
        let mut record = SessionRecord::from_map(self.raw());
        f(&mut record);
        self.write(&record.to_map());
        Some(record)
    }

    /// Delete the cookie, cancel in-flight flows and both refresh timers.
    pub fn clear(&self) {
        {
            let _guard = self.write_lock.lock();
            let previous = std::mem::replace(&mut *self.cancel.lock(), CancellationToken::new());
            previous.cancel();
            if let Err(e) = self.jar.remove(SESSION_COOKIE_NAME) {
                warn!(error = %e, "Failed to remove session cookie");
            }
        }
        self.timers.cancel_all();
        debug!("Session cleared");
    }

    /// Token that is cancelled by the next `clear()`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    pub fn timers(&self) -> &RefreshTimers {
        &self.timers
    }

    /// Arm the one-shot refresh for `id_token`, replacing any previous one.
    ///
    /// The delay is `max(expiry - now - margin, floor)`; an undecodable token
    /// has expiry 0 and so gets the floor. Returns the delay used.
    pub fn schedule_smart_refresh<F, Fut, E>(&self, id_token: &str, callback: F) -> Duration
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let delay = smart_refresh_delay_with(
            jwt::token_expiry_millis(id_token),
            jwt::now_millis(),
            self.smart_margin,
            self.smart_floor,
        );
        self.timers.arm_smart(delay, callback);
        delay
    }

    /// Whether `token` is expired. Undecodable tokens are expired.
    pub fn is_token_expired(token: &str) -> bool {
        jwt::is_token_expired(token)
    }

    /// Expiry of `token` in epoch milliseconds, 0 when undecodable.
    pub fn token_expiry(token: &str) -> i64 {
        jwt::token_expiry_millis(token)
    }

    /// Build the cookie that would carry `map`.
    pub fn session_cookie(&self, map: &Map<String, Value>) -> Option<Cookie<'static>> {
        let json = serde_json::to_string(map).ok()?;
        Some(
            Cookie::build((SESSION_COOKIE_NAME, urlencoding::encode(&json).into_owned()))
                .path("/")
                .same_site(SameSite::Strict)
                .secure(self.secure)
                .build(),
        )
    }

    fn write(&self, map: &Map<String, Value>) {
        let Some(cookie) = self.session_cookie(map) else {
            warn!("Failed to encode session record");
            return;
        };
        if let Err(e) = self.jar.set(cookie) {
            warn!(error = %e, "Failed to write session cookie");
        }
    }
}
