//! Cookie jar backends.

use crate::{CookieJar, StorageError, StorageResult};
use cookie::Cookie;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// In-memory cookie jar. Cookies live as long as the jar.
#[derive(Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<HashMap<String, Cookie<'static>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> StorageResult<Option<Cookie<'static>>> {
        Ok(self.cookies.lock().get(name).cloned())
    }

    fn set(&self, cookie: Cookie<'static>) -> StorageResult<()> {
        self.cookies.lock().insert(cookie.name().to_string(), cookie);
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<bool> {
        Ok(self.cookies.lock().remove(name).is_some())
    }
}

/// Cookie jar persisted to a file, one `Set-Cookie` style line per cookie.
///
/// Survives process restarts. Writes inside one process are serialized, but
/// two processes sharing the file race: the last writer wins, exactly like two
/// browser tabs sharing one cookie.
pub struct FileCookieJar {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieJar {
    /// Create a jar backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the cookie file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Vec<Cookie<'static>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut cookies = Vec::new();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match Cookie::parse(line.to_string()) {
                Ok(cookie) => cookies.push(cookie),
                Err(e) => debug!(error = %e, "Skipping unparseable cookie line"),
            }
        }
        Ok(cookies)
    }

    fn persist(&self, cookies: &[Cookie<'static>]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = String::new();
        for cookie in cookies {
            content.push_str(&cookie.to_string());
            content.push('\n');
        }

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            StorageError::Jar(format!(
                "Failed to replace cookie file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> StorageResult<Option<Cookie<'static>>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.into_iter().find(|c| c.name() == name))
    }

    fn set(&self, cookie: Cookie<'static>) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let mut cookies = self.load()?;
        cookies.retain(|c| c.name() != cookie.name());
        cookies.push(cookie);
        self.persist(&cookies)
    }

    fn remove(&self, name: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        let mut cookies = self.load()?;
        let before = cookies.len();
        cookies.retain(|c| c.name() != name);
        if cookies.len() == before {
            return Ok(false);
        }
        self.persist(&cookies)?;
        Ok(true)
    }
}
