//! On-disk layout of the session tools.
//!
//! ```text
//! ~/.studio/
//! ├── config.json
//! ├── cookies.txt      session cookie jar
//! └── logs/
//!     └── dev.jsonl
//! ```

use crate::{CoreError, CoreResult};
use std::path::{Path, PathBuf};

const ROOT_DIR_NAME: &str = ".studio";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Use `root` when given, `~/.studio` otherwise.
    pub fn resolve(root: Option<PathBuf>) -> CoreResult<Self> {
        match root {
            Some(root) => Ok(Self::at(root)),
            None => dirs::home_dir()
                .map(|home| Self::at(home.join(ROOT_DIR_NAME)))
                .ok_or_else(|| CoreError::Path("home directory not found".to_string())),
        }
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Stands in for the browser's cookie store between runs.
    pub fn cookie_file(&self) -> PathBuf {
        self.root.join("cookies.txt")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs").join("dev.jsonl")
    }

    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(self.root.join("logs"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_under_root() {
        let paths = Paths::at("/tmp/studio-test");

        assert_eq!(paths.root(), Path::new("/tmp/studio-test"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/studio-test/config.json"));
        assert_eq!(paths.cookie_file(), PathBuf::from("/tmp/studio-test/cookies.txt"));
        assert_eq!(paths.log_file(), PathBuf::from("/tmp/studio-test/logs/dev.jsonl"));
    }

    #[test]
    fn test_resolve_prefers_explicit_root() {
        let paths = Paths::resolve(Some(PathBuf::from("/srv/studio"))).unwrap();
        assert_eq!(paths, Paths::at("/srv/studio"));
    }

    #[test]
    fn test_resolve_defaults_to_home() {
        if let Some(home) = dirs::home_dir() {
            let paths = Paths::resolve(None).unwrap();
            assert_eq!(paths.root(), home.join(".studio"));
        }
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let dir = tempdir().unwrap();
        let paths = Paths::at(dir.path().join("studio"));

        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.root().is_dir());
        assert!(paths.log_file().parent().unwrap().is_dir());
    }
}
