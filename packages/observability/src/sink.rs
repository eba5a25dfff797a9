//! JSONL file sink and subscriber installation.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::json_layer::JsonlLayer;
use crate::LogConfig;

pub(crate) fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".studio/logs/dev.jsonl"))
}

/// Append-only handle to a shared log file.
///
/// Events are buffered per line and land with a single `write_all` on an
/// `O_APPEND` file, so lines from concurrent processes do not interleave.
#[derive(Clone)]
pub struct JsonlFile {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl JsonlFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Per-event writer handed out by [`JsonlFile`].
pub struct LineWriter {
    target: JsonlFile,
    pending: Vec<u8>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let bytes = std::mem::take(&mut self.pending);
        self.target.file.lock().write_all(&bytes)
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for JsonlFile {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            target: self.clone(),
            pending: Vec::new(),
        }
    }
}

pub(crate) fn install(config: &LogConfig) -> bool {
    let path = config.resolved_file();
    let file = match &path {
        Some(path) => JsonlFile::open(path).map_err(|e| format!("{}: {e}", path.display())),
        None => Err("no home directory".to_string()),
    };

    let jsonl = file
        .as_ref()
        .ok()
        .map(|f| JsonlLayer::new(&config.service, config.mode, f.clone()));
    let stderr = (config.stderr || jsonl.is_none()).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
    });

    let filter = config.env_filter();
    let installed = tracing_subscriber::registry()
        .with(jsonl.map(|layer| layer.with_filter(filter.clone())))
        .with(stderr.map(|layer| layer.with_filter(filter)))
        .try_init()
        .is_ok();

    if installed {
        match &file {
            Ok(f) => tracing::debug!(log_path = %f.path().display(), "logging initialized"),
            Err(error) => tracing::warn!(%error, "log file unavailable, using stderr"),
        }
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn append_line(file: &JsonlFile, line: &str) {
        let mut writer = file.make_writer();
        writeln!(writer, "{line}").unwrap();
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/log.jsonl");

        let file = JsonlFile::open(&path).unwrap();
        assert_eq!(file.path(), path);
        assert!(path.exists());
    }

    #[test]
    fn test_writer_appends_whole_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        let file = JsonlFile::open(&path).unwrap();

        append_line(&file, "{\"n\":1}");
        {
            let mut writer = file.make_writer();
            writer.write_all(b"{\"n\":").unwrap();
            writer.write_all(b"2}\n").unwrap();
        }

        let reopened = JsonlFile::open(&path).unwrap();
        append_line(&reopened, "{\"n\":3}");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");
    }

    #[test]
    fn test_default_path_under_studio_dir() {
        if let Some(path) = default_log_path() {
            assert!(path.ends_with(".studio/logs/dev.jsonl"));
        }
    }
}
