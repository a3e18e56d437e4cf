//! Flat-file roll-up storage: the append-only combined log and the archive of
//! original uploads, both under `uploads/rollups`.
//!
//! `append` is a read-modify-write of the whole combined log with no locking.
//! Two concurrent appends can lose one of the updates (last write wins).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Layout;
use crate::error::ServiceError;

const SEPARATOR: &str = "\n\n";
const LOG_EXTENSION: &str = ".html";

#[derive(Debug, Clone)]
pub struct RollupStore {
    dir: PathBuf,
    combined: PathBuf,
}

impl RollupStore {
    pub fn new(layout: &Layout) -> Self {
        Self {
            dir: layout.rollups_dir.clone(),
            combined: layout.combined_log.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the rollups directory if needed. Returns `true` when it was created.
    pub fn ensure_dir(&self) -> Result<bool, ServiceError> {
        if self.dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir).map_err(ServiceError::write(&self.dir))?;
        Ok(true)
    }

    /// Add a roll-up to the end of the combined log, separated from earlier
    /// content by a blank line. Returns `true` when the log was created.
    pub fn append(&self, record: &str) -> Result<bool, ServiceError> {
        match self.combined_contents()? {
            Some(existing) => {
                let combined = format!("{}{}{}", existing, SEPARATOR, record);
                fs::write(&self.combined, combined).map_err(ServiceError::write(&self.combined))?;
                Ok(false)
            }
            None => {
                fs::write(&self.combined, record).map_err(ServiceError::write(&self.combined))?;
                Ok(true)
            }
        }
    }

    /// Full combined log, `None` when nothing has been ingested yet
    pub fn combined_contents(&self) -> Result<Option<String>, ServiceError> {
        if !self.combined.exists() {
            return Ok(None);
        }
        read_text(&self.combined).map(Some)
    }

    /// Move an ingested file into the archive as `rollup_<unix millis>.html`
    pub fn archive(&self, source: &Path) -> Result<PathBuf, ServiceError> {
        self.archive_at(source, chrono::Utc::now().timestamp_millis())
    }

    fn archive_at(&self, source: &Path, millis: i64) -> Result<PathBuf, ServiceError> {
        let target = self.dir.join(format!("rollup_{}{}", millis, LOG_EXTENSION));
        fs::rename(source, &target).map_err(|source_err| ServiceError::Archive {
            from: source.to_path_buf(),
            to: target.clone(),
            source: source_err,
        })?;
        Ok(target)
    }

    /// Contents of every `.html` file in the rollups directory, in directory
    /// enumeration order. The combined log lives here too and is included.
    pub fn list_all(&self) -> Result<Vec<String>, ServiceError> {
        let entries = fs::read_dir(&self.dir).map_err(ServiceError::list(&self.dir))?;

        let mut contents = Vec::new();
        for entry in entries {
            let path = entry.map_err(ServiceError::list(&self.dir))?.path();
            let is_log = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(LOG_EXTENSION));
            if !is_log || !path.is_file() {
                continue;
            }
            debug!(file = %path.display(), "reading rollup");
            contents.push(read_text(&path)?);
        }
        Ok(contents)
    }
}

/// Read a file as UTF-8, replacing invalid sequences
pub fn read_text(path: &Path) -> Result<String, ServiceError> {
    let bytes = fs::read(path).map_err(ServiceError::read(path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
