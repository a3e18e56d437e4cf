//! Service-level failures. Missing source files and malformed tables are not
//! errors; only real I/O problems end up here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to archive {from} as {to}: {source}")]
    Archive {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to list {path}: {source}")]
    List { path: PathBuf, source: io::Error },

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServiceError {
    pub fn read(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ServiceError::Read { path, source }
    }

    pub fn write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ServiceError::Write { path, source }
    }

    pub fn list(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| ServiceError::List { path, source }
    }
}
