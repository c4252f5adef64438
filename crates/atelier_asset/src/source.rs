//! File sources
//!
//! The cache and scene persistence never touch the file system directly;
//! they go through a [`FileSource`], so tests and tools can swap in an
//! in-memory store.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

/// File source errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error on {path}: {message}")]
    Io { path: String, message: String },
}

impl SourceError {
    fn from_io(path: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Async text file capability
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the whole file at `path`
    async fn read_file(&self, path: &str) -> Result<String, SourceError>;

    /// Replace the file at `path` with `data`
    async fn write_file(&self, path: &str, data: &str) -> Result<(), SourceError>;
}

/// In-memory file source
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, String>>,
    reads: AtomicU64,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub fn insert(&self, path: impl Into<String>, data: impl Into<String>) {
        self.files.write().insert(path.into(), data.into());
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with_file(self, path: impl Into<String>, data: impl Into<String>) -> Self {
        self.insert(path, data);
        self
    }

    /// Remove a file
    pub fn remove(&self, path: &str) -> Option<String> {
        self.files.write().remove(path)
    }

    /// Current contents of a file
    pub fn get(&self, path: &str) -> Option<String> {
        self.files.read().get(path).cloned()
    }

    /// Number of `read_file` calls so far, including failed ones
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, data: &str) -> Result<(), SourceError> {
        self.insert(path, data);
        Ok(())
    }
}

/// File source rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source resolving paths against `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl FileSource for FsSource {
    async fn read_file(&self, path: &str) -> Result<String, SourceError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| SourceError::from_io(path, e))
    }

    async fn write_file(&self, path: &str, data: &str) -> Result<(), SourceError> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SourceError::from_io(path, e))?;
        }
        tokio::fs::write(&full, data)
            .await
            .map_err(|e| SourceError::from_io(path, e))?;
        log::trace!("wrote {}", full.display());
        Ok(())
    }
}
