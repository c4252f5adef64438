//! Asset loaders
//!
//! A loader turns an asset key into a freshly constructed asset. The cache
//! calls its loader at most once per key while that key stays cached.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::source::{FileSource, SourceError};

/// Error during asset loading
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Failed to parse {key}: {message}")]
    Parse { key: String, message: String },

    #[error("{0}")]
    Custom(String),
}

/// Result type for asset loading
pub type LoadResult<T> = Result<T, LoadError>;

/// Produces assets of type `A` from keys
#[async_trait]
pub trait AssetLoader<A>: Send + Sync {
    /// Load the asset named by `key`
    async fn load(&self, key: &str) -> LoadResult<A>;
}

/// Loads JSON-encoded assets through a [`FileSource`], using the key as the path
#[derive(Clone)]
pub struct JsonLoader {
    source: Arc<dyn FileSource>,
}

impl JsonLoader {
    /// Create a loader reading from `source`
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self { source }
    }

    /// The underlying source
    pub fn source(&self) -> &Arc<dyn FileSource> {
        &self.source
    }
}

#[async_trait]
impl<A> AssetLoader<A> for JsonLoader
where
    A: DeserializeOwned + Send + 'static,
{
    async fn load(&self, key: &str) -> LoadResult<A> {
        let text = self.source.read_file(key).await?;
        serde_json::from_str(&text).map_err(|e| LoadError::Parse {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
