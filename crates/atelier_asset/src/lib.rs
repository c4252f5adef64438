//! # atelier_asset - Streaming Asset Cache
//!
//! Loading and caching of the heavyweight assets placed into a scene.
//!
//! ## Features
//!
//! - **File sources**: an async read/write capability ([`FileSource`]) with
//!   in-memory and on-disk implementations
//! - **Loaders**: [`AssetLoader`] turns a key into an asset; [`JsonLoader`]
//!   decodes any serde type read through a source
//! - **Streaming cache**: one load per key no matter how many callers ask,
//!   least-recently-used eviction, and an independent copy per checkout
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use atelier_asset::prelude::*;
//!
//! let source = Arc::new(FsSource::new("assets"));
//! let cache: StreamingCache<Model> =
//!     StreamingCache::new(Arc::new(JsonLoader::new(source)), CacheConfig::default());
//!
//! let tree = cache.load("models/tree.json").await?;
//! ```

pub mod cache;
pub mod loader;
pub mod model;
pub mod source;

pub use cache::{CacheConfig, CacheError, CacheStats, CachedAsset, StreamingCache};
pub use loader::{AssetLoader, JsonLoader, LoadError};
pub use model::{Material, Mesh, Model};
pub use source::{FileSource, FsSource, MemorySource, SourceError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheConfig, CacheError, CachedAsset, StreamingCache};
    pub use crate::loader::{AssetLoader, JsonLoader, LoadError};
    pub use crate::model::Model;
    pub use crate::source::{FileSource, FsSource, MemorySource};
}
