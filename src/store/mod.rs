//! Asset store module
//!
//! The resolver only needs two calls from the store: an existence probe that
//! maps a path to a content key, and a body fetch by key. Both are single-shot
//! async calls; retries belong to the store implementation, not the engine.

mod directory;
mod memory;
mod path;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use path::AssetPath;

use hyper::body::Bytes;
use std::future::Future;

use crate::error::AssetStoreError;

/// Opaque content key of an asset, doubling as its `ETag`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey(String);

impl AssetKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Asset body
///
/// Several paths may share one key, so the content type is not stored here;
/// it follows the extension of the path that was requested.
#[derive(Debug, Clone)]
pub struct Asset {
    pub body: Bytes,
}

/// Content-addressed asset store
pub trait AssetStore: Send + Sync {
    /// Look up a path in the asset index
    fn exists(
        &self,
        path: &AssetPath,
    ) -> impl Future<Output = Result<Option<AssetKey>, AssetStoreError>> + Send;

    /// Fetch the body for a key returned by `exists`
    fn fetch(
        &self,
        key: &AssetKey,
    ) -> impl Future<Output = Result<Option<Asset>, AssetStoreError>> + Send;
}
