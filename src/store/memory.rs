//! In-memory asset store
//!
//! Useful for embedding and tests: assets are registered up front and
//! keyed by a hash of their content.

use hyper::body::Bytes;
use std::collections::HashMap;

use super::{Asset, AssetKey, AssetPath, AssetStore};
use crate::error::AssetStoreError;
use crate::http::cache;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    index: HashMap<AssetPath, AssetKey>,
    bodies: HashMap<AssetKey, Asset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an asset under `path`
    #[must_use]
    pub fn with_asset(mut self, path: &str, body: impl Into<Bytes>) -> Self {
        self.insert(path, body);
        self
    }

    pub fn insert(&mut self, path: &str, body: impl Into<Bytes>) -> AssetKey {
        let body = body.into();
        let key = AssetKey::new(cache::generate_etag(&body));

        self.index
            .insert(AssetPath::from_normalized(path), key.clone());
        self.bodies.insert(key.clone(), Asset { body });
        key
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl AssetStore for MemoryStore {
    async fn exists(&self, path: &AssetPath) -> Result<Option<AssetKey>, AssetStoreError> {
        Ok(self.index.get(path).cloned())
    }

    async fn fetch(&self, key: &AssetKey) -> Result<Option<Asset>, AssetStoreError> {
        Ok(self.bodies.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exists_and_fetch() {
        let store = MemoryStore::new()
            .with_asset("/index.html", "<h1>home</h1>")
            .with_asset("/app.js", "console.log(1)");
        assert_eq!(store.len(), 2);

        let key = store
            .exists(&AssetPath::parse("/index.html").unwrap())
            .await
            .unwrap()
            .unwrap();
        let asset = store.fetch(&key).await.unwrap().unwrap();
        assert_eq!(asset.body, Bytes::from("<h1>home</h1>"));

        assert!(store
            .exists(&AssetPath::parse("/missing").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_same_content_shares_key() {
        let mut store = MemoryStore::new();
        let a = store.insert("/a.html", "same");
        let b = store.insert("/b/index.html", "same");
        assert_eq!(a, b);
    }
}
