//! Directory-backed asset store
//!
//! The index is built once by walking the asset directory (at startup and on
//! every reload). Bodies are read from disk on demand.

use hyper::body::Bytes;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use super::{Asset, AssetKey, AssetPath, AssetStore};
use crate::error::AssetStoreError;
use crate::http::cache;
use crate::logger;

#[derive(Debug, Default)]
struct Index {
    paths: HashMap<AssetPath, AssetKey>,
    /// One file on disk per distinct content
    files: HashMap<AssetKey, PathBuf>,
}

/// Asset store serving files below one directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    index: Arc<Index>,
}

impl DirectoryStore {
    /// Walk `root` and index every regular file below it
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, AssetStoreError> {
        let root = fs::canonicalize(root.as_ref())
            .await
            .map_err(|source| AssetStoreError::Io {
                path: root.as_ref().display().to_string(),
                source,
            })?;
        if !root.is_dir() {
            return Err(AssetStoreError::Index(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let mut index = Index::default();
        let mut pending = vec![root.clone()];
        let mut visited = HashSet::from([root.clone()]);

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(|source| AssetStoreError::Io {
                path: dir.display().to_string(),
                source,
            })?;

            while let Some(entry) = entries.next_entry().await.map_err(|source| {
                AssetStoreError::Io {
                    path: dir.display().to_string(),
                    source,
                }
            })? {
                let path = entry.path();
                // Follow symlinks, but never out of the root
                let Ok(canonical) = fs::canonicalize(&path).await else {
                    continue;
                };
                if !canonical.starts_with(&root) {
                    logger::log_warning(&format!(
                        "Skipping asset outside of root: {} -> {}",
                        path.display(),
                        canonical.display()
                    ));
                    continue;
                }

                let metadata = fs::metadata(&canonical).await.map_err(|source| {
                    AssetStoreError::Io {
                        path: canonical.display().to_string(),
                        source,
                    }
                })?;
                if metadata.is_dir() {
                    // Symlinked directories can loop back on themselves
                    if visited.insert(canonical) {
                        pending.push(path);
                    }
                } else if metadata.is_file() {
                    index_file(&mut index, &root, &path, canonical).await?;
                }
            }
        }

        logger::log_debug(&format!(
            "Indexed {} assets from {}",
            index.paths.len(),
            root.display()
        ));

        Ok(Self {
            root,
            index: Arc::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.index.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.paths.is_empty()
    }
}

async fn index_file(
    index: &mut Index,
    root: &Path,
    path: &Path,
    canonical: PathBuf,
) -> Result<(), AssetStoreError> {
    let Some(asset_path) = to_asset_path(root, path) else {
        logger::log_warning(&format!(
            "Skipping asset with non UTF-8 name: {}",
            path.display()
        ));
        return Ok(());
    };

    let content = fs::read(&canonical).await.map_err(|source| AssetStoreError::Io {
        path: canonical.display().to_string(),
        source,
    })?;
    let key = AssetKey::new(cache::generate_etag(&content));

    index.paths.insert(asset_path, key.clone());
    index.files.entry(key).or_insert(canonical);
    Ok(())
}

/// `root/a/b.html` becomes `/a/b.html`
fn to_asset_path(root: &Path, path: &Path) -> Option<AssetPath> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        key.push('/');
        key.push_str(component.as_os_str().to_str()?);
    }
    Some(AssetPath::from_normalized(key))
}

impl AssetStore for DirectoryStore {
    async fn exists(&self, path: &AssetPath) -> Result<Option<AssetKey>, AssetStoreError> {
        Ok(self.index.paths.get(path).cloned())
    }

    async fn fetch(&self, key: &AssetKey) -> Result<Option<Asset>, AssetStoreError> {
        let Some(file_path) = self.index.files.get(key) else {
            return Ok(None);
        };

        match fs::read(file_path).await {
            Ok(content) => Ok(Some(Asset {
                body: Bytes::from(content),
            })),
            // Removed since the index was built
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AssetStoreError::Io {
                path: file_path.display().to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    async fn key_of(store: &DirectoryStore, path: &str) -> Option<AssetKey> {
        store.exists(&AssetPath::parse(path).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_index_and_fetch() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "index.html", "<h1>home</h1>");
        write(dir.path(), "blog/post/index.html", "<p>post</p>");
        write(dir.path(), "css/site.css", "body{}");

        let store = DirectoryStore::open(dir.path()).await.unwrap();
        assert_eq!(store.len(), 3);

        let key = key_of(&store, "/blog/post/index.html").await.unwrap();
        let asset = store.fetch(&key).await.unwrap().unwrap();
        assert_eq!(asset.body, Bytes::from("<p>post</p>"));

        let key = key_of(&store, "/css/site.css").await.unwrap();
        let asset = store.fetch(&key).await.unwrap().unwrap();
        assert_eq!(asset.body, Bytes::from("body{}"));

        assert!(key_of(&store, "/blog").await.is_none());
        assert!(key_of(&store, "/missing.html").await.is_none());
    }

    #[tokio::test]
    async fn test_identical_files_share_one_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.css", "same");
        write(dir.path(), "b.js", "same");

        let store = DirectoryStore::open(dir.path()).await.unwrap();
        let a = key_of(&store, "/a.css").await.unwrap();
        let b = key_of(&store, "/b.js").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.fetch(&b).await.unwrap().unwrap().body, Bytes::from("same"));
    }

    #[tokio::test]
    async fn test_deleted_file_fetches_none() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "gone.txt", "soon");

        let store = DirectoryStore::open(dir.path()).await.unwrap();
        let key = key_of(&store, "/gone.txt").await.unwrap();
        std::fs::remove_file(dir.path().join("gone.txt")).unwrap();

        assert!(store.fetch(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DirectoryStore::open(dir.path().join("nope")).await;
        assert!(matches!(result, Err(AssetStoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_file_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "file.txt", "not a dir");
        let result = DirectoryStore::open(dir.path().join("file.txt")).await;
        assert!(matches!(result, Err(AssetStoreError::Index(_))));
    }
}
