//! `not_found_handling` fallbacks, consulted after html handling found nothing

use super::{ResolutionOutcome, ResolvedAsset};
use crate::config::NotFoundHandling;
use crate::error::AssetStoreError;
use crate::store::{AssetPath, AssetStore};

const SPA_ENTRY: &str = "/index.html";
const NOT_FOUND_PAGE: &str = "404.html";

pub async fn resolve_not_found<S: AssetStore>(
    store: &S,
    handling: NotFoundHandling,
    path: &AssetPath,
) -> Result<ResolutionOutcome, AssetStoreError> {
    match handling {
        NotFoundHandling::SinglePageApplication => Ok(lookup(store, SPA_ENTRY)
            .await?
            .map_or(ResolutionOutcome::NotFound(None), ResolutionOutcome::Found)),
        NotFoundHandling::NotFoundPage => {
            Ok(ResolutionOutcome::NotFound(nearest_not_found_page(store, path).await?))
        }
        NotFoundHandling::None => Ok(ResolutionOutcome::NotFound(None)),
    }
}

/// Walk from the request's directory up to the root looking for `404.html`
async fn nearest_not_found_page<S: AssetStore>(
    store: &S,
    path: &AssetPath,
) -> Result<Option<ResolvedAsset>, AssetStoreError> {
    let mut dir = path.as_str();
    while let Some(slash) = dir.rfind('/') {
        dir = &dir[..slash];
        if let Some(page) = lookup(store, &format!("{dir}/{NOT_FOUND_PAGE}")).await? {
            return Ok(Some(page));
        }
    }
    Ok(None)
}

async fn lookup<S: AssetStore>(
    store: &S,
    path: &str,
) -> Result<Option<ResolvedAsset>, AssetStoreError> {
    let path = AssetPath::from_normalized(path);
    let key = store.exists(&path).await?;
    Ok(key.map(|key| ResolvedAsset { path, key }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn outcome(store: &MemoryStore, handling: NotFoundHandling, path: &str) -> ResolutionOutcome {
        resolve_not_found(store, handling, &AssetPath::parse(path).unwrap())
            .await
            .unwrap()
    }

    fn page_path(outcome: &ResolutionOutcome) -> Option<&str> {
        match outcome {
            ResolutionOutcome::NotFound(Some(page)) => Some(page.path.as_str()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_nearest_404_page_wins() {
        let store = MemoryStore::new()
            .with_asset("/404.html", "root missing")
            .with_asset("/docs/404.html", "docs missing");

        let found = outcome(&store, NotFoundHandling::NotFoundPage, "/docs/api/v1/x").await;
        assert_eq!(page_path(&found), Some("/docs/404.html"));

        let found = outcome(&store, NotFoundHandling::NotFoundPage, "/blog/post").await;
        assert_eq!(page_path(&found), Some("/404.html"));

        let found = outcome(&store, NotFoundHandling::NotFoundPage, "/docs/").await;
        assert_eq!(page_path(&found), Some("/docs/404.html"));
    }

    #[tokio::test]
    async fn test_no_404_page_anywhere() {
        let store = MemoryStore::new().with_asset("/index.html", "home");
        let found = outcome(&store, NotFoundHandling::NotFoundPage, "/a/b").await;
        assert_eq!(found, ResolutionOutcome::NotFound(None));
    }

    #[tokio::test]
    async fn test_single_page_application() {
        let store = MemoryStore::new().with_asset("/index.html", "app");
        let found = outcome(&store, NotFoundHandling::SinglePageApplication, "/deep/route").await;
        assert!(matches!(found, ResolutionOutcome::Found(ref a) if a.path.as_str() == "/index.html"));

        let empty = MemoryStore::new();
        let found = outcome(&empty, NotFoundHandling::SinglePageApplication, "/deep/route").await;
        assert_eq!(found, ResolutionOutcome::NotFound(None));
    }

    #[tokio::test]
    async fn test_none_handling() {
        let store = MemoryStore::new().with_asset("/404.html", "missing");
        let found = outcome(&store, NotFoundHandling::None, "/x").await;
        assert_eq!(found, ResolutionOutcome::NotFound(None));
    }
}
