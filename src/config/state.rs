// Application state module
// Holds the active snapshot and swaps it atomically on reload

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::assets::AssetConfig;
use super::types::{AssetSettings, Settings};
use super::version::Generation;
use crate::error::SettingsError;
use crate::store::DirectoryStore;

/// Everything a request needs, frozen at load time
#[derive(Debug)]
pub struct Snapshot {
    pub generation: u64,
    pub assets: AssetConfig,
    pub store: DirectoryStore,
}

impl Snapshot {
    /// Index the asset directory and compile the rules
    pub async fn load(settings: &AssetSettings, generation: u64) -> Result<Self, SettingsError> {
        let store = DirectoryStore::open(&settings.directory).await?;
        Ok(Self {
            generation,
            assets: AssetConfig::compile(settings),
            store,
        })
    }
}

/// Application state
pub struct AppState {
    pub settings: Settings,
    config_path: String,
    snapshot: ArcSwap<Snapshot>,
    generation: Generation,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    /// Build the initial snapshot (generation 1)
    pub async fn new(settings: Settings, config_path: &str) -> Result<Self, SettingsError> {
        let generation = Generation::new();
        let (current, _) = generation.get();
        let snapshot = Snapshot::load(&settings.assets, current).await?;

        Ok(Self {
            cached_access_log: AtomicBool::new(settings.logging.access_log),
            settings,
            config_path: config_path.to_string(),
            snapshot: ArcSwap::from_pointee(snapshot),
            generation,
        })
    }

    /// The snapshot in effect right now; callers keep it for the whole request
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Re-read settings and assets, then swap in a new snapshot
    ///
    /// On failure the current snapshot stays active. Listener and logging
    /// settings are fixed at startup; only the `assets` section and the
    /// access log switch are reloaded.
    pub async fn reload(&self) -> Result<Arc<Snapshot>, SettingsError> {
        let settings = Settings::load_from(&self.config_path)?;
        let (current, _) = self.generation.get();
        let snapshot = Arc::new(Snapshot::load(&settings.assets, current + 1).await?);

        self.generation.increment();
        self.snapshot.store(Arc::clone(&snapshot));
        self.cached_access_log
            .store(settings.logging.access_log, Ordering::Relaxed);
        Ok(snapshot)
    }

    /// Current generation and the time it was loaded (ms since epoch)
    pub fn generation(&self) -> (u64, u64) {
        self.generation.get()
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AssetPath, AssetStore};
    use std::fs;
    use std::path::Path;

    fn write_config(dir: &Path, assets: &Path, html_handling: &str) -> String {
        let path = dir.join("assetgate.toml");
        fs::write(
            &path,
            format!(
                "[assets]\ndirectory = {:?}\nhtml_handling = \"{html_handling}\"\n",
                assets.display().to_string()
            ),
        )
        .unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("public");
        fs::create_dir(&assets).unwrap();
        fs::write(assets.join("index.html"), "v1").unwrap();

        let config_path = write_config(dir.path(), &assets, "auto-trailing-slash");
        let settings = Settings::load_from(&config_path).unwrap();
        let state = AppState::new(settings, &config_path).await.unwrap();

        let before = state.snapshot();
        assert_eq!(before.generation, 1);
        assert_eq!(before.store.len(), 1);

        fs::write(assets.join("about.html"), "about").unwrap();
        write_config(dir.path(), &assets, "none");
        let after = state.reload().await.unwrap();

        assert_eq!(after.generation, 2);
        assert_eq!(state.generation().0, 2);
        assert_eq!(after.store.len(), 2);
        assert_eq!(after.assets.html_handling, crate::config::HtmlHandling::None);

        // The old snapshot is untouched for in-flight requests
        assert_eq!(before.store.len(), 1);
        let about = AssetPath::parse("/about.html").unwrap();
        assert!(before.store.exists(&about).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("public");
        fs::create_dir(&assets).unwrap();

        let config_path = write_config(dir.path(), &assets, "none");
        let settings = Settings::load_from(&config_path).unwrap();
        let state = AppState::new(settings, &config_path).await.unwrap();

        write_config(dir.path(), &dir.path().join("missing"), "none");
        assert!(state.reload().await.is_err());
        assert_eq!(state.snapshot().generation, 1);
        assert_eq!(state.generation().0, 1);
    }
}
