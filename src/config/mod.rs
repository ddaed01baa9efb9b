// Configuration module entry point
// Loads settings, compiles asset rules and manages the active snapshot

mod assets;
mod state;
mod types;
mod version;

use std::net::SocketAddr;

use crate::error::SettingsError;

// Re-export public types
pub use assets::AssetConfig;
pub use state::{AppState, Snapshot};
pub use types::{
    AssetSettings, HeaderRule, HeadersConfig, HtmlHandling, LoggingConfig, NotFoundHandling,
    PerformanceConfig, RedirectRule, RedirectsConfig, ServerConfig, Settings,
};
pub use version::{check_version, Generation, SchemaVersion, HEADERS_VERSION, REDIRECTS_VERSION};

/// Default settings file, looked up in the working directory
pub const DEFAULT_CONFIG_PATH: &str = "assetgate.toml";

/// Prefix of environment variable overrides, e.g. `ASSETGATE__SERVER__PORT`
const ENV_PREFIX: &str = "ASSETGATE";

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Settings {
    /// Load settings from a TOML file (optional), then the environment
    pub fn load_from(config_path: &str) -> Result<Self, SettingsError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false));
        Self::finish(builder)
    }

    /// Load settings from an in-memory TOML document, then the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, SettingsError> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::finish(builder)
    }

    fn finish(builder: Builder) -> Result<Self, SettingsError> {
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.read_timeout", 30)?
            .set_default("assets.directory", "public")?
            .set_default("assets.html_handling", "auto-trailing-slash")?
            .set_default("assets.not_found_handling", "none")?
            .set_default("assets.serve_directly", true)?
            .set_default("assets.headers.version", i64::from(HEADERS_VERSION))?
            .set_default("assets.redirects.version", i64::from(REDIRECTS_VERSION))?
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|source| SettingsError::Address { addr, source })
    }
}
