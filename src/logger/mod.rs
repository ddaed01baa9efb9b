//! Logger module
//!
//! Provides logging utilities for the asset server including:
//! - Server lifecycle and reload logging
//! - Access logging with multiple formats
//! - Level-filtered error, warning and debug logging
//! - File-based logging support

mod format;
pub mod writer;

pub use format::AccessLogEntry;
pub use writer::Level;

use crate::config::{Settings, Snapshot};
use crate::error::{ConfigurationError, SettingsError};
use std::net::SocketAddr;

/// Level used before `init()` runs (tests, early startup)
const DEFAULT_LEVEL: Level = Level::Info;

/// Initialize the logger with configuration
///
/// Should be called once at application startup. An unknown level falls
/// back to `info` with a warning.
pub fn init(settings: &Settings) -> std::io::Result<()> {
    let level = settings.logging.level.parse().unwrap_or_else(|e: String| {
        eprintln!("[WARN] {e}, using info");
        DEFAULT_LEVEL
    });
    writer::init(
        settings.logging.access_log_file.as_deref(),
        settings.logging.error_log_file.as_deref(),
        level,
    )
}

fn write(level: Level, message: &str) {
    match writer::get() {
        Some(writer) => writer.write(level, message),
        None if level > DEFAULT_LEVEL => {}
        None if level <= Level::Warn => eprintln!("{message}"),
        None => println!("{message}"),
    }
}

/// Write to access log specifically
fn write_access(message: &str) {
    match writer::get() {
        Some(writer) => writer.write_access(message),
        None => println!("{message}"),
    }
}

pub fn log_server_start(addr: &SocketAddr, settings: &Settings, snapshot: &Snapshot) {
    let info = |message: &str| write(Level::Info, message);
    info("======================================");
    info("Asset server started successfully");
    info(&format!("Listening on: http://{addr}"));
    info(&format!("Log level: {}", settings.logging.level));
    if let Some(workers) = settings.server.workers {
        info(&format!("Worker threads: {workers}"));
    }
    info(&format!(
        "Assets: {} files from {}",
        snapshot.store.len(),
        snapshot.store.root().display()
    ));
    info(&format!(
        "html_handling: {:?}, not_found_handling: {:?}",
        snapshot.assets.html_handling, snapshot.assets.not_found_handling
    ));
    info(&format!(
        "Rules: {} header, {} redirect",
        snapshot.assets.header_rules.len(),
        snapshot.assets.redirect_rules.len()
    ));
    if let Some(ref path) = settings.logging.access_log_file {
        info(&format!("Access log: {path}"));
    }
    if let Some(ref path) = settings.logging.error_log_file {
        info(&format!("Error log: {path}"));
    }
    info("======================================\n");
}

pub fn log_connection_error(err: &impl std::fmt::Debug) {
    write(
        Level::Error,
        &format!("[ERROR] Failed to serve connection: {err:?}"),
    );
}

pub fn log_error(message: &str) {
    write(Level::Error, &format!("[ERROR] {message}"));
}

pub fn log_warning(message: &str) {
    write(Level::Warn, &format!("[WARN] {message}"));
}

pub fn log_info(message: &str) {
    write(Level::Info, message);
}

pub fn log_debug(message: &str) {
    write(Level::Debug, &format!("[DEBUG] {message}"));
}

/// A rule section failed to compile and is served as empty
pub fn log_config_error(section: &str, error: &ConfigurationError) {
    write(
        Level::Error,
        &format!("[CONFIG] {section} rules disabled: {error}"),
    );
}

/// A new snapshot is live; `loaded_at_ms` is milliseconds since the epoch
pub fn log_reload(snapshot: &Snapshot, loaded_at_ms: u64) {
    let loaded_at = i64::try_from(loaded_at_ms)
        .ok()
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(|| "-".to_string(), |t| t.with_timezone(&chrono::Local).to_rfc3339());
    write(
        Level::Info,
        &format!(
            "[Reload] Generation {} active since {loaded_at}: {} assets, {} header rules, {} redirect rules",
            snapshot.generation,
            snapshot.store.len(),
            snapshot.assets.header_rules.len(),
            snapshot.assets.redirect_rules.len()
        ),
    );
}

pub fn log_reload_failed(error: &SettingsError) {
    write(
        Level::Error,
        &format!("[Reload] Failed, keeping current snapshot: {error}"),
    );
}

pub fn log_shutdown() {
    write(Level::Info, "\n[Shutdown] Stopped accepting connections");
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    write_access(&entry.format(format));
}
