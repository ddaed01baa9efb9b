//! Static asset server
//!
//! Serves a directory of files with configurable HTML handling,
//! not-found fallbacks, header rules and redirect rules.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resolver;
pub mod rules;
pub mod server;
pub mod store;
