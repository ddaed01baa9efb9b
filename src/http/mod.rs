//! HTTP protocol layer module
//!
//! Caching validators, content types, header composition and response
//! building, decoupled from how assets are located.

pub mod cache;
pub mod headers;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use headers::{compose, HeaderInstructions, HeaderRules};
pub use response::{
    build, build_304_response, build_404_response, build_405_response, build_500_response,
    build_redirect_response, AssetResponse, Conditional,
};
