//! Request handler module
//!
//! Adapts hyper requests to the resolution engine.

pub mod router;

// Re-export main entry points
pub use router::{handle_request, serve, RequestContext};
