//! Path resolver module
//!
//! Decides which asset answers a request, in priority order:
//!
//! 1. method gating
//! 2. path normalization (traversal and bad encodings never reach the store)
//! 3. static redirect rules
//! 4. `html_handling`
//! 5. `not_found_handling`

mod html;
mod not_found;
mod redirects;

pub use html::Resolution;
pub use redirects::{compile_redirect_rules, RedirectInstruction, RedirectRules};

use hyper::{Method, StatusCode};

use crate::config::AssetConfig;
use crate::error::AssetStoreError;
use crate::logger;
use crate::store::{AssetKey, AssetPath, AssetStore};

/// Asset chosen to answer a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub path: AssetPath,
    pub key: AssetKey,
}

/// Redirect flavor, mapped one to one onto a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Permanent,
    Found,
    SeeOther,
    Temporary,
    PermanentRedirect,
}

impl RedirectKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Permanent => StatusCode::MOVED_PERMANENTLY,
            Self::Found => StatusCode::FOUND,
            Self::SeeOther => StatusCode::SEE_OTHER,
            Self::Temporary => StatusCode::TEMPORARY_REDIRECT,
            Self::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }

    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            301 => Some(Self::Permanent),
            302 => Some(Self::Found),
            303 => Some(Self::SeeOther),
            307 => Some(Self::Temporary),
            308 => Some(Self::PermanentRedirect),
            _ => None,
        }
    }
}

/// Result of resolving one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Found(ResolvedAsset),
    RedirectTo { target: String, kind: RedirectKind },
    /// Carries the `404.html` page located for the request, if any
    NotFound(Option<ResolvedAsset>),
    MethodNotAllowed,
}

/// The parts of a request the resolver looks at
#[derive(Debug, Clone, Copy)]
pub struct RequestTarget<'a> {
    pub method: &'a Method,
    /// Raw (still percent-encoded) request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub host: Option<&'a str>,
}

/// Resolve a request against the asset store
///
/// Only store failures are errors; everything else is an outcome.
pub async fn resolve<S: AssetStore>(
    request: &RequestTarget<'_>,
    config: &AssetConfig,
    store: &S,
) -> Result<ResolutionOutcome, AssetStoreError> {
    if request.method != Method::GET && request.method != Method::HEAD {
        return Ok(if config.serve_directly {
            ResolutionOutcome::MethodNotAllowed
        } else {
            ResolutionOutcome::NotFound(None)
        });
    }

    let path = match AssetPath::parse(request.path) {
        Ok(path) => path,
        Err(rejection) => {
            logger::log_warning(&format!("Rejected request path: {rejection}"));
            return Ok(ResolutionOutcome::NotFound(None));
        }
    };

    if let Some((target, kind)) =
        redirects::find_redirect(&config.redirect_rules, request.host, request.path, request.query)
    {
        return Ok(ResolutionOutcome::RedirectTo { target, kind });
    }

    match html::resolve_html(store, config.html_handling, &path, true).await? {
        Some(Resolution::Asset(asset)) => Ok(ResolutionOutcome::Found(asset)),
        Some(Resolution::Redirect(target)) => Ok(ResolutionOutcome::RedirectTo {
            target: redirects::with_query(target.encoded(), request.query),
            kind: RedirectKind::Permanent,
        }),
        None => not_found::resolve_not_found(store, config.not_found_handling, &path).await,
    }
}
