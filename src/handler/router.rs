//! Request serving module
//!
//! Entry point for HTTP request processing: resolves the request against the
//! active snapshot, composes headers and builds the response.

use hyper::body::{Body, Incoming};
use hyper::header::{HOST, IF_NONE_MATCH, REFERER, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{AppState, AssetConfig};
use crate::error::AssetStoreError;
use crate::http::{self, cache, headers, mime, response, AssetResponse, Conditional};
use crate::logger::{self, AccessLogEntry};
use crate::resolver::{self, RequestTarget, ResolutionOutcome};
use crate::store::AssetStore;

/// The parts of an HTTP request the engine reads
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub method: &'a Method,
    /// Raw request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub host: Option<&'a str>,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let headers = req.headers();
        let host = headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| req.uri().host());

        Self {
            method: req.method(),
            path: req.uri().path(),
            query: req.uri().query(),
            host,
            headers,
        }
    }

    fn header(&self, name: hyper::header::HeaderName) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    const fn target(&self) -> RequestTarget<'a> {
        RequestTarget {
            method: self.method,
            path: self.path,
            query: self.query,
            host: self.host,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<AssetResponse, Infallible> {
    let started = Instant::now();
    // Held for the whole request, even if a reload swaps in a new one
    let snapshot = state.snapshot();
    // Assets are only read, the request body is never consumed
    let (parts, _body) = req.into_parts();
    let req = Request::from_parts(parts, ());
    let ctx = RequestContext::from_request(&req);

    let (response, asset) = respond(&ctx, &snapshot.assets, &snapshot.store).await;

    if state.access_log_enabled() {
        let mut entry = AccessLogEntry::new(
            remote_addr.ip().to_string(),
            ctx.method.to_string(),
            ctx.path.to_string(),
        );
        entry.query = ctx.query.map(ToString::to_string);
        entry.http_version = http_version(req.version()).to_string();
        entry.host = ctx.host.map(ToString::to_string);
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.referer = ctx.header(REFERER).map(ToString::to_string);
        entry.user_agent = ctx.header(USER_AGENT).map(ToString::to_string);
        entry.asset = asset;
        entry.generation = snapshot.generation;
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.settings.logging.access_log_format);
    }

    Ok(response)
}

/// Serve one request against a compiled configuration and asset store
///
/// Store failures become a bare 500; their message only reaches the error log.
pub async fn serve<S: AssetStore>(
    ctx: &RequestContext<'_>,
    config: &AssetConfig,
    store: &S,
) -> AssetResponse {
    respond(ctx, config, store).await.0
}

/// Like `serve`, also returning the path of the asset that answered
async fn respond<S: AssetStore>(
    ctx: &RequestContext<'_>,
    config: &AssetConfig,
    store: &S,
) -> (AssetResponse, Option<String>) {
    match try_respond(ctx, config, store).await {
        Ok(served) => served,
        Err(e) => {
            logger::log_error(&format!("Asset store failure serving {}: {e}", ctx.path));
            (http::build_500_response(), None)
        }
    }
}

async fn try_respond<S: AssetStore>(
    ctx: &RequestContext<'_>,
    config: &AssetConfig,
    store: &S,
) -> Result<(AssetResponse, Option<String>), AssetStoreError> {
    let outcome = resolver::resolve(&ctx.target(), config, store).await?;
    let conditional = Conditional {
        if_none_match: ctx.header(IF_NONE_MATCH),
        is_head: *ctx.method == Method::HEAD,
    };

    let asset = match &outcome {
        ResolutionOutcome::Found(asset) | ResolutionOutcome::NotFound(Some(asset)) => asset,
        ResolutionOutcome::RedirectTo { .. }
        | ResolutionOutcome::NotFound(None)
        | ResolutionOutcome::MethodNotAllowed => {
            return Ok((http::build(&outcome, HeaderMap::new(), None, conditional), None));
        }
    };

    let matches = config.header_rules.matches_request(ctx.host, ctx.path);
    let cacheable = cache::is_cacheable(ctx.headers);
    let served_path = Some(asset.path.to_string());

    // A 304 carries no body, so skip the fetch
    if response::is_not_modified(&outcome, conditional.if_none_match) {
        let headers = headers::compose(HeaderMap::new(), asset.key.as_str(), None, cacheable, &matches);
        return Ok((http::build(&outcome, headers, None, conditional), served_path));
    }

    let fetched = store
        .fetch(&asset.key)
        .await?
        .ok_or_else(|| AssetStoreError::MissingBody(asset.path.to_string()))?;
    // Identical files share a key, so the type comes from the served path
    let content_type = mime::get_content_type(asset.path.extension());
    let headers = headers::compose(
        HeaderMap::new(),
        asset.key.as_str(),
        Some(content_type),
        cacheable,
        &matches,
    );

    Ok((
        http::build(&outcome, headers, Some(fetched.body), conditional),
        served_path,
    ))
}

fn http_version(version: Version) -> &'static str {
    if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}
