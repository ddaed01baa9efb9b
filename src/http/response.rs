//! HTTP response building module
//!
//! Maps a resolution outcome plus composed headers onto a concrete response.
//! Every status code the engine can emit is produced here.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_LOCATION, DATE, ETAG, EXPIRES,
    LOCATION, VARY,
};
use hyper::{HeaderMap, Response, StatusCode};

use super::cache;
use crate::resolver::{RedirectKind, ResolutionOutcome};

pub type AssetResponse = Response<Full<Bytes>>;

/// Headers a 304 keeps from the full response
static NOT_MODIFIED_HEADERS: [hyper::header::HeaderName; 6] =
    [CACHE_CONTROL, CONTENT_LOCATION, DATE, ETAG, EXPIRES, VARY];

/// Request-side inputs of the response builder
#[derive(Debug, Clone, Copy, Default)]
pub struct Conditional<'a> {
    pub if_none_match: Option<&'a str>,
    pub is_head: bool,
}

/// Whether a `Found` outcome can be answered with 304
pub fn is_not_modified(outcome: &ResolutionOutcome, if_none_match: Option<&str>) -> bool {
    matches!(
        outcome,
        ResolutionOutcome::Found(asset) if cache::check_etag_match(if_none_match, asset.key.as_str())
    )
}

/// Build the response for a resolution outcome
///
/// `body` is the fetched asset body for `Found` and located 404 pages;
/// it is ignored for every other outcome.
pub fn build(
    outcome: &ResolutionOutcome,
    headers: HeaderMap,
    body: Option<Bytes>,
    conditional: Conditional<'_>,
) -> AssetResponse {
    match outcome {
        ResolutionOutcome::Found(_) if is_not_modified(outcome, conditional.if_none_match) => {
            build_304_response(&headers)
        }
        ResolutionOutcome::Found(_) => build_asset_response(
            StatusCode::OK,
            headers,
            body.unwrap_or_default(),
            conditional.is_head,
        ),
        ResolutionOutcome::RedirectTo { target, kind } => build_redirect_response(target, *kind),
        ResolutionOutcome::NotFound(Some(_)) => build_asset_response(
            StatusCode::NOT_FOUND,
            headers,
            body.unwrap_or_default(),
            conditional.is_head,
        ),
        ResolutionOutcome::NotFound(None) => build_404_response(),
        ResolutionOutcome::MethodNotAllowed => build_405_response(),
    }
}

/// Build an asset response (200, or 404 for a located `404.html`)
///
/// HEAD responses keep the `Content-Length` of the full body.
pub fn build_asset_response(
    status: StatusCode,
    headers: HeaderMap,
    data: Bytes,
    is_head: bool,
) -> AssetResponse {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    response
}

/// Build 304 Not Modified response, keeping only caching headers
pub fn build_304_response(headers: &HeaderMap) -> AssetResponse {
    let mut retained = HeaderMap::new();
    for name in &NOT_MODIFIED_HEADERS {
        for value in headers.get_all(name) {
            retained.append(name.clone(), value.clone());
        }
    }

    let mut response = empty_response(StatusCode::NOT_MODIFIED);
    *response.headers_mut() = retained;
    response
}

/// Build a redirect response for one of the supported redirect kinds
pub fn build_redirect_response(target: &str, kind: RedirectKind) -> AssetResponse {
    Response::builder()
        .status(kind.status())
        .header(LOCATION, target)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(kind.status(), &e);
            build_500_response()
        })
}

/// Build 404 Not Found response without a body
pub fn build_404_response() -> AssetResponse {
    empty_response(StatusCode::NOT_FOUND)
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> AssetResponse {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET, HEAD")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(StatusCode::METHOD_NOT_ALLOWED, &e);
            empty_response(StatusCode::METHOD_NOT_ALLOWED)
        })
}

/// Build 500 Internal Server Error response: no headers, no body
pub fn build_500_response() -> AssetResponse {
    empty_response(StatusCode::INTERNAL_SERVER_ERROR)
}

fn empty_response(status: StatusCode) -> AssetResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
