//! Feed list endpoints
//!
//! `/feeds` picks its representation from the `Accept` header before any
//! rendering happens; `/we-are-feeds` is always the plain listing.

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use twtfeeds_core::{FeedEntry, Representation, select_representation};

use crate::error::ApiError;
use crate::resources::{TEXT_HTML, TEXT_PLAIN_UTF8, bytes_response};
use crate::server::AppState;

/// One `name url` line per feed
pub(crate) fn plain_listing(entries: &[FeedEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} {}\n", e.name, e.url))
        .collect()
}

/// GET/HEAD /feeds
pub(crate) async fn feeds(
    method: Method,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    let representation = select_representation(accept);
    let entries = state.registry.list();

    let mut response = match representation {
        Representation::PlainText => bytes_response(
            &method,
            StatusCode::OK,
            TEXT_PLAIN_UTF8,
            plain_listing(&entries),
        ),
        Representation::Structured => {
            let html = state.templates.feeds(&entries)?;
            bytes_response(&method, StatusCode::OK, TEXT_HTML, html)
        }
    };
    response
        .headers_mut()
        .insert(header::VARY, HeaderValue::from_static("Accept"));
    Ok(response)
}

/// GET/HEAD /we-are-feeds
pub(crate) async fn we_are_feeds(method: Method, State(state): State<AppState>) -> Response {
    let entries = state.registry.list();
    bytes_response(
        &method,
        StatusCode::OK,
        TEXT_PLAIN_UTF8,
        plain_listing(&entries),
    )
}
