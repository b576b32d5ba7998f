//! Feed text, media and avatar handlers
//!
//! GET and HEAD share one code path per resource so that both produce the
//! same status and headers; only the body differs. The entity tag is
//! computed and checked before any file is opened or avatar generated.

use axum::body::{Body, Bytes};
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use twtfeeds_core::cache::{self, CacheDecision, ETag, Strength};
use twtfeeds_core::{
    AVATAR_CACHE_CONTROL, ArtifactKind, Avatar, MEDIA_CACHE_CONTROL, validate_name,
};

use crate::error::ApiError;
use crate::server::AppState;

pub(crate) const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
pub(crate) const TEXT_HTML: &str = "text/html; charset=utf-8";
const IMAGE_PNG: &str = "image/png";

/// Identity of the requested resource: path plus query, as sent
fn resource(uri: &Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Response for in-memory content with an exact Content-Length
pub(crate) fn bytes_response(
    method: &Method,
    status: StatusCode,
    content_type: &'static str,
    content: impl Into<Bytes>,
) -> Response {
    let content: Bytes = content.into();
    let length = content.len();
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from(content)
    };
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_LENGTH, HeaderValue::from(length)),
        ],
        body,
    )
        .into_response()
}

/// Response streaming an open file; the stream stops if the client goes away
fn file_response(method: &Method, content_type: &'static str, file: File, size: u64) -> Response {
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(file))
    };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_LENGTH, HeaderValue::from(size)),
        ],
        body,
    )
        .into_response()
}

fn not_modified(etag: &ETag, cache_control: &'static str) -> Response {
    (
        StatusCode::NOT_MODIFIED,
        [
            (header::ETAG, header_value(etag.as_str())),
            (header::CACHE_CONTROL, HeaderValue::from_static(cache_control)),
        ],
    )
        .into_response()
}

fn set_validators(
    response: &mut Response,
    etag: &ETag,
    cache_control: &'static str,
    last_modified: Option<chrono::DateTime<chrono::Utc>>,
) {
    let headers = response.headers_mut();
    headers.insert(header::ETAG, header_value(etag.as_str()));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    if let Some(modified) = last_modified {
        headers.insert(header::LAST_MODIFIED, header_value(&cache::http_date(modified)));
    }
}

/// GET/HEAD /{name}/twtxt.txt
pub(crate) async fn feed_text(
    method: Method,
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    validate_name(&name)?;
    let meta = state.store.stat(ArtifactKind::FeedText, &name).await?;
    let last_modified = header_value(&cache::http_date(meta.modified));

    if cache::unmodified_since(header_str(&headers, header::IF_MODIFIED_SINCE), meta.modified) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::LAST_MODIFIED, last_modified)],
        )
            .into_response());
    }

    let file = state.store.open(ArtifactKind::FeedText, &name).await?;
    let mut response = file_response(&method, TEXT_PLAIN_UTF8, file, meta.size);
    response
        .headers_mut()
        .insert(header::LAST_MODIFIED, last_modified);
    Ok(response)
}

/// GET/HEAD /media/{name}
pub(crate) async fn media(
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    validate_name(&name)?;
    let meta = state.store.stat(ArtifactKind::Media, &name).await?;
    let etag = ETag::compute(resource(&uri), Strength::Timestamped(meta.modified));

    if cache::decide(header_str(&headers, header::IF_NONE_MATCH), &etag)
        == CacheDecision::NotModified
    {
        return Ok(not_modified(&etag, MEDIA_CACHE_CONTROL));
    }

    let file = state.store.open(ArtifactKind::Media, &name).await?;
    let mut response = file_response(&method, IMAGE_PNG, file, meta.size);
    set_validators(&mut response, &etag, MEDIA_CACHE_CONTROL, Some(meta.modified));
    Ok(response)
}

/// GET/HEAD /avatar/{name}
pub(crate) async fn avatar(
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    validate_name(&name)?;
    let avatar = state.avatars.resolve(&name).await?;
    let etag = avatar.etag(resource(&uri));

    if cache::decide(header_str(&headers, header::IF_NONE_MATCH), &etag)
        == CacheDecision::NotModified
    {
        return Ok(not_modified(&etag, AVATAR_CACHE_CONTROL));
    }

    let mut response = match avatar {
        Avatar::Custom(meta) => {
            let file = state.avatars.open_custom(&name).await?;
            let mut response = file_response(&method, IMAGE_PNG, file, meta.size);
            response.headers_mut().insert(
                header::LAST_MODIFIED,
                header_value(&cache::http_date(meta.modified)),
            );
            response
        }
        Avatar::Generated => {
            let png = state.avatars.generate(&name)?;
            bytes_response(&method, StatusCode::OK, IMAGE_PNG, png)
        }
    };
    set_validators(&mut response, &etag, AVATAR_CACHE_CONTROL, None);
    Ok(response)
}
