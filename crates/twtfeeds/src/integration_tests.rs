//! Integration tests for twtfeeds
//!
//! These drive the full router: conditional responses, HEAD/GET symmetry,
//! avatar fallback, content negotiation and registration.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use twtfeeds_core::{Config, ConfigFileStore, Feeds, FeedsError, RegistryStore};

use crate::server::{AppState, build_app};
use crate::validate::{FeedValidator, ValidatedFeed};

/// Validator answering from a fixed URL -> name table
struct StubValidator(HashMap<String, String>);

#[async_trait]
impl FeedValidator for StubValidator {
    async fn validate(&self, url: &str) -> Result<ValidatedFeed, FeedsError> {
        match self.0.get(url) {
            Some(name) => Ok(ValidatedFeed {
                name: name.clone(),
                url: url.to_string(),
            }),
            None => Err(FeedsError::InvalidFeed {
                url: url.to_string(),
                reason: "stub".to_string(),
            }),
        }
    }
}

/// Store that loads fine but refuses every save
struct ReadOnlyStore(Feeds);

impl RegistryStore for ReadOnlyStore {
    fn load(&self) -> twtfeeds_core::Result<Feeds> {
        Ok(self.0.clone())
    }

    fn save(&self, _feeds: &Feeds) -> twtfeeds_core::Result<()> {
        Err(FeedsError::Persistence("read-only filesystem".into()))
    }
}

fn stub_validator() -> Arc<dyn FeedValidator> {
    Arc::new(StubValidator(HashMap::from([
        ("http://a.example/feed".to_string(), "alice".to_string()),
        ("http://b.example/feed".to_string(), "bob".to_string()),
        ("http://a2.example/feed".to_string(), "alice".to_string()),
    ])))
}

/// Helper to build a test app over a fresh data root and config file
fn build_test_app(feeds: &[(&str, &str)]) -> (axum::Router, TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("feeds.toml");
    let config = Config {
        root: dir.path().to_path_buf(),
        feeds: feeds
            .iter()
            .map(|(n, u)| (n.to_string(), u.to_string()))
            .collect(),
        ..Config::default()
    };
    config.save(&config_path).unwrap();

    let state = AppState::new(
        dir.path(),
        ConfigFileStore::new(&config_path, config),
        stub_validator(),
    )
    .unwrap();
    (build_app(state.clone()), dir, state)
}

fn write_file(path: &Path, contents: &[u8], modified: SystemTime) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

fn epoch_plus(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    headers: &[(header::HeaderName, &str)],
) -> (StatusCode, HeaderMap, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, *value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    send(app, Method::GET, uri, &[]).await
}

async fn post_form(app: &axum::Router, body: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// GET and HEAD must agree on status and headers; HEAD carries no body
async fn assert_head_matches_get(app: &axum::Router, uri: &str) -> Vec<u8> {
    let (get_status, get_headers, get_body) = get(app, uri).await;
    let (head_status, head_headers, head_body) = send(app, Method::HEAD, uri, &[]).await;

    assert_eq!(get_status, head_status, "status differs for {uri}");
    assert_eq!(get_headers, head_headers, "headers differ for {uri}");
    assert!(head_body.is_empty(), "HEAD body not empty for {uri}");
    let length: usize = get_headers[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(length, get_body.len(), "Content-Length mismatch for {uri}");
    get_body
}

// -- feed list ------------------------------------------------------------

#[tokio::test]
async fn test_feeds_plain_text() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);

    let (status, headers, body) =
        send(&app, Method::GET, "/feeds", &[(header::ACCEPT, "text/plain")]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert_eq!(body, b"alice http://a.example/feed\n");
}

#[tokio::test]
async fn test_feeds_html() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);

    let (status, headers, body) =
        send(&app, Method::GET, "/feeds", &[(header::ACCEPT, "text/html")]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert_eq!(headers[header::VARY], "Accept");
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<html>"));
    assert!(html.contains("alice"));
}

#[tokio::test]
async fn test_feeds_head_matches_get_per_representation() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);

    for accept in ["text/plain", "text/html"] {
        let headers = [(header::ACCEPT, accept)];
        let (_, get_headers, get_body) = send(&app, Method::GET, "/feeds", &headers).await;
        let (_, head_headers, head_body) = send(&app, Method::HEAD, "/feeds", &headers).await;
        assert_eq!(get_headers, head_headers);
        assert!(head_body.is_empty());
        assert_eq!(
            get_headers[header::CONTENT_LENGTH],
            get_body.len().to_string().as_str()
        );
    }
}

#[tokio::test]
async fn test_we_are_feeds_always_plain() {
    let (app, _dir, _) = build_test_app(&[
        ("alice", "http://a.example/feed"),
        ("bob", "http://b.example/feed"),
    ]);

    let body = assert_head_matches_get(&app, "/we-are-feeds").await;
    assert_eq!(
        body,
        b"alice http://a.example/feed\nbob http://b.example/feed\n"
    );
}

// -- feed text --------------------------------------------------------------

#[tokio::test]
async fn test_feed_text_served_with_validators() {
    let (app, dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);
    write_file(
        &dir.path().join("alice.txt"),
        b"2024-01-01T00:00:00Z\thello\n",
        epoch_plus(784_111_777),
    );

    let body = assert_head_matches_get(&app, "/alice/twtxt.txt").await;
    assert_eq!(body, b"2024-01-01T00:00:00Z\thello\n");

    let (_, headers, _) = get(&app, "/alice/twtxt.txt").await;
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(headers[header::LAST_MODIFIED], "Sun, 06 Nov 1994 08:49:37 GMT");
}

#[tokio::test]
async fn test_feed_text_if_modified_since() {
    let (app, dir, _) = build_test_app(&[]);
    write_file(&dir.path().join("alice.txt"), b"hi\n", epoch_plus(784_111_777));

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/alice/twtxt.txt",
        &[(header::IF_MODIFIED_SINCE, "Sun, 06 Nov 1994 08:49:37 GMT")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/alice/twtxt.txt",
        &[(header::IF_MODIFIED_SINCE, "Sat, 05 Nov 1994 08:49:37 GMT")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"hi\n");
}

#[tokio::test]
async fn test_feed_text_missing() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);
    let (status, _, _) = get(&app, "/alice/twtxt.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_names_rejected() {
    let (app, _dir, _) = build_test_app(&[]);
    for uri in ["/..%2Ffeeds.toml/twtxt.txt", "/media/..%2F..%2Fsecret", "/avatar/.hidden"] {
        let (status, _, _) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
}

// -- media ------------------------------------------------------------------

#[tokio::test]
async fn test_media_etag_and_not_modified() {
    let (app, dir, _) = build_test_app(&[]);
    write_file(
        &dir.path().join("media").join("abc.png"),
        b"\x89PNG fake",
        epoch_plus(1_700_000_000),
    );

    let body = assert_head_matches_get(&app, "/media/abc").await;
    assert_eq!(body, b"\x89PNG fake");

    let (_, headers, _) = get(&app, "/media/abc").await;
    let etag = headers[header::ETAG].to_str().unwrap().to_string();
    assert_eq!(etag, "W/\"/media/abc-2023-11-14T22:13:20Z\"");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=7776000");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");

    let (status, headers, body) = send(
        &app,
        Method::GET,
        "/media/abc",
        &[(header::IF_NONE_MATCH, etag.as_str())],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
    assert_eq!(headers[header::ETAG], etag.as_str());
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=7776000");

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/media/abc",
        &[(header::IF_NONE_MATCH, "W/\"/media/abc-1999-01-01T00:00:00Z\"")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"\x89PNG fake");
}

#[tokio::test]
async fn test_media_etag_follows_modification() {
    let (app, dir, _) = build_test_app(&[]);
    let path = dir.path().join("media").join("abc.png");

    write_file(&path, b"one", epoch_plus(1_000));
    let (_, first, _) = get(&app, "/media/abc").await;
    let (_, again, _) = get(&app, "/media/abc").await;
    assert_eq!(first[header::ETAG], again[header::ETAG]);

    write_file(&path, b"two", epoch_plus(2_000));
    let (status, second, _) = send(
        &app,
        Method::GET,
        "/media/abc",
        &[(header::IF_NONE_MATCH, first[header::ETAG].to_str().unwrap())],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(first[header::ETAG], second[header::ETAG]);
}

#[tokio::test]
async fn test_media_missing() {
    let (app, _dir, _) = build_test_app(&[]);
    let (status, _, body) = get(&app, "/media/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, b"Not Found");
}

#[tokio::test]
async fn test_media_rejects_other_methods() {
    let (app, _dir, _) = build_test_app(&[]);
    for method in [Method::POST, Method::PUT, Method::DELETE] {
        let (status, _, _) = send(&app, method, "/media/abc", &[]).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}

// -- avatars ------------------------------------------------------------------

#[tokio::test]
async fn test_avatar_unregistered_with_stray_file() {
    let (app, dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);
    write_file(&dir.path().join("mallory.png"), b"stray", epoch_plus(1_000));

    let (status, _, _) = get(&app, "/avatar/mallory").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_avatar_generated_is_reproducible() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);
    let (app2, _dir2, _) = build_test_app(&[("alice", "http://a.example/feed")]);

    let first = assert_head_matches_get(&app, "/avatar/alice").await;
    let (_, headers, second) = get(&app2, "/avatar/alice").await;

    assert!(first.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert_eq!(first, second);
    assert_eq!(headers[header::ETAG], "W/\"/avatar/alice\"");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, no-cache, must-revalidate"
    );
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn test_avatar_generated_not_modified() {
    let (app, _dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);

    let (status, headers, body) = send(
        &app,
        Method::GET,
        "/avatar/alice",
        &[(header::IF_NONE_MATCH, "W/\"/avatar/alice\"")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
    assert_eq!(headers[header::ETAG], "W/\"/avatar/alice\"");

    let (status, _, body) = send(
        &app,
        Method::HEAD,
        "/avatar/alice",
        &[(header::IF_NONE_MATCH, "W/\"/avatar/alice\"")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_avatar_custom_image() {
    let (app, dir, _) = build_test_app(&[("alice", "http://a.example/feed")]);
    write_file(&dir.path().join("alice.png"), b"custom avatar", epoch_plus(0));

    let body = assert_head_matches_get(&app, "/avatar/alice").await;
    assert_eq!(body, b"custom avatar");

    let (_, headers, _) = get(&app, "/avatar/alice").await;
    assert_eq!(
        headers[header::ETAG],
        "W/\"/avatar/alice-1970-01-01T00:00:00Z\""
    );
    assert_eq!(headers[header::LAST_MODIFIED], "Thu, 01 Jan 1970 00:00:00 GMT");
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, no-cache, must-revalidate"
    );

    let (status, _, body) = send(
        &app,
        Method::GET,
        "/avatar/alice",
        &[(header::IF_NONE_MATCH, "W/\"/avatar/alice-1970-01-01T00:00:00Z\"")],
    )
    .await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_avatar_for_stored_feed_text() {
    let (app, dir, _) = build_test_app(&[]);
    write_file(&dir.path().join("carol.txt"), b"hi\n", epoch_plus(0));

    let (status, headers, _) = get(&app, "/avatar/carol").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ETAG], "W/\"/avatar/carol\"");
}

// -- index and registration -------------------------------------------------

#[tokio::test]
async fn test_index_page() {
    let (app, _dir, _) = build_test_app(&[]);
    let body = assert_head_matches_get(&app, "/").await;
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<form"));
}

#[tokio::test]
async fn test_register_success_persists() {
    let (app, dir, state) = build_test_app(&[]);

    let (status, body) = post_form(&app, "url=http%3A%2F%2Fa.example%2Ffeed").await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.contains("Feed successfully added alice"));

    assert!(state.registry.contains("alice"));
    let reloaded = Config::load(&dir.path().join("feeds.toml")).unwrap();
    assert_eq!(
        reloaded.feeds.get("alice").map(String::as_str),
        Some("http://a.example/feed")
    );

    let (_, _, listing) =
        send(&app, Method::GET, "/feeds", &[(header::ACCEPT, "text/plain")]).await;
    assert_eq!(listing, b"alice http://a.example/feed\n");
}

#[tokio::test]
async fn test_register_duplicate_conflict() {
    let (app, _dir, state) = build_test_app(&[("alice", "http://a.example/feed")]);

    let (status, body) = post_form(&app, "url=http%3A%2F%2Fa2.example%2Ffeed").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Feed already exists"));
    assert_eq!(
        state.registry.get("alice").as_deref(),
        Some("http://a.example/feed")
    );
}

#[tokio::test]
async fn test_register_missing_url() {
    let (app, _dir, state) = build_test_app(&[]);

    for form in ["", "url=", "url=%20%20"] {
        let (status, body) = post_form(&app, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{form:?}");
        assert!(body.contains("No url supplied"));
    }
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_register_without_form_body() {
    let (app, _dir, state) = build_test_app(&[]);

    let requests = [
        Request::builder().method(Method::POST).uri("/").body(Body::empty()),
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"url":"http://a.example/feed"}"#)),
    ];
    for request in requests {
        let response = app.clone().oneshot(request.unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response.headers()[header::CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("text/html")
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("No url supplied"));
    }
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_register_rejection_escapes_url() {
    let (app, _dir, _) = build_test_app(&[]);

    let (status, body) =
        post_form(&app, "url=http%3A%2F%2Fx.example%2F%3Cscript%3Ealert(1)%3C%2Fscript%3E").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("<script>"));
    assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
}

#[tokio::test]
async fn test_register_invalid_feed() {
    let (app, _dir, state) = build_test_app(&[]);

    let (status, body) = post_form(&app, "url=http%3A%2F%2Fnot-a-feed.example%2F").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Unable to find a valid RSS"));
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn test_register_persistence_failure() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(dir.path(), ReadOnlyStore(Feeds::new()), stub_validator()).unwrap();
    let app = build_app(state.clone());

    let (status, body) = post_form(&app, "url=http%3A%2F%2Fa.example%2Ffeed").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("Could not save feed"));
    assert!(!body.contains("read-only filesystem"));
    assert!(!state.registry.contains("alice"));
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let (app, _dir, state) = build_test_app(&[]);

    let attempts = (0..6).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { post_form(&app, "url=http%3A%2F%2Fa.example%2Ffeed").await })
    });
    let mut statuses = Vec::new();
    for attempt in attempts.collect::<Vec<_>>() {
        statuses.push(attempt.await.unwrap().0);
    }

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        5
    );
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn test_index_rejects_put() {
    let (app, _dir, _) = build_test_app(&[]);
    let (status, _, body) = send(&app, Method::PUT, "/", &[]).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body, b"Method Not Allowed");
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _dir, _) = build_test_app(&[]);
    let (status, _, _) = get(&app, "/no/such/thing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
