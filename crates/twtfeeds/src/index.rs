//! Index page and feed registration

use axum::Form;
use axum::extract::State;
use axum::extract::rejection::FormRejection;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use twtfeeds_core::{FeedEntry, FeedsError};

use crate::error::ApiError;
use crate::resources::{TEXT_HTML, bytes_response};
use crate::server::AppState;

/// Registration form body
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RegisterForm {
    #[serde(default)]
    url: String,
}

/// GET/HEAD /
pub(crate) async fn index(
    method: Method,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let html = state.templates.index()?;
    Ok(bytes_response(&method, StatusCode::OK, TEXT_HTML, html))
}

/// POST /
///
/// A body that is not a readable form counts as no URL at all.
pub(crate) async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "unreadable registration form");
            RegisterForm::default()
        }
    };
    let url = form.url.trim();
    match register_feed(&state, url).await {
        Ok(entry) => message(
            &state,
            StatusCode::CREATED,
            "Success",
            &format!("Feed successfully added {}: {}", entry.name, entry.url),
        ),
        Err(e) => {
            let (status, text) = match &e {
                FeedsError::MissingUrl => {
                    (StatusCode::BAD_REQUEST, "No url supplied".to_string())
                }
                FeedsError::InvalidFeed { reason, .. } => {
                    warn!(url = %url, reason = %reason, "registration rejected");
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Unable to find a valid RSS/Atom feed for: {url}"),
                    )
                }
                FeedsError::InvalidName(_) => (
                    StatusCode::BAD_REQUEST,
                    format!("Unable to find a valid RSS/Atom feed for: {url}"),
                ),
                FeedsError::Conflict(_) => {
                    (StatusCode::CONFLICT, "Feed already exists".to_string())
                }
                _ => {
                    error!(url = %url, error = %e, "registration failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Could not save feed".to_string(),
                    )
                }
            };
            message(&state, status, "Error", &text)
        }
    }
}

/// Validate `url`, then insert and persist under the registry's write lock
async fn register_feed(state: &AppState, url: &str) -> Result<FeedEntry, FeedsError> {
    if url.is_empty() {
        return Err(FeedsError::MissingUrl);
    }
    let feed = state.validator.validate(url).await?;

    // Persistence blocks on disk IO.
    let registry = state.registry.clone();
    let entry = tokio::task::spawn_blocking(move || registry.register(&feed.name, &feed.url))
        .await
        .map_err(|e| FeedsError::Persistence(format!("registration task: {e}")))??;
    info!(name = %entry.name, url = %entry.url, "registration accepted");
    Ok(entry)
}

fn message(state: &AppState, status: StatusCode, title: &str, text: &str) -> Response {
    match state.templates.message(title, text) {
        Ok(html) => (status, [(header::CONTENT_TYPE, TEXT_HTML)], html).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}
