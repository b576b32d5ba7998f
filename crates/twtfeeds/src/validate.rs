//! Feed validation for registrations
//!
//! A submitted URL must serve an RSS or Atom document. The feed name is
//! derived from the document title, falling back to the URL host.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use twtfeeds_core::{FeedsError, validate_name};

/// A URL that yielded a feed, and the name it registers under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFeed {
    pub name: String,
    pub url: String,
}

/// Checks that a URL serves an RSS/Atom feed
///
/// The `#[async_trait]` macro keeps the trait object safe so the app state
/// can hold an `Arc<dyn FeedValidator>`.
#[async_trait]
pub trait FeedValidator: Send + Sync {
    async fn validate(&self, url: &str) -> Result<ValidatedFeed, FeedsError>;
}

/// Validator that fetches the URL over HTTP
pub struct HttpFeedValidator {
    client: reqwest::Client,
}

impl HttpFeedValidator {
    pub fn new(timeout: Duration) -> Result<Self, FeedsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("twtfeeds/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeedsError::Config(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedValidator for HttpFeedValidator {
    async fn validate(&self, url: &str) -> Result<ValidatedFeed, FeedsError> {
        let invalid = |reason: String| FeedsError::InvalidFeed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| invalid(e.to_string()))?;
        if !response.status().is_success() {
            return Err(invalid(format!("status {}", response.status())));
        }
        let document = response.text().await.map_err(|e| invalid(e.to_string()))?;

        let name = feed_name(&document, url)
            .ok_or_else(|| invalid("not an RSS/Atom document".to_string()))?;
        debug!(url = %url, name = %name, "feed validated");
        Ok(ValidatedFeed {
            name,
            url: url.to_string(),
        })
    }
}

/// Name for the feed in `document`, or `None` if it is not a usable feed
pub(crate) fn feed_name(document: &str, url: &str) -> Option<String> {
    let title = feed_title(document)?;
    let from_title = title.map(|t| slugify(&t)).filter(|s| !s.is_empty());
    let name = from_title.or_else(|| {
        let parsed = reqwest::Url::parse(url).ok()?;
        Some(slugify(parsed.host_str()?)).filter(|s| !s.is_empty())
    })?;
    validate_name(&name).ok().map(|()| name)
}

/// `None` unless the root element is `rss`, `feed` or `rdf:RDF`; otherwise
/// the unescaped channel (RSS) or feed (Atom) title, if there is one.
fn feed_title(document: &str) -> Option<Option<String>> {
    let mut reader = Reader::from_str(document);
    // Local names of the open elements
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut title: Option<String> = None;
    let mut title_depth = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if path.is_empty() && !is_feed_root(&name) {
                    return None;
                }
                if title_depth.is_none() && name == b"title" && is_title_parent(&path) {
                    title = Some(String::new());
                    title_depth = Some(path.len() + 1);
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if path.is_empty() {
                    return is_feed_root(e.local_name().as_ref()).then_some(None);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(text) = title.as_mut() {
                    match e.unescape() {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&e)),
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(text) = title.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if title_depth == Some(path.len()) {
                    return Some(title);
                }
                path.pop();
                if path.is_empty() {
                    return Some(None);
                }
            }
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "feed document is not well-formed");
                return None;
            }
        }
    }
}

fn is_feed_root(name: &[u8]) -> bool {
    matches!(name, b"rss" | b"feed" | b"RDF")
}

/// The feed title is a child of the Atom root or of an RSS `channel`
fn is_title_parent(path: &[Vec<u8>]) -> bool {
    match path {
        [root] => root == b"feed",
        [_, channel] => channel == b"channel",
        _ => false,
    }
}

/// Lowercase; runs of anything but ASCII alphanumerics become one `-`
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
