//! Cache identity and conditional request decisions
//!
//! Entity tags are weak and derived from the request path, plus the artifact
//! modification time when the bytes come from disk. Generated avatars are a
//! pure function of the name, so the path alone identifies them.
//!
//! Modification instants are formatted to whole seconds, so two writes within
//! the same second produce the same tag and a client may keep the first.
//!
//! `If-None-Match` is matched by substring containment rather than exact tag
//! equality. Clients may send a list of tags and existing clients rely on
//! the loose match.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Cache-Control for media files; their tag already changes with content
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=7776000";

/// Cache-Control for avatars; always revalidate since they can be replaced out-of-band
pub const AVATAR_CACHE_CONTROL: &str = "public, no-cache, must-revalidate";

/// IMF-fixdate layout used by `Last-Modified`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// What an entity tag is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    /// Request path plus modification instant
    Timestamped(DateTime<Utc>),
    /// Request path only
    NameOnly,
}

/// A weak entity tag, already formatted for the `ETag` header
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    /// Compute the tag for `resource` (the request path and query)
    pub fn compute(resource: &str, strength: Strength) -> Self {
        match strength {
            Strength::Timestamped(modified) => ETag(format!(
                "W/\"{}-{}\"",
                resource,
                modified.to_rfc3339_opts(SecondsFormat::Secs, true)
            )),
            Strength::NameOnly => ETag(format!("W/\"{resource}\"")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the client-supplied `If-None-Match` value contains this tag
    pub fn is_matched_by(&self, if_none_match: &str) -> bool {
        if_none_match.contains(self.0.as_str())
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a conditional request check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Respond 304 and skip body generation
    NotModified,
    /// Send identity headers and the full representation
    Serve,
}

/// Decide between a 304 short-circuit and a full response
pub fn decide(if_none_match: Option<&str>, etag: &ETag) -> CacheDecision {
    match if_none_match {
        Some(value) if !value.is_empty() && etag.is_matched_by(value) => {
            CacheDecision::NotModified
        }
        _ => CacheDecision::Serve,
    }
}

/// Format an instant as an HTTP date
pub fn http_date(instant: DateTime<Utc>) -> String {
    instant.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an HTTP date; unparseable values are ignored
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// `If-Modified-Since` check at one-second resolution
pub fn unmodified_since(if_modified_since: Option<&str>, modified: DateTime<Utc>) -> bool {
    if_modified_since
        .and_then(parse_http_date)
        .is_some_and(|since| modified.timestamp() <= since.timestamp())
}
