//! Avatar resolution
//!
//! A feed's avatar is its custom image when one is stored, otherwise an
//! identicon generated from the feed name. Either way the feed must exist
//! first.

use std::sync::Arc;

use tracing::debug;

use crate::artifact::{ArtifactKind, ArtifactMeta, ArtifactStore};
use crate::cache::{ETag, Strength};
use crate::error::{FeedsError, Result};
use crate::identicon;
use crate::registry::FeedRegistry;

/// Where an avatar's bytes come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Avatar {
    /// Stored image at `{root}/{name}.png`
    Custom(ArtifactMeta),
    /// Identicon computed from the name on demand
    Generated,
}

impl Avatar {
    /// Entity tag for this avatar served at `resource`
    pub fn etag(&self, resource: &str) -> ETag {
        match self {
            Avatar::Custom(meta) => ETag::compute(resource, Strength::Timestamped(meta.modified)),
            Avatar::Generated => ETag::compute(resource, Strength::NameOnly),
        }
    }
}

/// Resolves avatars for registered feeds
#[derive(Debug, Clone)]
pub struct AvatarResolver {
    store: ArtifactStore,
    registry: Arc<FeedRegistry>,
}

impl AvatarResolver {
    pub fn new(store: ArtifactStore, registry: Arc<FeedRegistry>) -> Self {
        Self { store, registry }
    }

    /// A feed exists if it is registered or its feed text is on disk
    async fn feed_exists(&self, name: &str) -> bool {
        self.registry.contains(name) || self.store.locate(ArtifactKind::FeedText, name).await
    }

    /// Decide which avatar to serve for `name` without producing any bytes.
    ///
    /// Unknown feeds are `NotFound` even if a stray image exists.
    pub async fn resolve(&self, name: &str) -> Result<Avatar> {
        if !self.feed_exists(name).await {
            return Err(FeedsError::NotFound(format!("feed {name}")));
        }
        match self.store.stat(ArtifactKind::Avatar, name).await {
            Ok(meta) => Ok(Avatar::Custom(meta)),
            Err(FeedsError::NotFound(_)) => {
                debug!(name = %name, "no custom avatar, using identicon");
                Ok(Avatar::Generated)
            }
            Err(e) => Err(e),
        }
    }

    /// Open a custom avatar for streaming
    pub async fn open_custom(&self, name: &str) -> Result<tokio::fs::File> {
        self.store.open(ArtifactKind::Avatar, name).await
    }

    /// PNG bytes of the generated avatar
    pub fn generate(&self, name: &str) -> Result<Vec<u8>> {
        identicon::generate_png(name)
    }
}
