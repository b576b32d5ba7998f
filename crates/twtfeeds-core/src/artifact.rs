//! Filesystem-backed artifact store
//!
//! Maps a logical `(kind, name)` pair onto a file under the data root and
//! exposes existence, metadata and read access. The store never writes.
//! Callers must pass names through [`validate_name`] first.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs::{self, File};

use crate::error::{FeedsError, Result};

/// Subdirectory of the data root holding media images
pub const MEDIA_DIR: &str = "media";

/// Kind of artifact, which determines its on-disk location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Generated twtxt feed: `{root}/{name}.txt`
    FeedText,
    /// Media image: `{root}/media/{name}.png`
    Media,
    /// Custom avatar image: `{root}/{name}.png`
    Avatar,
}

impl ArtifactKind {
    fn label(self) -> &'static str {
        match self {
            ArtifactKind::FeedText => "feed",
            ArtifactKind::Media => "media",
            ArtifactKind::Avatar => "avatar",
        }
    }
}

/// Metadata for a stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactMeta {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Check that `name` is safe to use as a single path segment.
///
/// Rejects empty names, separators, NUL, parent references and dotfiles.
pub fn validate_name(name: &str) -> Result<()> {
    let unsafe_name = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(FeedsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Read-only view over the artifacts under a data root
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the file path for an artifact
    pub fn path(&self, kind: ArtifactKind, name: &str) -> PathBuf {
        match kind {
            ArtifactKind::FeedText => self.root.join(format!("{name}.txt")),
            ArtifactKind::Media => self.root.join(MEDIA_DIR).join(format!("{name}.png")),
            ArtifactKind::Avatar => self.root.join(format!("{name}.png")),
        }
    }

    /// Whether a regular file exists for the artifact.
    ///
    /// This is advisory only; a later `open` may still fail.
    pub async fn locate(&self, kind: ArtifactKind, name: &str) -> bool {
        fs::metadata(self.path(kind, name))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Size and modification time of the artifact
    pub async fn stat(&self, kind: ArtifactKind, name: &str) -> Result<ArtifactMeta> {
        let metadata = match fs::metadata(self.path(kind, name)).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(not_found(kind, name)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(kind, name)),
            Err(e) => return Err(e.into()),
        };
        Ok(ArtifactMeta {
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        })
    }

    /// Open the artifact for reading.
    ///
    /// Every failure here, including a file that vanished after `stat`, is an
    /// IO error and so an internal error for the caller.
    pub async fn open(&self, kind: ArtifactKind, name: &str) -> Result<File> {
        Ok(File::open(self.path(kind, name)).await?)
    }
}

fn not_found(kind: ArtifactKind, name: &str) -> FeedsError {
    FeedsError::NotFound(format!("{} {}", kind.label(), name))
}
