//! twtfeeds-core: resource serving and cache identity for twtfeeds
//!
//! This crate provides the artifact store, entity tag computation and
//! conditional request decisions, avatar resolution, the feed registry and
//! the content negotiation used by the twtfeeds HTTP service.

pub mod artifact;
pub mod avatar;
pub mod cache;
pub mod config;
pub mod error;
pub mod identicon;
pub mod negotiate;
pub mod registry;

pub use artifact::{ArtifactKind, ArtifactMeta, ArtifactStore, validate_name};
pub use avatar::{Avatar, AvatarResolver};
pub use cache::{AVATAR_CACHE_CONTROL, CacheDecision, ETag, MEDIA_CACHE_CONTROL, Strength};
pub use config::{Config, ConfigFileStore};
pub use error::{ErrorClass, FeedsError, Result};
pub use negotiate::{Representation, select_representation};
pub use registry::{FeedEntry, FeedRegistry, Feeds, RegistryStore};
