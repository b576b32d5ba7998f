//! Feed registry
//!
//! The authoritative mapping of feed names to source URLs. Readers get a
//! lock-free snapshot; writers serialize on a mutex covering the whole
//! check, persist and publish sequence. A new map is only published after
//! the durable store accepted it, so a failed save leaves no trace.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::Serialize;
use tracing::{error, info};

use crate::artifact::validate_name;
use crate::error::{FeedsError, Result};

/// Feed name to source URL
pub type Feeds = BTreeMap<String, String>;

/// A registered feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
}

/// Durable backing for the registry
pub trait RegistryStore: Send + Sync {
    /// Load the full registry
    fn load(&self) -> Result<Feeds>;

    /// Replace the durable registry with `feeds`
    fn save(&self, feeds: &Feeds) -> Result<()>;
}

/// In-memory registry backed by a [`RegistryStore`]
pub struct FeedRegistry {
    feeds: ArcSwap<Feeds>,
    write_lock: Mutex<()>,
    store: Box<dyn RegistryStore>,
}

impl FeedRegistry {
    /// Load the registry from its durable store
    pub fn open(store: impl RegistryStore + 'static) -> Result<Self> {
        let feeds = store.load()?;
        info!(count = feeds.len(), "feed registry loaded");
        Ok(Self {
            feeds: ArcSwap::from_pointee(feeds),
            write_lock: Mutex::new(()),
            store: Box::new(store),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.feeds.load().contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.feeds.load().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.feeds.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.load().is_empty()
    }

    /// Consistent view of the registry at this instant
    pub fn snapshot(&self) -> Arc<Feeds> {
        self.feeds.load_full()
    }

    /// All entries, ordered by name
    pub fn list(&self) -> Vec<FeedEntry> {
        self.snapshot()
            .iter()
            .map(|(name, url)| FeedEntry {
                name: name.clone(),
                url: url.clone(),
            })
            .collect()
    }

    /// Register a new feed.
    ///
    /// Fails with `Conflict` if the name is taken, and with `Persistence` if
    /// the durable store rejects the write; neither case mutates the registry.
    pub fn register(&self, name: &str, url: &str) -> Result<FeedEntry> {
        validate_name(name)?;
        if url.trim().is_empty() {
            return Err(FeedsError::MissingUrl);
        }

        // Guards no data, so a poisoned lock is still usable.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.feeds.load_full();
        if current.contains_key(name) {
            return Err(FeedsError::Conflict(name.to_string()));
        }

        let mut next = Feeds::clone(&current);
        next.insert(name.to_string(), url.to_string());
        if let Err(e) = self.store.save(&next) {
            error!(name = %name, error = %e, "failed to persist feed registry");
            return Err(e);
        }
        self.feeds.store(Arc::new(next));

        info!(name = %name, url = %url, "feed registered");
        Ok(FeedEntry {
            name: name.to_string(),
            url: url.to_string(),
        })
    }
}

impl std::fmt::Debug for FeedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedRegistry")
            .field("feeds", &self.feeds.load())
            .finish_non_exhaustive()
    }
}
