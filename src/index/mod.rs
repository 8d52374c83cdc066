//! The live, bulk-replaceable location index.
//!
//! [`LocationIndex`] holds one [`Snapshot`] behind an [`ArcSwap`]. A replace
//! builds a complete new snapshot without touching the live one and then
//! publishes it with a single atomic store. A search loads the current
//! snapshot once and answers entirely from it, so it sees either the old
//! index or the new one, never a mix. Concurrent replaces do not interfere
//! with each other's builds; whichever stores last wins.

pub mod build;
pub mod location;
pub mod snapshot;
pub mod stats;
pub mod types;

pub use build::{BuildReport, IndexFailure, SnapshotBuilder};
pub use location::{normalize_location, prefixes};
pub use snapshot::Snapshot;
pub use stats::IndexStats;
pub use types::{Platform, PlatformSet};

use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// What [`LocationIndex::replace`] does with an empty platform collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyUploadPolicy {
    /// Keep the live snapshot; an empty upload never clears search results
    #[default]
    Ignore,
    /// Install an empty snapshot
    Clear,
}

/// Result of a [`LocationIndex::replace`] call
#[derive(Debug, Clone)]
pub enum ReplaceOutcome {
    /// A snapshot built from the input was installed
    Installed(BuildReport),
    /// The input was empty and an empty snapshot was installed
    Cleared { generation: u64 },
    /// The input was empty and the live snapshot was kept
    Ignored,
}

impl ReplaceOutcome {
    /// Generation installed by this call, if any
    pub fn generation(&self) -> Option<u64> {
        match self {
            ReplaceOutcome::Installed(report) => Some(report.generation),
            ReplaceOutcome::Cleared { generation } => Some(*generation),
            ReplaceOutcome::Ignored => None,
        }
    }
}

/// Platforms found for one search, and the snapshot that answered it
#[derive(Debug)]
pub struct SearchHit {
    pub platforms: PlatformSet,
    pub generation: u64,
}

/// Thread-safe location index
///
/// Owned by whoever composes the system and shared by reference (or `Arc`).
/// All methods take `&self`.
pub struct LocationIndex {
    current: ArcSwap<Snapshot>,
    next_generation: AtomicU64,
    empty_policy: EmptyUploadPolicy,
}

impl LocationIndex {
    /// Create an empty index that ignores empty uploads
    pub fn new() -> Self {
        Self::with_policy(EmptyUploadPolicy::default())
    }

    pub fn with_policy(empty_policy: EmptyUploadPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            next_generation: AtomicU64::new(1),
            empty_policy,
        }
    }

    pub fn empty_policy(&self) -> EmptyUploadPolicy {
        self.empty_policy
    }

    /// Replace the whole index with `platforms`
    ///
    /// The new snapshot is built from scratch; nothing of the previous one
    /// survives. Platforms that cannot be indexed are skipped and listed in
    /// the returned report.
    pub fn replace<I>(&self, platforms: I) -> ReplaceOutcome
    where
        I: IntoIterator<Item = Platform>,
    {
        let platforms: Vec<Platform> = platforms.into_iter().collect();

        if platforms.is_empty() {
            return match self.empty_policy {
                EmptyUploadPolicy::Ignore => {
                    warn!("empty platform collection uploaded, keeping current index");
                    ReplaceOutcome::Ignored
                }
                EmptyUploadPolicy::Clear => {
                    let (snapshot, _) = SnapshotBuilder::new().finish(self.allocate_generation());
                    let generation = snapshot.generation();
                    self.current.store(Arc::new(snapshot));
                    info!(generation, "location index cleared");
                    ReplaceOutcome::Cleared { generation }
                }
            };
        }

        info!(platforms = platforms.len(), "building location index");

        let mut builder = SnapshotBuilder::new();
        builder.add_all(platforms);
        let (snapshot, report) = builder.finish(self.allocate_generation());

        self.current.store(Arc::new(snapshot));

        info!(
            generation = report.generation,
            platforms = report.platforms,
            locations = report.locations,
            failed = report.failures.len(),
            "location index installed"
        );

        ReplaceOutcome::Installed(report)
    }

    /// Every platform registered at `location` or at one of its ancestors
    ///
    /// An empty result is not an error. Fails only for an empty `location`.
    pub fn search(&self, location: &str) -> Result<PlatformSet> {
        self.search_with_generation(location).map(|hit| hit.platforms)
    }

    /// Like [`search`](Self::search), also reporting which snapshot answered
    pub fn search_with_generation(&self, location: &str) -> Result<SearchHit> {
        if location.is_empty() {
            warn!("empty location search attempt");
            return Err(Error::InvalidArgument("location cannot be empty"));
        }

        let canonical = normalize_location(location);
        let snapshot = self.current.load();
        let platforms = snapshot.search(&canonical);

        debug!(
            location,
            %canonical,
            generation = snapshot.generation(),
            found = platforms.len(),
            "location search"
        );

        Ok(SearchHit {
            platforms,
            generation: snapshot.generation(),
        })
    }

    /// The currently installed snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn stats(&self) -> IndexStats {
        self.current.load().stats()
    }

    fn allocate_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for LocationIndex {
    fn default() -> Self {
        Self::new()
    }
}
