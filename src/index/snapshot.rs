use crate::index::location::prefixes;
use crate::index::stats::IndexStats;
use crate::index::types::{Platform, PlatformSet};
use ahash::AHashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Platforms registered at exactly one canonical location
pub(crate) type Bucket = Box<[Arc<Platform>]>;

/// One immutable, fully built location index
///
/// Built once by [`SnapshotBuilder`](crate::index::SnapshotBuilder), then
/// only read. Readers hold it through an `Arc`, so a snapshot outlives its
/// replacement for as long as a search still uses it.
#[derive(Debug)]
pub struct Snapshot {
    buckets: AHashMap<String, Bucket>,
    generation: u64,
    platform_count: usize,
    built_at: u64,
}

impl Snapshot {
    /// The snapshot a fresh index starts with
    pub fn empty() -> Self {
        Self::from_buckets(AHashMap::new(), 0, 0)
    }

    pub(crate) fn from_buckets(
        buckets: AHashMap<String, Bucket>,
        generation: u64,
        platform_count: usize,
    ) -> Self {
        let built_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            buckets,
            generation,
            platform_count,
            built_at,
        }
    }

    /// Union of the buckets of every prefix of `canonical`
    pub fn search(&self, canonical: &str) -> PlatformSet {
        let mut found = PlatformSet::default();
        for prefix in prefixes(canonical) {
            if let Some(bucket) = self.buckets.get(prefix) {
                found.extend(bucket.iter().cloned());
            }
        }
        found
    }

    /// Platforms registered at exactly `canonical`, without ancestors
    pub fn bucket(&self, canonical: &str) -> &[Arc<Platform>] {
        self.buckets.get(canonical).map(|b| &b[..]).unwrap_or(&[])
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of distinct canonical locations with at least one platform
    pub fn location_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn platform_count(&self) -> usize {
        self.platform_count
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            generation: self.generation,
            platforms: self.platform_count,
            locations: self.buckets.len(),
            built_at: self.built_at,
        }
    }
}
