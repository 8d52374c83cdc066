//! Off-to-the-side construction of a new [`Snapshot`].
//!
//! Nothing here touches the live index. A builder collects platforms into
//! per-location buckets and hands back a finished snapshot plus a report of
//! what went in and what had to be left out.

use crate::error::IndexError;
use crate::index::location::{normalize_location, ROOT};
use crate::index::snapshot::{Bucket, Snapshot};
use crate::index::types::Platform;
use ahash::AHashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A platform that could not be indexed
#[derive(Debug, Clone, Serialize)]
pub struct IndexFailure {
    pub platform: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: IndexError,
}

/// Summary of one snapshot build
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Generation the snapshot was built for
    pub generation: u64,
    /// Platforms that made it into the snapshot
    pub platforms: usize,
    /// (platform, canonical location) registrations
    pub locations: usize,
    pub failures: Vec<IndexFailure>,
}

/// Collects platforms into location buckets
///
/// Each platform is added once and its canonical locations are deduplicated
/// up front, so a bucket never holds the same platform twice.
#[derive(Default)]
pub struct SnapshotBuilder {
    buckets: AHashMap<String, Vec<Arc<Platform>>>,
    report: BuildReport,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `platform` under every one of its canonical locations
    ///
    /// Locations that normalize to the root are dropped. A platform left
    /// with no location at all is rejected and the builder is untouched.
    pub fn add(&mut self, platform: Platform) -> Result<(), IndexError> {
        let canonical = canonical_locations(&platform)?;
        self.insert(Arc::new(platform), canonical);
        Ok(())
    }

    /// Add a whole batch, recording failures instead of stopping at them
    ///
    /// Location normalization runs in parallel; bucket insertion stays on
    /// the calling thread.
    pub fn add_all(&mut self, platforms: Vec<Platform>) {
        let prepared: Vec<_> = platforms
            .into_par_iter()
            .map(|platform| {
                let canonical = canonical_locations(&platform);
                (platform, canonical)
            })
            .collect();

        for (platform, canonical) in prepared {
            match canonical {
                Ok(canonical) => self.insert(Arc::new(platform), canonical),
                Err(e) => self.record_failure(&platform, e),
            }
        }
    }

    /// Freeze the buckets into a snapshot tagged with `generation`
    pub fn finish(self, generation: u64) -> (Snapshot, BuildReport) {
        let buckets: AHashMap<String, Bucket> = self
            .buckets
            .into_iter()
            .map(|(location, platforms)| (location, platforms.into_boxed_slice()))
            .collect();

        let mut report = self.report;
        report.generation = generation;

        let snapshot = Snapshot::from_buckets(buckets, generation, report.platforms);
        (snapshot, report)
    }

    fn insert(&mut self, platform: Arc<Platform>, canonical: Vec<String>) {
        self.report.locations += canonical.len();
        for location in canonical {
            self.buckets
                .entry(location)
                .or_default()
                .push(Arc::clone(&platform));
        }
        self.report.platforms += 1;
    }

    fn record_failure(&mut self, platform: &Platform, error: IndexError) {
        error!(platform = %platform.name(), %error, "skipping platform");
        self.report.failures.push(IndexFailure {
            platform: platform.name().to_string(),
            error,
        });
    }
}

/// Distinct canonical locations of `platform`, sorted, without the root
fn canonical_locations(platform: &Platform) -> Result<Vec<String>, IndexError> {
    let mut canonical = Vec::with_capacity(platform.location_count());
    for raw in platform.locations() {
        let location = normalize_location(raw);
        if location == ROOT {
            warn!(platform = %platform.name(), raw, "ignoring location without segments");
            continue;
        }
        if location != raw {
            debug!(platform = %platform.name(), raw, %location, "normalized location");
        }
        canonical.push(location.into_owned());
    }

    if canonical.is_empty() {
        return Err(IndexError::OnlyRootLocations);
    }

    canonical.sort_unstable();
    canonical.dedup();
    Ok(canonical)
}

fn serialize_display<S: serde::Serializer>(
    value: &impl std::fmt::Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(name: &str, locations: &[&str]) -> Platform {
        Platform::new(name, locations.iter().copied()).unwrap()
    }

    #[test]
    fn test_builds_canonical_buckets() {
        let mut builder = SnapshotBuilder::new();
        builder.add(platform("A", &["ru", "/ru/msk/"])).unwrap();

        let (snapshot, report) = builder.finish(3);
        assert_eq!(report.generation, 3);
        assert_eq!(report.platforms, 1);
        assert_eq!(report.locations, 2);
        assert_eq!(snapshot.bucket("/ru").len(), 1);
        assert_eq!(snapshot.bucket("/ru/msk").len(), 1);
        assert!(snapshot.bucket("ru").is_empty());
    }

    #[test]
    fn test_equivalent_locations_register_once() {
        let mut builder = SnapshotBuilder::new();
        builder.add(platform("A", &["ru", "/ru/"])).unwrap();

        let (snapshot, report) = builder.finish(1);
        assert_eq!(report.locations, 1);
        assert_eq!(snapshot.location_count(), 1);
        assert_eq!(snapshot.bucket("/ru").len(), 1);
    }

    #[test]
    fn test_root_location_is_dropped_others_kept() {
        let mut builder = SnapshotBuilder::new();
        builder.add(platform("Mixed", &["/ru", "///", "/"])).unwrap();

        let (snapshot, report) = builder.finish(1);
        assert_eq!(report.platforms, 1);
        assert_eq!(report.locations, 1);
        assert!(report.failures.is_empty());
        assert_eq!(snapshot.bucket("/ru").len(), 1);
        assert!(snapshot.bucket(ROOT).is_empty());
        assert_eq!(snapshot.search("/ru/svrd").len(), 1);
    }

    #[test]
    fn test_only_root_locations_is_rejected() {
        let mut builder = SnapshotBuilder::new();
        let err = builder.add(platform("Nowhere", &["/", "///"])).unwrap_err();
        assert_eq!(err, IndexError::OnlyRootLocations);

        let (snapshot, report) = builder.finish(1);
        assert!(snapshot.is_empty());
        assert_eq!(report.platforms, 0);
    }

    #[test]
    fn test_wide_platform_builds_one_entry_per_location() {
        let locations: Vec<String> = (0..50_000).map(|i| format!("/city{i}")).collect();
        let mut builder = SnapshotBuilder::new();
        builder.add(Platform::new("Wide", locations).unwrap()).unwrap();

        let (snapshot, report) = builder.finish(1);
        assert_eq!(report.locations, 50_000);
        assert_eq!(snapshot.location_count(), 50_000);
        assert_eq!(snapshot.bucket("/city49999").len(), 1);
    }

    #[test]
    fn test_add_all_collects_failures() {
        let mut builder = SnapshotBuilder::new();
        builder.add_all(vec![
            platform("Good", &["/ru"]),
            platform("Bad", &["/"]),
            platform("Other", &["/ru/svrd"]),
        ]);

        let (snapshot, report) = builder.finish(2);
        assert_eq!(report.platforms, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].platform, "Bad");
        assert_eq!(snapshot.platform_count(), 2);
        assert_eq!(snapshot.search("/ru/svrd").len(), 2);
    }
}
