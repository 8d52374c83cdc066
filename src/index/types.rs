use crate::error::PlatformError;
use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Result set of a location search. Platforms registered at several matching
/// prefixes appear once.
pub type PlatformSet = AHashSet<Arc<Platform>>;

/// An advertising platform and the locations it covers
///
/// Immutable once built. Equality covers the name and the whole location
/// set, so the same platform inserted twice collapses in a set. Hashing
/// covers only the name, which keeps set inserts independent of how many
/// locations a platform has.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Platform {
    name: String,
    locations: BTreeSet<String>,
}

impl Platform {
    /// Create a platform, rejecting a blank name, a blank location or an
    /// empty location list
    pub fn new<I, S>(name: impl Into<String>, locations: I) -> Result<Self, PlatformError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlatformError::EmptyName);
        }

        let platform = Self {
            name,
            locations: BTreeSet::new(),
        };
        let platform = platform.with_locations(locations)?;

        if platform.locations.is_empty() {
            return Err(PlatformError::NoLocations);
        }

        Ok(platform)
    }

    /// Consume the platform and return one covering the union of its
    /// locations and `more`
    pub fn with_locations<I, S>(mut self, more: I) -> Result<Self, PlatformError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend_locations(more)?;
        Ok(self)
    }

    /// Add `more` to the location set in place
    ///
    /// On a blank location nothing is added.
    pub fn extend_locations<I, S>(&mut self, more: I) -> Result<(), PlatformError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let more: Vec<String> = more.into_iter().map(Into::into).collect();
        if more.iter().any(|l| l.trim().is_empty()) {
            return Err(PlatformError::BlankLocation);
        }
        self.locations.extend(more);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared locations in sorted order, as written in the source record
    pub fn locations(&self) -> impl ExactSizeIterator<Item = &str> {
        self.locations.iter().map(String::as_str)
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.locations.contains(location)
    }
}

impl PartialEq for Platform {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (self.name == other.name && self.locations == other.locations)
    }
}

impl Hash for Platform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for (i, location) in self.locations.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(location)?;
        }
        Ok(())
    }
}
