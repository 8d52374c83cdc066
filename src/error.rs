//! Error types shared by the record parser and the location index.
//!
//! Only [`Error`] ever reaches a caller. [`RecordError`] and [`IndexError`]
//! describe per-line and per-platform problems that are collected into
//! reports and logged while the surrounding batch carries on.

use thiserror::Error;

/// Result alias for the core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to callers of the core operations
#[derive(Debug, Error)]
pub enum Error {
    /// The caller passed an argument the operation cannot work with
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Reading the input stream failed; the parse is aborted
    #[error("failed to read records: {0}")]
    Stream(#[from] std::io::Error),
}

/// Reasons a [`Platform`](crate::index::Platform) cannot be constructed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("platform name cannot be empty or whitespace")]
    EmptyName,
    #[error("platform must have at least one location")]
    NoLocations,
    #[error("location cannot be empty or whitespace")]
    BlankLocation,
}

/// Why a single input line was skipped by the record parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing ':' separator")]
    MissingSeparator,
    #[error("empty platform name")]
    EmptyName,
    #[error("no valid locations")]
    NoLocations,
    #[error("invalid platform: {0}")]
    InvalidPlatform(#[from] PlatformError),
}

/// Why a platform was left out of a freshly built snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Every declared location has no segments, and the root is never
    /// searched, so the platform could never be found
    #[error("every location normalizes to the root")]
    OnlyRootLocations,
}
