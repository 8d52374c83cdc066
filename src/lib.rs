//! # locix - location prefix index
//!
//! locix keeps an in-memory index from hierarchical locations such as
//! `/ru/svrd/revda` to the advertising platforms active there, and answers
//! "which platforms cover this location" by collecting every platform
//! registered at the location or at any of its ancestors.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`records`] - Parsing `name:loc1,loc2` text records into platforms
//! - [`index`] - Snapshot building, atomic replacement and prefix search
//! - [`server`] - Unix-socket daemon that owns one index, plus its client
//! - [`output`] - Result formatting
//! - [`utils`] - Config file and logging setup
//!
//! ## Quick Start
//!
//! ```no_run
//! use locix::index::LocationIndex;
//! use locix::records::parse_records;
//! use std::io::Cursor;
//!
//! let data = "Яндекс.Директ:/ru\nРевдинский рабочий:/ru/svrd/revda,/ru/svrd/pervik";
//! let platforms = parse_records(Cursor::new(data)).unwrap();
//!
//! let index = LocationIndex::new();
//! index.replace(platforms);
//!
//! for platform in index.search("/ru/svrd/revda").unwrap() {
//!     println!("{}", platform.name());
//! }
//! ```
//!
//! ## Concurrency
//!
//! A [`LocationIndex`](index::LocationIndex) can be shared across threads
//! without extra locking. Each replace builds a complete snapshot off to the
//! side and publishes it with one atomic store; each search reads exactly one
//! snapshot.

pub mod error;
pub mod index;
pub mod output;
pub mod records;
pub mod server;
pub mod utils;

pub use error::{Error, Result};
