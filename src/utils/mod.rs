//! Utility functions shared by the CLI and the daemon.
//!
//! ## Modules
//!
//! - [`app_data`] - Application data directory and config file (XDG-compliant)
//! - [`logging`] - `tracing` subscriber setup

pub mod app_data;
pub mod logging;

pub use app_data::*;
pub use logging::{init_logging, LogTarget};
