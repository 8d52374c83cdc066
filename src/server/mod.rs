//! Persistent location server
//!
//! This module provides a daemon that keeps the location index in memory,
//! so uploads and searches from separate CLI invocations share one index.
//!
//! Architecture:
//! - `locixd` daemon: owns a `LocationIndex`, listens on a Unix socket,
//!   handles upload and search requests
//! - Client: Connects to socket, sends requests, receives responses

mod client;
pub mod daemon;
pub mod protocol;
pub mod upload;

pub use client::{ClientError, ClientResult, LocationClient, SearchOutcome};
pub use daemon::LocationServer;

use crate::utils::AppConfig;
use std::path::{Path, PathBuf};

/// Get the socket path for the location server
/// Uses the configured path, else a per-user runtime directory
pub fn get_socket_path(config: &AppConfig) -> PathBuf {
    if let Some(path) = &config.socket_path {
        return path.clone();
    }

    // Try XDG_RUNTIME_DIR first (most secure, tmpfs-backed)
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join("locix.sock");
    }

    // Fall back to user's home directory
    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join("locix.sock");
    }

    // Last resort: /tmp with user ID
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/tmp/locix-{}.sock", uid))
}

/// Get the PID file path that belongs to a socket
pub fn get_pid_path(socket_path: &Path) -> PathBuf {
    socket_path.with_extension("pid")
}

/// Check if a daemon owning `socket_path` is running
pub fn is_daemon_running(socket_path: &Path) -> bool {
    let pid_path = get_pid_path(socket_path);
    if !pid_path.exists() {
        return false;
    }

    // Read PID and check if process exists
    if let Ok(pid_str) = std::fs::read_to_string(&pid_path)
        && let Ok(pid) = pid_str.trim().parse::<i32>()
    {
        // Check if process exists using kill(pid, 0)
        unsafe {
            return libc::kill(pid, 0) == 0;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_socket_wins() {
        let config = AppConfig {
            socket_path: Some(PathBuf::from("/tmp/custom/locix.sock")),
            ..AppConfig::default()
        };
        assert_eq!(get_socket_path(&config), PathBuf::from("/tmp/custom/locix.sock"));
        assert_eq!(
            get_pid_path(&get_socket_path(&config)),
            PathBuf::from("/tmp/custom/locix.pid")
        );
    }

    #[test]
    fn test_no_pid_file_means_not_running() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!is_daemon_running(&dir.path().join("locix.sock")));
    }
}
