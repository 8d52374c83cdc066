//! Protocol messages for client-server communication
//!
//! Uses a simple length-prefixed JSON protocol:
//! - 4 bytes (little-endian u32): message length
//! - N bytes: JSON-encoded message

use crate::index::{EmptyUploadPolicy, IndexStats};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Largest message either side will accept
const MAX_MESSAGE_LEN: usize = 100 * 1024 * 1024;

/// Request from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Find platforms covering a location
    Search { location: String },

    /// Replace the index with the records in a text file
    Upload { path: PathBuf },

    /// Check server health and get stats
    Status,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Platforms covering the requested location
    Search(SearchResponse),

    /// No platform covers the location or any of its ancestors
    NotFound { location: String },

    /// Upload accepted and installed
    Uploaded(UploadResponse),

    /// Server status
    Status(StatusResponse),

    /// The request itself was unacceptable
    Rejected { message: String },

    /// Shutdown acknowledged
    ShuttingDown,

    /// Pong response
    Pong,

    /// The server failed while handling a valid request
    Error { message: String },
}

/// Search results response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Location as sent by the client
    pub location: String,
    /// Platform names, sorted
    pub platforms: Vec<String>,
    /// Snapshot that answered the query
    pub generation: u64,
    /// Time taken in milliseconds
    pub duration_ms: f64,
}

/// Upload results response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Platforms parsed from the file
    pub platforms: usize,
    /// (platform, location) registrations in the new snapshot
    pub locations: usize,
    /// Lines dropped by the parser
    pub skipped_lines: usize,
    /// Platforms the index could not take
    pub failed_platforms: usize,
    /// Generation now live, None if the index was left unchanged
    pub generation: Option<u64>,
}

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Live snapshot
    pub index: IndexStats,
    /// Total searches served
    pub searches_served: u64,
    /// Uploads that replaced the index
    pub uploads_accepted: u64,
    /// What an upload without platforms does
    pub empty_upload: EmptyUploadPolicy,
    /// Socket the server listens on
    pub socket_path: PathBuf,
}

/// Write a message to a stream with length prefix
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })?;

    let len = json.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Read a message from a stream with length prefix
pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> std::io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    serde_json::from_slice(&buf).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })
}
