//! Client for connecting to the location server daemon

use crate::server::protocol::{
    read_message, write_message, Request, Response, SearchResponse, StatusResponse,
    UploadResponse,
};
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Read/write timeout
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server is not running
    #[error("Location server is not running")]
    NotRunning,
    /// Communication error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Server refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),
    /// Server returned an error
    #[error("Server error: {0}")]
    ServerError(String),
    /// Invalid response
    #[error("Invalid response from server")]
    InvalidResponse,
}

/// Answer to a search request
#[derive(Debug)]
pub enum SearchOutcome {
    Found(SearchResponse),
    NotFound,
}

/// Client for the location server
pub struct LocationClient {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
}

impl LocationClient {
    /// Try to connect to the daemon listening on `socket_path`
    /// Returns None if no daemon accepts connections there
    pub fn connect(socket_path: &Path) -> Option<Self> {
        // Quick check if socket exists
        if !socket_path.exists() {
            return None;
        }

        let stream = UnixStream::connect(socket_path).ok()?;

        let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
        let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

        let reader = BufReader::new(stream.try_clone().ok()?);
        let writer = BufWriter::new(stream);

        Some(Self { reader, writer })
    }

    /// Connect or return an error (for when daemon is required)
    pub fn connect_required(socket_path: &Path) -> ClientResult<Self> {
        Self::connect(socket_path).ok_or(ClientError::NotRunning)
    }

    /// Search platforms covering `location`
    pub fn search(&mut self, location: &str) -> ClientResult<SearchOutcome> {
        let request = Request::Search {
            location: location.to_string(),
        };

        match self.call(&request)? {
            Response::Search(sr) => Ok(SearchOutcome::Found(sr)),
            Response::NotFound { .. } => Ok(SearchOutcome::NotFound),
            other => Err(unexpected(other)),
        }
    }

    /// Ask the server to replace its index with the records in `path`
    ///
    /// The path is resolved here, so relative paths work regardless of the
    /// daemon's working directory.
    pub fn upload(&mut self, path: &Path) -> ClientResult<UploadResponse> {
        let path = std::path::absolute(path)?;

        match self.call(&Request::Upload { path })? {
            Response::Uploaded(upload) => Ok(upload),
            other => Err(unexpected(other)),
        }
    }

    /// Get server status
    pub fn status(&mut self) -> ClientResult<StatusResponse> {
        match self.call(&Request::Status)? {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    /// Request graceful shutdown
    pub fn shutdown(&mut self) -> ClientResult<()> {
        match self.call(&Request::Shutdown)? {
            Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Ping the server
    pub fn ping(&mut self) -> ClientResult<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn call(&mut self, request: &Request) -> ClientResult<Response> {
        write_message(&mut self.writer, request)?;
        Ok(read_message(&mut self.reader)?)
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Rejected { message } => ClientError::Rejected(message),
        Response::Error { message } => ClientError::ServerError(message),
        _ => ClientError::InvalidResponse,
    }
}
