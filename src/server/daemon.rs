//! Unix location server daemon
//!
//! Keeps the location index in memory and serves upload and search requests
//! over a Unix socket.

use crate::index::{LocationIndex, ReplaceOutcome};
use crate::records::parse_file;
use crate::server::protocol::{
    read_message, write_message, Request, Response, SearchResponse, StatusResponse,
    UploadResponse,
};
use crate::server::upload::{validate_upload, UploadError};
use crate::server::{get_pid_path, get_socket_path};
use crate::utils::{get_daemon_log_path, init_logging, AppConfig, LogTarget};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufReader, BufWriter};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Statistics for the server
struct ServerStats {
    start_time: Instant,
    searches_served: AtomicU64,
    uploads_accepted: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            searches_served: AtomicU64::new(0),
            uploads_accepted: AtomicU64::new(0),
        }
    }
}

/// The location server daemon
pub struct LocationServer {
    /// The index every connection shares
    index: LocationIndex,
    /// Socket the server binds to
    socket_path: PathBuf,
    /// Largest accepted upload
    max_upload_bytes: u64,
    /// Server statistics
    stats: ServerStats,
    /// Shutdown flag
    shutdown: AtomicBool,
}

impl LocationServer {
    /// Create a server from config, wrapped in Arc
    pub fn new(config: &AppConfig) -> Arc<Self> {
        Self::with_socket(config, get_socket_path(config))
    }

    /// Create a server bound to an explicit socket path
    pub fn with_socket(config: &AppConfig, socket_path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            index: LocationIndex::with_policy(config.empty_upload),
            socket_path,
            max_upload_bytes: config.max_upload_bytes,
            stats: ServerStats::new(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn index(&self) -> &LocationIndex {
        &self.index
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Start the server (blocking)
    pub fn run(self: &Arc<Self>) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener)
    }

    /// Bind the socket and write the PID file
    pub fn bind(&self) -> Result<UnixListener> {
        let socket_path = &self.socket_path;

        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if socket_path.exists() {
            fs::remove_file(socket_path)?;
        }

        fs::write(get_pid_path(socket_path), format!("{}", std::process::id()))?;

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind to {}", socket_path.display()))?;

        // Set socket permissions (user only)
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(socket_path, fs::Permissions::from_mode(0o600))?;
        }

        info!(socket = %socket_path.display(), "listening");
        Ok(listener)
    }

    /// Accept connections on `listener` until a shutdown request arrives
    pub fn serve(self: &Arc<Self>, listener: UnixListener) -> Result<()> {
        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let _ = stream.set_read_timeout(Some(CONNECTION_TIMEOUT));
                    let _ = stream.set_write_timeout(Some(CONNECTION_TIMEOUT));

                    let server = Arc::clone(self);
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream) {
                            warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }

        info!("shutting down");
        let _ = fs::remove_file(&self.socket_path);
        let _ = fs::remove_file(get_pid_path(&self.socket_path));

        Ok(())
    }

    /// Handle a single client connection
    fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request: Request = match read_message(&mut reader) {
                Ok(req) => req,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Client disconnected
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    // An oversized frame leaves its body unread, so the
                    // stream cannot be trusted past this point
                    let resp = Response::Rejected {
                        message: format!("Invalid request: {}", e),
                    };
                    write_message(&mut writer, &resp)?;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let response = self.handle_request(request);
            write_message(&mut writer, &response)?;

            if matches!(response, Response::ShuttingDown) {
                // Wake the accept loop so it sees the flag
                let _ = UnixStream::connect(&self.socket_path);
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request
    pub fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Search { location } => self.handle_search(location),

            Request::Upload { path } => self.handle_upload(&path),

            Request::Status => self.handle_status(),

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::ShuttingDown
            }

            Request::Ping => Response::Pong,
        }
    }

    /// Handle a search request
    fn handle_search(&self, location: String) -> Response {
        let start = Instant::now();

        let hit = match self.index.search_with_generation(&location) {
            Ok(hit) => hit,
            Err(e) => {
                return Response::Rejected {
                    message: e.to_string(),
                }
            }
        };

        self.stats.searches_served.fetch_add(1, Ordering::Relaxed);

        if hit.platforms.is_empty() {
            debug!(location = %location, "no platforms found");
            return Response::NotFound { location };
        }

        let mut platforms: Vec<String> = hit
            .platforms
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        platforms.sort();

        Response::Search(SearchResponse {
            location,
            platforms,
            generation: hit.generation,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    /// Handle an upload request
    fn handle_upload(&self, path: &Path) -> Response {
        info!(path = %path.display(), "upload requested");

        match validate_upload(path, self.max_upload_bytes) {
            Ok(()) => {}
            Err(UploadError::Io(e)) => {
                return Response::Error {
                    message: format!("File processing error: {}", e),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), reason = %e, "upload rejected");
                return Response::Rejected {
                    message: e.to_string(),
                };
            }
        }

        let outcome = match parse_file(path) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to parse upload");
                return Response::Error {
                    message: format!("File processing error: {}", e),
                };
            }
        };

        if outcome.platforms.is_empty() {
            warn!(path = %path.display(), "upload contains no valid platforms");
            return Response::Rejected {
                message: "The file is empty or contains incorrect data.".to_string(),
            };
        }

        let platforms = outcome.platforms.len();
        let skipped_lines = outcome.skipped.len();

        let replaced = self.index.replace(outcome.platforms);
        let generation = replaced.generation();
        let (locations, failed_platforms) = match &replaced {
            ReplaceOutcome::Installed(report) => (report.locations, report.failures.len()),
            ReplaceOutcome::Cleared { .. } | ReplaceOutcome::Ignored => (0, 0),
        };

        if generation.is_some() {
            self.stats.uploads_accepted.fetch_add(1, Ordering::Relaxed);
        }

        Response::Uploaded(UploadResponse {
            platforms,
            locations,
            skipped_lines,
            failed_platforms,
            generation,
        })
    }

    /// Handle status request
    fn handle_status(&self) -> Response {
        Response::Status(StatusResponse {
            uptime_secs: self.stats.start_time.elapsed().as_secs(),
            index: self.index.stats(),
            searches_served: self.stats.searches_served.load(Ordering::Relaxed),
            uploads_accepted: self.stats.uploads_accepted.load(Ordering::Relaxed),
            empty_upload: self.index.empty_policy(),
            socket_path: self.socket_path.clone(),
        })
    }
}

/// Detach from the terminal and run the server in a grandchild process
///
/// Returns in the calling process once the intermediate child has exited.
pub fn daemonize(config: &AppConfig) -> Result<()> {
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("fork failed"),
        0 => {}
        _ => {
            let mut status: libc::c_int = 0;
            unsafe { libc::wait(&mut status) };
            return Ok(());
        }
    }

    if unsafe { libc::setsid() } == -1 {
        anyhow::bail!("setsid failed");
    }

    // The session leader exits so the server can never regain a terminal
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("fork failed"),
        0 => run_detached(config),
        _ => std::process::exit(0),
    }
}

fn run_detached(config: &AppConfig) -> ! {
    redirect_stdio_to_null();
    let _ = std::env::set_current_dir("/");

    if let Ok(log_path) = get_daemon_log_path() {
        init_logging(config.log_filter.as_deref(), false, LogTarget::File(&log_path));
    }

    let code = match LocationServer::new(config).run() {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "server failed");
            1
        }
    };
    std::process::exit(code)
}

fn redirect_stdio_to_null() {
    unsafe {
        let null = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
        if null == -1 {
            return;
        }
        for fd in 0..=2 {
            libc::dup2(null, fd);
        }
        if null > 2 {
            libc::close(null);
        }
    }
}

/// Run the server on the current thread, logging to stderr
pub fn run_foreground(config: &AppConfig) -> Result<()> {
    LocationServer::new(config).run()
}

/// Terminate the daemon that owns `socket_path`
///
/// Sends SIGTERM, escalates to SIGKILL after a grace period, then removes
/// the socket and pid files. Returns false when no pid file exists.
pub fn stop_daemon(socket_path: &Path) -> Result<bool> {
    const GRACE_POLLS: u32 = 15;
    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    let pid_path = get_pid_path(socket_path);
    if !pid_path.exists() {
        return Ok(false);
    }

    let pid: libc::pid_t = fs::read_to_string(&pid_path)?
        .trim()
        .parse()
        .with_context(|| format!("Malformed pid file {}", pid_path.display()))?;

    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        let exited = (0..GRACE_POLLS).any(|_| {
            thread::sleep(POLL_INTERVAL);
            !process_alive(pid)
        });
        if !exited {
            warn!(pid, "daemon ignored SIGTERM, killing");
            unsafe { libc::kill(pid, libc::SIGKILL) };
        }
    }

    let _ = fs::remove_file(socket_path);
    let _ = fs::remove_file(&pid_path);

    Ok(true)
}

fn process_alive(pid: libc::pid_t) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EmptyUploadPolicy;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> Arc<LocationServer> {
        LocationServer::with_socket(&AppConfig::default(), dir.path().join("locix.sock"))
    }

    #[test]
    fn test_search_before_upload_is_not_found() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let response = server.handle_request(Request::Search {
            location: "/ru".to_string(),
        });
        assert!(matches!(response, Response::NotFound { .. }));
    }

    #[test]
    fn test_empty_location_is_rejected() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let response = server.handle_request(Request::Search {
            location: String::new(),
        });
        assert!(matches!(response, Response::Rejected { .. }));
    }

    #[test]
    fn test_upload_then_search() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let path = dir.path().join("platforms.txt");
        fs::write(
            &path,
            "Яндекс.Директ:/ru\nРевдинский рабочий:/ru/svrd/revda,/ru/svrd/pervik\nbroken line\n",
        )
        .unwrap();

        let response = server.handle_request(Request::Upload { path });
        let upload = match response {
            Response::Uploaded(upload) => upload,
            other => panic!("unexpected response: {:?}", other),
        };
        assert_eq!(upload.platforms, 2);
        assert_eq!(upload.locations, 3);
        assert_eq!(upload.skipped_lines, 1);
        assert_eq!(upload.generation, Some(1));

        let response = server.handle_request(Request::Search {
            location: "ru/svrd/revda/".to_string(),
        });
        match response {
            Response::Search(sr) => {
                assert_eq!(sr.platforms, vec!["Ревдинский рабочий", "Яндекс.Директ"]);
                assert_eq!(sr.generation, 1);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_upload_without_platforms_keeps_index() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);

        let good = dir.path().join("good.txt");
        fs::write(&good, "A:/ru\n").unwrap();
        server.handle_request(Request::Upload { path: good });

        let junk = dir.path().join("junk.txt");
        fs::write(&junk, ":nothing\nno separator\n").unwrap();
        let response = server.handle_request(Request::Upload { path: junk });
        assert!(matches!(response, Response::Rejected { .. }));

        let response = server.handle_request(Request::Search {
            location: "/ru".to_string(),
        });
        assert!(matches!(response, Response::Search(_)));
    }

    #[test]
    fn test_status_counts_requests() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        server.handle_request(Request::Search {
            location: "/ru".to_string(),
        });

        match server.handle_request(Request::Status) {
            Response::Status(status) => {
                assert_eq!(status.searches_served, 1);
                assert_eq!(status.uploads_accepted, 0);
                assert_eq!(status.index.generation, 0);
                assert_eq!(status.empty_upload, EmptyUploadPolicy::Ignore);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_frame_closes_connection() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        let (mut client, server_end) = UnixStream::pair().unwrap();

        let handle = {
            let server = Arc::clone(&server);
            thread::spawn(move || server.handle_connection(server_end))
        };

        // Length prefix far above the cap, followed by a would-be frame
        client.write_all(&u32::MAX.to_le_bytes()).unwrap();
        client.write_all(b"\x05\x00\x00\x00{}{}{}").unwrap();

        let response: Response = read_message(&mut client).unwrap();
        assert!(matches!(response, Response::Rejected { .. }));

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).unwrap();
        assert!(rest.is_empty());

        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_status_reports_empty_upload_policy() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            empty_upload: EmptyUploadPolicy::Clear,
            ..AppConfig::default()
        };
        let server = LocationServer::with_socket(&config, dir.path().join("locix.sock"));

        match server.handle_request(Request::Status) {
            Response::Status(status) => assert_eq!(status.empty_upload, EmptyUploadPolicy::Clear),
            other => panic!("unexpected response: {:?}", other),
        }
    }
}
