//! Checks an upload file must pass before it reaches the record parser.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Only plain-text record files are accepted
const ALLOWED_EXTENSION: &str = "txt";

/// Bytes inspected when sniffing for binary content
const SNIFF_LEN: u64 = 8 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File is required")]
    Missing,
    #[error("Only .txt files are allowed")]
    WrongExtension,
    #[error("File is empty")]
    Empty,
    #[error("File is larger than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("Invalid file type")]
    NotText,
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Validate an upload file: `.txt`, non-empty, within `max_bytes`, and text
pub fn validate_upload(path: &Path, max_bytes: u64) -> Result<(), UploadError> {
    let metadata = match fs::metadata(path) {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(UploadError::Missing),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(UploadError::Missing),
        Err(e) => return Err(e.into()),
    };

    let has_txt_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ALLOWED_EXTENSION));
    if !has_txt_extension {
        return Err(UploadError::WrongExtension);
    }

    if metadata.len() == 0 {
        return Err(UploadError::Empty);
    }
    if metadata.len() > max_bytes {
        return Err(UploadError::TooLarge { limit: max_bytes });
    }

    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
    if memchr::memchr(0, &head).is_some() {
        return Err(UploadError::NotText);
    }

    Ok(())
}
