//! Error types for DA image scanning.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced while reading or decoding a DA loader image.
///
/// An ambiguous vulnerability status is never reported as "not vulnerable":
/// any decode failure aborts the scan of that file with one of these. An
/// absent trailing metadata block is not an error; it decodes to `None`
/// (see [`crate::da::EntryTrailer`]).
#[derive(Debug, Error)]
pub enum ScanError {
    /// Path does not resolve to a readable file.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O failure while reading the image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Mandatory fixed-width bytes (header, entry fields, or region list)
    /// could not be read in full.
    #[error("truncated DA image: need {needed} bytes at offset {offset:#x}, {available} available")]
    TruncatedHeader {
        offset: usize,
        needed: usize,
        available: usize,
    },
}
