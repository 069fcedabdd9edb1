//! # carbonara
//!
//! Library to check MediaTek "Download Agent" (DA) loader images for the
//! carbonara arbitrary-code-execution vulnerability. Parses the nested,
//! variant-dependent loader header (legacy / v5 / v6), decodes the DA entry
//! table with its per-entry memory-region descriptors, and scans the stage-1
//! payload referenced by the second region for known patch instruction
//! signatures.
//!
//! Slice-based parsing over one in-memory buffer, minimal allocations; each
//! file scan is independent, so callers may run many scans in parallel.
//!
//! ## Format variants
//!
//! - **Legacy** — header contains the `0xDADA` marker; entries omit the
//!   `sw_version`/`reserved1` pair and use a 0xD8 entry stride.
//! - **v5** — the default layout for headers with no recognized marker
//!   (documented best-effort fallback, not an error); 0xDC stride.
//! - **v6** — header contains the ASCII `MTK_DA_v6` tag; same entry layout
//!   as v5.
//!
//! Layout and signatures follow mtkclient's `Tools/da_parser.py`
//! (<https://github.com/bkerler/mtkclient>).
//!
//! ## Example
//!
//! ```no_run
//! let report = carbonara::scan_file("DA_loader.bin").unwrap();
//! if report.is_vulnerable() {
//!     println!("vulnerable: {:?}", report.first_verdict());
//! }
//! for entry in &report.entries {
//!     println!("entry {}: {}", entry.index, entry.verdict.label());
//! }
//! ```
//!
//! The boolean from [`ScanReport::is_vulnerable`] (first-entry verdict, as
//! in the original vendor tooling) is what upstream device-catalog tools
//! persist as the `carbonara` flag for a DA file; [`ScanReport::entries`]
//! exposes the per-entry verdicts for callers that want all of them.

mod error;
mod result;
pub mod da;

pub use da::{
    classify, decode_entry, entry_count, is_patched_against_carbonara, is_vulnerable,
    stage1_bytes, DaEntry, EntryTrailer, LoaderFormat, RegionDescriptor,
    CARBONARA_PATCH_SIGNATURES, ENTRY_COUNT_OFFSET, HEADER_LEN,
};
pub use error::ScanError;
pub use result::{EntryReport, ScanReport, Verdict};

use std::fs;
use std::path::Path;

/// Scan an in-memory DA loader image.
///
/// Classifies the header, decodes every entry the header declares, and
/// produces a per-entry verdict. Fails with [`ScanError::TruncatedHeader`]
/// when mandatory bytes are missing; a truncated image never silently
/// reports "not vulnerable".
#[inline]
pub fn scan(data: &[u8]) -> Result<ScanReport, ScanError> {
    da::scan(data)
}

/// Read a DA loader image from disk and scan it.
///
/// The file handle is scoped to the read; the scan itself runs over the
/// in-memory bytes.
pub fn scan_file<P: AsRef<Path>>(path: P) -> Result<ScanReport, ScanError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ScanError::FileNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    scan(&bytes)
}
