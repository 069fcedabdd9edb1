//! Scan result types: per-entry verdicts and the per-file report.

use crate::da::LoaderFormat;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Verdict for one DA entry's stage-1 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Verdict {
    /// No known patch signature in the stage-1 payload: exploitable.
    Vulnerable,
    /// A known patch instruction sequence was found in the stage-1 payload.
    Patched,
    /// Fewer than two region descriptors: no stage-1 payload to test.
    /// Conservative non-vulnerable default, not an affirmative "patched".
    NoStage1,
}

impl Verdict {
    /// Boolean verdict: `true` only for [`Verdict::Vulnerable`].
    #[inline]
    pub fn is_vulnerable(self) -> bool {
        matches!(self, Verdict::Vulnerable)
    }

    /// Short label for display.
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Vulnerable => "vulnerable",
            Verdict::Patched => "patched",
            Verdict::NoStage1 => "no stage-1 payload",
        }
    }
}

/// Verdict and key fields for one decoded DA entry.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EntryReport {
    /// Entry index in the DA table.
    pub index: u32,
    pub hw_code: u16,
    pub hw_sub_code: u16,
    pub hw_version: u16,
    /// 0 for legacy entries.
    pub sw_version: u16,
    pub page_size: u16,
    /// Number of region descriptors in the entry.
    pub region_count: u16,
    /// File offset of the stage-1 payload (second region), if present.
    pub stage1_offset: Option<u32>,
    /// Declared length of the stage-1 payload, if present.
    pub stage1_length: Option<u32>,
    pub verdict: Verdict,
}

/// Result of scanning one DA loader image.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScanReport {
    /// Header layout variant the image was decoded with.
    pub format: LoaderFormat,
    /// DA entry count from the header (offset 0x68).
    pub entry_count: u32,
    /// One report per entry, in table order.
    pub entries: Vec<EntryReport>,
    /// Decoding oddities that did not prevent a verdict (absent trailer,
    /// stage-1 region clamped at end of file).
    pub warnings: Vec<String>,
    /// Size of the input in bytes.
    pub size_bytes: usize,
}

impl ScanReport {
    /// Verdict of the first DA entry, the one vendor tooling acts on.
    /// `None` for an image whose header declares zero entries.
    pub fn first_verdict(&self) -> Option<Verdict> {
        self.entries.first().map(|e| e.verdict)
    }

    /// Boolean verdict of the first entry; `false` for an empty table.
    /// This is the value upstream catalog tooling persists as the
    /// `carbonara` flag for the file.
    pub fn is_vulnerable(&self) -> bool {
        self.first_verdict().is_some_and(Verdict::is_vulnerable)
    }

    /// `true` if any entry in the image is vulnerable.
    pub fn any_vulnerable(&self) -> bool {
        self.entries.iter().any(|e| e.verdict.is_vulnerable())
    }
}
