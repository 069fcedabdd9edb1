//! DA analyzer: carbonara patch detection over stage-1 payload bytes.
//! Signatures from https://github.com/bkerler/mtkclient/blob/main/Tools/da_parser.py

use crate::da::parser::{classify, decode_entry, entry_count, DaEntry, HEADER_LEN};
use crate::error::ScanError;
use crate::result::{EntryReport, ScanReport, Verdict};

/// Known patched-instruction sequences (8 bytes each): ARM32, ARM64, and
/// Thumb-2 builds of the bounds-check fix. A stage-1 payload containing any
/// of these is patched against carbonara.
pub const CARBONARA_PATCH_SIGNATURES: [&[u8]; 3] = [
    b"\x01\x01\x54\xe3\x01\x14\xa0\xe3",
    b"\x08\x00\xa8\x52\xff\x02\x08\xeb",
    b"\x06\x9b\x4f\xf0\x80\x40\x02\xa9",
];

/// Check whether a stage-1 payload carries one of the known carbonara
/// patch signatures. First match short-circuits; order is irrelevant.
pub fn is_patched_against_carbonara(stage1: &[u8]) -> bool {
    CARBONARA_PATCH_SIGNATURES
        .iter()
        .any(|sig| stage1.windows(sig.len()).any(|w| w == *sig))
}

/// Slice the stage-1 payload (second region descriptor) out of the raw
/// image. `None` if the entry has fewer than two regions. The slice is
/// clamped to the end of the file, so a region pointing past EOF yields
/// the available bytes rather than failing.
pub fn stage1_bytes<'a>(entry: &DaEntry, data: &'a [u8]) -> Option<&'a [u8]> {
    let region = entry.regions.get(1)?;
    let start = (region.buffer_offset as usize).min(data.len());
    let end = (region.buffer_offset as usize)
        .saturating_add(region.length as usize)
        .min(data.len());
    Some(&data[start..end])
}

/// Boolean verdict for one decoded entry.
///
/// Absence of a patch signature is treated as presence of the vulnerability,
/// the conservative default. An entry with fewer than two regions has no
/// stage-1 payload to test and is reported not vulnerable.
pub fn is_vulnerable(entry: &DaEntry, data: &[u8]) -> bool {
    match stage1_bytes(entry, data) {
        Some(blob) => !is_patched_against_carbonara(blob),
        None => false,
    }
}

/// Scan a whole DA loader image: classify the header, decode every entry,
/// and test each entry's stage-1 payload.
pub fn scan(data: &[u8]) -> Result<ScanReport, ScanError> {
    if data.len() < HEADER_LEN {
        return Err(ScanError::TruncatedHeader {
            offset: 0,
            needed: HEADER_LEN,
            available: data.len(),
        });
    }
    let format = classify(data);
    let count = entry_count(data)?;

    let mut entries = Vec::with_capacity(count as usize);
    let mut warnings = Vec::new();

    for index in 0..count {
        let entry = decode_entry(data, format, index)?;

        if entry.trailer.is_none() {
            warnings.push(format!("entry {index}: trailing metadata block absent"));
        }

        let verdict = match entry.regions.get(1) {
            None => Verdict::NoStage1,
            Some(region) => {
                let blob = stage1_bytes(&entry, data).unwrap_or(&[]);
                if (blob.len() as u32) < region.length {
                    warnings.push(format!(
                        "entry {index}: stage-1 region {:#x}+{:#x} extends past end of file, scanning {} bytes",
                        region.buffer_offset,
                        region.length,
                        blob.len()
                    ));
                }
                if is_patched_against_carbonara(blob) {
                    Verdict::Patched
                } else {
                    Verdict::Vulnerable
                }
            }
        };

        entries.push(EntryReport {
            index,
            hw_code: entry.hw_code,
            hw_sub_code: entry.hw_sub_code,
            hw_version: entry.hw_version,
            sw_version: entry.sw_version,
            page_size: entry.page_size,
            region_count: entry.entry_region_count,
            stage1_offset: entry.regions.get(1).map(|r| r.buffer_offset),
            stage1_length: entry.regions.get(1).map(|r| r.length),
            verdict,
        });
    }

    Ok(ScanReport {
        format,
        entry_count: count,
        entries,
        warnings,
        size_bytes: data.len(),
    })
}
