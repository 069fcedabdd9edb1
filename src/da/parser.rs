//! Minimal MTK DA loader parser: format classification and entry decoding.
//! Layout as implemented by vendor flashing tools; see
//! https://github.com/bkerler/mtkclient/blob/main/Tools/da_parser.py

use crate::error::ScanError;

/// Fixed loader header length; the DA entry table starts right after it.
pub const HEADER_LEN: usize = 0x6C;
/// File offset of the little-endian u32 entry count.
pub const ENTRY_COUNT_OFFSET: usize = 0x68;

/// Legacy loaders carry a 0xDADA marker somewhere in the header.
const LEGACY_MARKER: &[u8] = b"\xDA\xDA";
/// v6 loaders carry an ASCII tag instead.
const V6_MARKER: &[u8] = b"MTK_DA_v6";

/// One region descriptor: five packed LE u32 fields.
const REGION_LEN: usize = 20;
/// Trailing metadata block: magic (2) + chip_id (2) + three u32 versions.
const TRAILER_LEN: usize = 16;

/// DA loader header layout variant.
///
/// `V5` is the documented best-effort default: headers with neither the
/// legacy nor the v6 marker are decoded with the v5 layout rather than
/// rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LoaderFormat {
    Legacy,
    V5,
    V6,
}

impl LoaderFormat {
    /// Byte stride between consecutive entries in the entry table.
    #[inline]
    pub fn entry_stride(self) -> usize {
        match self {
            LoaderFormat::Legacy => 0xD8,
            LoaderFormat::V5 | LoaderFormat::V6 => 0xDC,
        }
    }

    /// Length of the fixed fields before the region list. Legacy entries
    /// omit the sw_version/reserved1 pair.
    #[inline]
    pub fn fixed_len(self) -> usize {
        match self {
            LoaderFormat::Legacy => 16,
            LoaderFormat::V5 | LoaderFormat::V6 => 20,
        }
    }

    /// Short label for display (e.g. "DA legacy", "DAv5").
    pub fn label(self) -> &'static str {
        match self {
            LoaderFormat::Legacy => "DA legacy",
            LoaderFormat::V5 => "DAv5",
            LoaderFormat::V6 => "DAv6",
        }
    }
}

/// Memory-region descriptor referenced by a DA entry (20 bytes, LE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegionDescriptor {
    /// File offset (or device buffer address) of the referenced payload.
    pub buffer_offset: u32,
    /// Payload length in bytes.
    pub length: u32,
    /// Load address in target memory.
    pub start_address: u32,
    /// Offset within the payload at which load/execution begins.
    pub start_offset: u32,
    /// Length of a trailing signature block, if any.
    pub signature_length: u32,
}

/// Optional metadata block after the region list. All-or-nothing: decoded
/// only when 16 bytes remain in the entry window; absence is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EntryTrailer {
    pub magic: [u8; 2],
    pub chip_id: u16,
    pub chip_version: u32,
    pub firmware_version: u32,
    pub extra_version: u32,
}

/// One decoded DA entry: fixed fields, region list, optional trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DaEntry {
    pub magic: u16,
    pub hw_code: u16,
    pub hw_sub_code: u16,
    pub hw_version: u16,
    /// 0 for legacy entries (field not present in that layout).
    pub sw_version: u16,
    /// 0 for legacy entries (field not present in that layout).
    pub reserved1: u16,
    pub page_size: u16,
    pub reserved3: u16,
    pub entry_region_index: u16,
    pub entry_region_count: u16,
    /// Exactly `entry_region_count` descriptors, in file order.
    pub regions: Vec<RegionDescriptor>,
    pub trailer: Option<EntryTrailer>,
}

#[inline]
fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    if end > data.len() {
        return None;
    }
    Some(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

#[inline]
fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    if end > data.len() {
        return None;
    }
    Some(u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

#[inline]
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Classify the loader format from the header bytes.
///
/// Only the first [`HEADER_LEN`] bytes are consulted. Ordered priority test:
/// the legacy marker wins if both markers co-occur. Never fails; a header
/// with neither marker is a valid v5 loader.
pub fn classify(header: &[u8]) -> LoaderFormat {
    let window = &header[..header.len().min(HEADER_LEN)];
    if contains(window, LEGACY_MARKER) {
        LoaderFormat::Legacy
    } else if contains(window, V6_MARKER) {
        LoaderFormat::V6
    } else {
        LoaderFormat::V5
    }
}

/// Read the DA entry count (LE u32 at offset 0x68).
pub fn entry_count(data: &[u8]) -> Result<u32, ScanError> {
    read_u32_le(data, ENTRY_COUNT_OFFSET).ok_or(ScanError::TruncatedHeader {
        offset: ENTRY_COUNT_OFFSET,
        needed: 4,
        available: data.len().saturating_sub(ENTRY_COUNT_OFFSET),
    })
}

#[inline]
fn truncated(base: usize, idx: usize, needed: usize, window_len: usize) -> ScanError {
    ScanError::TruncatedHeader {
        offset: base + idx,
        needed,
        available: window_len.saturating_sub(idx),
    }
}

/// Decode entry `index` of a DA loader image.
///
/// The entry window starts at `0x6C + index * stride` and spans at most one
/// stride, clamped to the end of the file. Truncation of the fixed fields or
/// of the region list is a hard error; a missing trailer is not.
pub fn decode_entry(data: &[u8], format: LoaderFormat, index: u32) -> Result<DaEntry, ScanError> {
    let stride = format.entry_stride();
    let base = HEADER_LEN + index as usize * stride;
    let end = base.saturating_add(stride).min(data.len());
    if base >= data.len() {
        return Err(ScanError::TruncatedHeader {
            offset: base,
            needed: format.fixed_len(),
            available: 0,
        });
    }
    let entry = &data[base..end];

    let mut idx = 0usize;
    let take_u16 = |idx: &mut usize| -> Result<u16, ScanError> {
        let v = read_u16_le(entry, *idx).ok_or_else(|| truncated(base, *idx, 2, entry.len()))?;
        *idx += 2;
        Ok(v)
    };

    let magic = take_u16(&mut idx)?;
    let hw_code = take_u16(&mut idx)?;
    let hw_sub_code = take_u16(&mut idx)?;
    let hw_version = take_u16(&mut idx)?;
    let (sw_version, reserved1) = if format == LoaderFormat::Legacy {
        (0, 0)
    } else {
        (take_u16(&mut idx)?, take_u16(&mut idx)?)
    };
    let page_size = take_u16(&mut idx)?;
    let reserved3 = take_u16(&mut idx)?;
    let entry_region_index = take_u16(&mut idx)?;
    let entry_region_count = take_u16(&mut idx)?;

    let mut regions = Vec::with_capacity(entry_region_count as usize);
    for _ in 0..entry_region_count {
        if idx + REGION_LEN > entry.len() {
            return Err(truncated(base, idx, REGION_LEN, entry.len()));
        }
        let field = |k: usize| {
            let o = idx + 4 * k;
            u32::from_le_bytes([entry[o], entry[o + 1], entry[o + 2], entry[o + 3]])
        };
        regions.push(RegionDescriptor {
            buffer_offset: field(0),
            length: field(1),
            start_address: field(2),
            start_offset: field(3),
            signature_length: field(4),
        });
        idx += REGION_LEN;
    }

    let trailer = if idx + TRAILER_LEN <= entry.len() {
        Some(EntryTrailer {
            magic: [entry[idx], entry[idx + 1]],
            chip_id: u16::from_le_bytes([entry[idx + 2], entry[idx + 3]]),
            chip_version: u32::from_le_bytes([
                entry[idx + 4],
                entry[idx + 5],
                entry[idx + 6],
                entry[idx + 7],
            ]),
            firmware_version: u32::from_le_bytes([
                entry[idx + 8],
                entry[idx + 9],
                entry[idx + 10],
                entry[idx + 11],
            ]),
            extra_version: u32::from_le_bytes([
                entry[idx + 12],
                entry[idx + 13],
                entry[idx + 14],
                entry[idx + 15],
            ]),
        })
    } else {
        None
    };

    Ok(DaEntry {
        magic,
        hw_code,
        hw_sub_code,
        hw_version,
        sw_version,
        reserved1,
        page_size,
        reserved3,
        entry_region_index,
        entry_region_count,
        regions,
        trailer,
    })
}
