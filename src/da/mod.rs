//! MTK Download Agent (DA) loader parsing and carbonara patch detection.
//!
//! Layout reference:
//! - https://github.com/bkerler/mtkclient/blob/main/Tools/da_parser.py

mod parser;

pub mod analyzer;

pub use analyzer::{
    is_patched_against_carbonara, is_vulnerable, scan, stage1_bytes, CARBONARA_PATCH_SIGNATURES,
};
pub use parser::{
    classify, decode_entry, entry_count, DaEntry, EntryTrailer, LoaderFormat, RegionDescriptor,
    ENTRY_COUNT_OFFSET, HEADER_LEN,
};
