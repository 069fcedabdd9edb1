//! DA decoder and carbonara scanner tests over synthetic loader images.

use carbonara::{
    classify, decode_entry, entry_count, is_patched_against_carbonara, is_vulnerable, scan,
    LoaderFormat, ScanError, Verdict, CARBONARA_PATCH_SIGNATURES, HEADER_LEN,
};

/// Build a loader header: format marker plus entry count at 0x68.
fn da_header(format: LoaderFormat, count: u32) -> Vec<u8> {
    let mut v = vec![0u8; HEADER_LEN];
    match format {
        LoaderFormat::Legacy => v[0..2].copy_from_slice(b"\xDA\xDA"),
        LoaderFormat::V6 => v[0..9].copy_from_slice(b"MTK_DA_v6"),
        LoaderFormat::V5 => {}
    }
    v[0x68..0x6C].copy_from_slice(&count.to_le_bytes());
    v
}

/// Append one stride-sized DA entry with the given magic and regions
/// (each region is [buffer_offset, length, start_address, start_offset,
/// signature_length]). Zero-pads to the stride, so a trailer of zeros is
/// always decodable.
fn push_entry(v: &mut Vec<u8>, format: LoaderFormat, magic: u16, regions: &[[u32; 5]]) {
    let mut e = Vec::new();
    e.extend_from_slice(&magic.to_le_bytes());
    e.extend_from_slice(&0x0707u16.to_le_bytes()); // hw_code
    e.extend_from_slice(&0x8A00u16.to_le_bytes()); // hw_sub_code
    e.extend_from_slice(&0xCA00u16.to_le_bytes()); // hw_version
    if format != LoaderFormat::Legacy {
        e.extend_from_slice(&0x0001u16.to_le_bytes()); // sw_version
        e.extend_from_slice(&0u16.to_le_bytes()); // reserved1
    }
    e.extend_from_slice(&0x0800u16.to_le_bytes()); // page_size
    e.extend_from_slice(&0u16.to_le_bytes()); // reserved3
    e.extend_from_slice(&0u16.to_le_bytes()); // entry_region_index
    e.extend_from_slice(&(regions.len() as u16).to_le_bytes());
    for r in regions {
        for field in r {
            e.extend_from_slice(&field.to_le_bytes());
        }
    }
    e.resize(format.entry_stride(), 0);
    v.extend_from_slice(&e);
}

/// One-entry image whose second region points at `stage1`, appended after
/// the entry table.
fn one_entry_image(format: LoaderFormat, stage1: &[u8]) -> Vec<u8> {
    let blob_offset = (HEADER_LEN + format.entry_stride()) as u32;
    let mut v = da_header(format, 1);
    push_entry(
        &mut v,
        format,
        0xDADA,
        &[
            [0, 0x100, 0x2000_0000, 0, 0],
            [blob_offset, stage1.len() as u32, 0x4000_0000, 0, 0x100],
        ],
    );
    v.extend_from_slice(stage1);
    v
}

#[test]
fn patched_signature_blob_is_not_vulnerable() {
    for sig in CARBONARA_PATCH_SIGNATURES {
        let report = scan(&one_entry_image(LoaderFormat::V5, sig)).unwrap();
        assert_eq!(report.first_verdict(), Some(Verdict::Patched));
        assert!(!report.is_vulnerable());
    }
}

#[test]
fn unpatched_blob_is_vulnerable() {
    let report = scan(&one_entry_image(LoaderFormat::V5, &[0u8; 8])).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::Vulnerable));
    assert!(report.is_vulnerable());
}

#[test]
fn signature_in_the_middle_of_a_larger_blob() {
    let mut blob = vec![0x41u8; 256];
    blob[100..108].copy_from_slice(CARBONARA_PATCH_SIGNATURES[2]);
    let report = scan(&one_entry_image(LoaderFormat::V6, &blob)).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::Patched));
}

#[test]
fn legacy_scenario_patched() {
    // Spec'd scenario: 0xDADA at offset 0, count_da = 1, second region
    // pointing at the ARM32 patch sequence.
    let img = one_entry_image(LoaderFormat::Legacy, b"\x01\x01\x54\xe3\x01\x14\xa0\xe3");
    assert_eq!(classify(&img), LoaderFormat::Legacy);
    let report = scan(&img).unwrap();
    assert!(!report.is_vulnerable());
}

#[test]
fn legacy_scenario_zero_blob_vulnerable() {
    let img = one_entry_image(LoaderFormat::Legacy, &[0u8; 8]);
    let report = scan(&img).unwrap();
    assert!(report.is_vulnerable());
}

#[test]
fn single_region_entry_is_never_vulnerable() {
    // Even with a blob full of non-signature bytes in the file, one region
    // means no stage-1 payload and thus no verdict of vulnerable.
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v, LoaderFormat::V5, 0xDADA, &[[0, 0x100, 0, 0, 0]]);
    v.extend_from_slice(&[0x41u8; 64]);
    let report = scan(&v).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::NoStage1));
    assert!(!report.is_vulnerable());
}

#[test]
fn zero_region_entry_is_never_vulnerable() {
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v, LoaderFormat::V5, 0xDADA, &[]);
    let report = scan(&v).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::NoStage1));
}

#[test]
fn classifier_is_idempotent_and_legacy_wins() {
    let mut h = da_header(LoaderFormat::V6, 0);
    assert_eq!(classify(&h), classify(&h));
    assert_eq!(classify(&h), LoaderFormat::V6);
    // Both markers present: the legacy marker takes precedence.
    h[0x30..0x32].copy_from_slice(b"\xDA\xDA");
    assert_eq!(classify(&h), LoaderFormat::Legacy);
}

#[test]
fn stride_places_entries_correctly() {
    for format in [LoaderFormat::Legacy, LoaderFormat::V5] {
        let magics = [0x1111u16, 0x2222, 0x3333];
        let mut v = da_header(format, 3);
        for m in magics {
            push_entry(&mut v, format, m, &[]);
        }
        assert_eq!(entry_count(&v).unwrap(), 3);
        for (i, m) in magics.iter().enumerate() {
            let off = HEADER_LEN + i * format.entry_stride();
            assert_eq!(u16::from_le_bytes([v[off], v[off + 1]]), *m);
            let entry = decode_entry(&v, format, i as u32).unwrap();
            assert_eq!(entry.magic, *m);
        }
    }
}

#[test]
fn legacy_field_shift_equivalence() {
    // Same logical entry, once with the sw_version/reserved1 pair (v5) and
    // once without (legacy): everything from page_size onward must agree.
    let region = [
        [0x1000u32, 0x40, 0x2000_0000, 0, 0x100],
        [0x2000, 0x80, 0x4000_0000, 4, 0x100],
    ];
    let mut v5 = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v5, LoaderFormat::V5, 0xDADA, &region);
    let mut legacy = da_header(LoaderFormat::Legacy, 1);
    push_entry(&mut legacy, LoaderFormat::Legacy, 0xDADA, &region);

    let a = decode_entry(&v5, LoaderFormat::V5, 0).unwrap();
    let b = decode_entry(&legacy, LoaderFormat::Legacy, 0).unwrap();
    assert_eq!(b.sw_version, 0);
    assert_eq!(b.reserved1, 0);
    assert_eq!(a.page_size, b.page_size);
    assert_eq!(a.reserved3, b.reserved3);
    assert_eq!(a.entry_region_index, b.entry_region_index);
    assert_eq!(a.entry_region_count, b.entry_region_count);
    assert_eq!(a.regions, b.regions);
}

#[test]
fn trailer_decoded_when_present() {
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v, LoaderFormat::V5, 0xDADA, &[]);
    // Overwrite the zero padding right after the (empty) region list.
    let t = HEADER_LEN + 20;
    v[t..t + 2].copy_from_slice(b"\xBB\xBB");
    v[t + 2..t + 4].copy_from_slice(&0x0707u16.to_le_bytes());
    v[t + 4..t + 8].copy_from_slice(&0xCA00u32.to_le_bytes());
    v[t + 8..t + 12].copy_from_slice(&3u32.to_le_bytes());
    v[t + 12..t + 16].copy_from_slice(&7u32.to_le_bytes());
    let entry = decode_entry(&v, LoaderFormat::V5, 0).unwrap();
    let trailer = entry.trailer.unwrap();
    assert_eq!(trailer.magic, *b"\xBB\xBB");
    assert_eq!(trailer.chip_id, 0x0707);
    assert_eq!(trailer.chip_version, 0xCA00);
    assert_eq!(trailer.firmware_version, 3);
    assert_eq!(trailer.extra_version, 7);
}

#[test]
fn absent_trailer_is_not_an_error() {
    // File ends right after the region list: trailer degrades to None.
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v, LoaderFormat::V5, 0xDADA, &[[0, 0, 0, 0, 0]]);
    v.truncate(HEADER_LEN + 20 + 20);
    let entry = decode_entry(&v, LoaderFormat::V5, 0).unwrap();
    assert_eq!(entry.entry_region_count, 1);
    assert!(entry.trailer.is_none());

    let report = scan(&v).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::NoStage1));
    assert!(report.warnings.iter().any(|w| w.contains("trailing")));
}

#[test]
fn truncated_header_is_a_hard_error() {
    let err = scan(&[0u8; 0x40]).unwrap_err();
    assert!(matches!(err, ScanError::TruncatedHeader { .. }));
    let err = entry_count(&[0u8; 0x6A]).unwrap_err();
    assert!(matches!(err, ScanError::TruncatedHeader { .. }));
}

#[test]
fn truncated_entry_fixed_fields_is_a_hard_error() {
    // Header says one entry but the file ends mid-fixed-fields.
    let mut v = da_header(LoaderFormat::V5, 1);
    v.extend_from_slice(&[0u8; 10]);
    let err = decode_entry(&v, LoaderFormat::V5, 0).unwrap_err();
    assert!(matches!(err, ScanError::TruncatedHeader { .. }));
    assert!(scan(&v).is_err());
}

#[test]
fn truncated_region_list_is_a_hard_error() {
    // entry_region_count = 2 but only one descriptor fits in the file.
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(&mut v, LoaderFormat::V5, 0xDADA, &[[0, 0, 0, 0, 0], [0, 0, 0, 0, 0]]);
    v.truncate(HEADER_LEN + 20 + 20 + 8);
    let err = decode_entry(&v, LoaderFormat::V5, 0).unwrap_err();
    assert!(matches!(err, ScanError::TruncatedHeader { .. }));
}

#[test]
fn stage1_region_past_eof_scans_available_bytes() {
    // Declared length runs past the end of the file; the scanner tests the
    // bytes that exist, like the original's bounded read.
    let blob_offset = (HEADER_LEN + LoaderFormat::V5.entry_stride()) as u32;
    let mut v = da_header(LoaderFormat::V5, 1);
    push_entry(
        &mut v,
        LoaderFormat::V5,
        0xDADA,
        &[[0, 0, 0, 0, 0], [blob_offset, 0x10000, 0, 0, 0]],
    );
    v.extend_from_slice(CARBONARA_PATCH_SIGNATURES[0]);
    let report = scan(&v).unwrap();
    assert_eq!(report.first_verdict(), Some(Verdict::Patched));
    assert!(report.warnings.iter().any(|w| w.contains("past end of file")));
}

#[test]
fn per_entry_verdicts_for_multi_entry_image() {
    let format = LoaderFormat::V5;
    let stride = format.entry_stride();
    let blob0 = (HEADER_LEN + 2 * stride) as u32;
    let blob1 = blob0 + 8;
    let mut v = da_header(format, 2);
    push_entry(&mut v, format, 0x1111, &[[0, 0, 0, 0, 0], [blob0, 8, 0, 0, 0]]);
    push_entry(&mut v, format, 0x2222, &[[0, 0, 0, 0, 0], [blob1, 8, 0, 0, 0]]);
    v.extend_from_slice(CARBONARA_PATCH_SIGNATURES[1]);
    v.extend_from_slice(&[0u8; 8]);

    let report = scan(&v).unwrap();
    assert_eq!(report.entry_count, 2);
    assert_eq!(report.entries.len(), 2);
    assert_eq!(report.entries[0].verdict, Verdict::Patched);
    assert_eq!(report.entries[1].verdict, Verdict::Vulnerable);
    // First-entry verdict is what the original tooling reports.
    assert!(!report.is_vulnerable());
    assert!(report.any_vulnerable());
}

#[test]
fn decoded_fields_round_trip() {
    let img = one_entry_image(LoaderFormat::V6, &[0u8; 8]);
    let entry = decode_entry(&img, LoaderFormat::V6, 0).unwrap();
    assert_eq!(entry.magic, 0xDADA);
    assert_eq!(entry.hw_code, 0x0707);
    assert_eq!(entry.hw_sub_code, 0x8A00);
    assert_eq!(entry.hw_version, 0xCA00);
    assert_eq!(entry.sw_version, 0x0001);
    assert_eq!(entry.page_size, 0x0800);
    assert_eq!(entry.entry_region_count, 2);
    assert_eq!(entry.regions[1].start_address, 0x4000_0000);
    assert_eq!(entry.regions[1].signature_length, 0x100);
    assert!(is_vulnerable(&entry, &img));
    assert!(!is_patched_against_carbonara(&img[entry.regions[1].buffer_offset as usize..]));
}
