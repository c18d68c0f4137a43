use pevector::config::ExtractorConfig;
use pevector::error::Error;
use pevector::features::Extractor;

use crate::common::{export_blob, put_u32, PeBuilder, DIR_EXPORT, DIR_IMPORT};

fn extractor() -> Extractor {
    Extractor::new(ExtractorConfig::default())
}

#[test]
fn empty_and_garbage_inputs_fail_cleanly() {
    assert!(matches!(
        extractor().extract_bytes(&[]),
        Err(Error::Malformed(_))
    ));
    assert!(matches!(
        extractor().extract_bytes(&[0u8; 512]),
        Err(Error::Malformed(_))
    ));
    assert!(matches!(
        extractor().extract_bytes(b"MZ not actually a program"),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn truncated_header_chain_is_fatal() {
    let data = PeBuilder::pe32().build();

    // Cut inside the optional header.
    assert!(extractor().extract_bytes(&data[..0x90]).is_err());
    // Cut right after the DOS header, before the signature.
    assert!(extractor().extract_bytes(&data[..0x40]).is_err());
}

#[test]
fn lfanew_past_end_of_file_is_fatal() {
    let mut data = PeBuilder::pe32().build();
    put_u32(&mut data, 60, 0x0FFF_FFF0);
    assert!(matches!(
        extractor().extract_bytes(&data),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn unmappable_import_directory_degrades_to_zero_imports() {
    let data = PeBuilder::pe32()
        .section(".text", 0x1000, vec![0x90; 0x100])
        .directory(DIR_IMPORT, 0x00F0_0000, 0x100)
        .build();

    let v = extractor().extract_bytes(&data).unwrap();
    assert_eq!(v.imports_nb_dll, 0);
    assert_eq!(v.imports_nb, 0);
}

#[test]
fn export_counts_cap_under_inflated_header_counts() {
    let mut exports = export_blob(0x2000, &["one", "two"]);
    // Claim an absurd function count; parsing must stay bounded.
    put_u32(&mut exports, 20, 0x00FF_FFFF);
    let export_len = exports.len() as u32;

    let data = PeBuilder::pe32()
        .section(".edata", 0x2000, exports)
        .directory(DIR_EXPORT, 0x2000, export_len)
        .build();

    let v = extractor().extract_bytes(&data).unwrap();
    // The address table runs off the section into header padding; only
    // nonzero slots inside the file count.
    assert!(v.exports_nb >= 2);
    assert!(v.exports_nb < 100);
}

#[test]
fn section_raw_range_past_end_of_file_is_clamped() {
    let mut data = PeBuilder::pe32()
        .section(".text", 0x1000, vec![0x41; 0x100])
        .build();

    // Inflate the section's raw size far past the file end.
    let section_header = 0x98 + 0xE0;
    put_u32(&mut data, section_header + 16, 0xFFFF_F000);

    let v = extractor().extract_bytes(&data).unwrap();
    // Entropy is computed over the clamped slice, not an out-of-bounds
    // range.
    assert!(v.sections_max_entropy >= 0.0);
}

#[test]
fn oversize_file_is_rejected_at_load() {
    use std::io::Write as _;

    let mut config = ExtractorConfig::default();
    config.io.max_file_size = 16;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&PeBuilder::pe32().build()).unwrap();

    let result = Extractor::new(config).extract_path(file.path());
    assert!(result.is_err());
}
