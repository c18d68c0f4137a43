use pevector::config::ExtractorConfig;
use pevector::features::Extractor;

use crate::common::{
    export_blob, import_blob, resource_blob, PeBuilder, ResLeaf, DIR_EXPORT, DIR_IMPORT,
    DIR_RESOURCE,
};

fn extract(data: &[u8]) -> pevector::FeatureVector {
    Extractor::new(ExtractorConfig::default())
        .extract_bytes(data)
        .unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn minimal_pe_yields_header_defaults_and_zero_aggregates() {
    let data = PeBuilder::pe32().build();
    let v = extract(&data);

    assert_eq!(v.size_of_code, 0);
    assert_eq!(v.size_of_initialized_data, 0);
    assert_eq!(v.address_of_entry_point, 0);
    assert_eq!(v.image_base, 0x40_0000);
    assert_eq!(v.subsystem, 0);
    assert_eq!(v.number_of_rva_and_sizes, 16);

    // No sections, no directories: every aggregate is zero.
    assert_close(v.sections_mean_entropy, 0.0);
    assert_close(v.sections_min_entropy, 0.0);
    assert_close(v.sections_max_entropy, 0.0);
    assert_eq!(v.imports_nb_dll, 0);
    assert_eq!(v.imports_nb, 0);
    assert_eq!(v.exports_nb, 0);
    assert_eq!(v.resources_nb, 0);
    assert_close(v.resources_mean_entropy, 0.0);
    assert_eq!(v.version_information_size, 0);
}

#[test]
fn full_pe32_populates_every_feature() {
    // .text holds each byte value once, so its entropy is exactly 8 bits.
    let text: Vec<u8> = (0u8..=255).collect();
    let imports = import_blob(
        0x3000,
        &[
            ("KERNEL32.dll", &["ExitProcess", "ReadFile"][..]),
            ("USER32.dll", &["MessageBoxA"][..]),
        ],
    );
    let exports = export_blob(0x4000, &["alpha", "beta"]);
    // One RT_VERSION leaf of constant bytes (entropy 0) and one leaf with
    // 16 distinct values (entropy 4).
    let version_payload = [0xAAu8; 0x30];
    let icon_payload: Vec<u8> = (0u8..16).collect();
    let resources = resource_blob(
        0x5000,
        &[
            ResLeaf::Data(16, &version_payload),
            ResLeaf::Data(3, &icon_payload),
        ],
    );

    let import_len = imports.len() as u32;
    let export_len = exports.len() as u32;
    let resource_len = resources.len() as u32;

    let data = PeBuilder::pe32()
        .entry_point(0x1000)
        .subsystem(2)
        .dll_characteristics(0x8140)
        .size_of_code(0x200)
        .size_of_initialized_data(0x400)
        .stack_reserve(0x10_0000)
        .heap_reserve(0x1_0000)
        .section(".text", 0x1000, text)
        .section(".idata", 0x3000, imports)
        .section(".edata", 0x4000, exports)
        .section(".rsrc", 0x5000, resources)
        .directory(DIR_IMPORT, 0x3000, import_len)
        .directory(DIR_EXPORT, 0x4000, export_len)
        .directory(DIR_RESOURCE, 0x5000, resource_len)
        .build();

    let v = extract(&data);

    assert_eq!(v.size_of_code, 0x200);
    assert_eq!(v.size_of_initialized_data, 0x400);
    assert_eq!(v.address_of_entry_point, 0x1000);
    assert_eq!(v.image_base, 0x40_0000);
    assert_eq!(v.subsystem, 2);
    assert_eq!(v.dll_characteristics, 0x8140);
    assert_eq!(v.size_of_stack_reserve, 0x10_0000);
    assert_eq!(v.size_of_heap_reserve, 0x1_0000);
    assert_eq!(v.number_of_rva_and_sizes, 16);

    assert_close(v.sections_max_entropy, 8.0);
    assert!(v.sections_min_entropy >= 0.0);
    assert!(v.sections_mean_entropy >= v.sections_min_entropy);
    assert!(v.sections_mean_entropy <= v.sections_max_entropy);

    assert_eq!(v.imports_nb_dll, 2);
    assert_eq!(v.imports_nb, 3);
    assert_eq!(v.exports_nb, 2);

    assert_eq!(v.resources_nb, 2);
    assert_close(v.resources_min_entropy, 0.0);
    assert_close(v.resources_max_entropy, 4.0);
    assert_close(v.resources_mean_entropy, 2.0);
    assert_eq!(v.version_information_size, 0x30);
}

#[test]
fn pe32plus_reads_wide_header_fields() {
    let data = PeBuilder::pe32plus()
        .stack_reserve(0x1_0000_0000)
        .heap_reserve(0x2_0000_0000)
        .build();
    let v = extract(&data);

    assert_eq!(v.image_base, 0x1_4000_0000);
    assert_eq!(v.size_of_stack_reserve, 0x1_0000_0000);
    assert_eq!(v.size_of_heap_reserve, 0x2_0000_0000);
}

#[test]
fn corrupt_resource_leaf_drops_out_of_counts_and_aggregates() {
    let payload: Vec<u8> = (0u8..16).collect();
    let resources = resource_blob(
        0x2000,
        &[
            ResLeaf::Data(16, &payload),
            ResLeaf::Corrupt(3),
            ResLeaf::Data(3, &payload),
        ],
    );
    let resource_len = resources.len() as u32;

    let data = PeBuilder::pe32()
        .section(".rsrc", 0x2000, resources)
        .directory(DIR_RESOURCE, 0x2000, resource_len)
        .build();
    let v = extract(&data);

    // Three leaves in the tree, two of them resolvable.
    assert_eq!(v.resources_nb, 2);
    assert_close(v.resources_mean_entropy, 4.0);
    assert_eq!(v.version_information_size, payload.len() as u64);
}

#[test]
fn imports_by_ordinal_count_toward_the_total() {
    use crate::common::put_u32;

    // One descriptor plus terminator, then a thunk array mixing a
    // hint/name import with an ordinal import.
    let va = 0x2000u32;
    let mut imports = vec![0u8; 0x60];
    put_u32(&mut imports, 0, va + 40); // original first thunk
    put_u32(&mut imports, 12, va + 0x58); // DLL name
    put_u32(&mut imports, 16, va + 40);

    put_u32(&mut imports, 40, va + 0x40); // hint/name record
    put_u32(&mut imports, 44, 0x8000_0007); // ordinal 7, then terminator

    imports[0x42..0x47].copy_from_slice(b"Named");
    imports[0x58..0x5D].copy_from_slice(b"a.dll");

    let import_len = imports.len() as u32;
    let data = PeBuilder::pe32()
        .section(".idata", 0x2000, imports)
        .directory(DIR_IMPORT, 0x2000, import_len)
        .build();
    let v = extract(&data);

    assert_eq!(v.imports_nb_dll, 1);
    assert_eq!(v.imports_nb, 2);
}
