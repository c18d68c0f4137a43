use std::fs;

use tempfile::TempDir;

use pevector::{is_pe_bytes, is_pe_path};

use crate::common::PeBuilder;

#[test]
fn mz_prefix_gates_byte_slices() {
    assert!(is_pe_bytes(&PeBuilder::pe32().build()));
    assert!(is_pe_bytes(b"MZ")); // prefix only, deeper damage is the parser's problem
    assert!(!is_pe_bytes(b""));
    assert!(!is_pe_bytes(b"M"));
    assert!(!is_pe_bytes(b"\x7fELF\x02\x01\x01"));
    assert!(!is_pe_bytes(b"ZM legacy headers are not accepted"));
}

#[test]
fn path_check_reads_only_the_prefix() {
    let dir = TempDir::new().unwrap();
    let pe = dir.path().join("x.exe");
    fs::write(&pe, PeBuilder::pe32().build()).unwrap();
    assert!(is_pe_path(&pe));

    let txt = dir.path().join("x.txt");
    fs::write(&txt, b"hello").unwrap();
    assert!(!is_pe_path(&txt));

    // Missing and unreadable paths are simply not PEs.
    assert!(!is_pe_path(dir.path().join("missing.exe")));
    assert!(!is_pe_path(dir.path()));
}
