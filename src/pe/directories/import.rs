//! Import directory parsing.
//!
//! Unlike the header chain, a damaged import table is not fatal: the walk
//! stops at the first entry it cannot resolve and keeps everything parsed
//! up to that point. The counts feed the `ImportsNbDLL` and `ImportsNb`
//! features.

use tracing::debug;

use crate::pe::sections::SectionTable;
use crate::pe::types::*;
use crate::pe::utils::ReadExt;

/// Parsed import directory.
#[derive(Debug, Clone, Default)]
pub struct ImportTable<'a> {
    pub descriptors: Vec<ImportDescriptor<'a>>,
}

impl<'a> ImportTable<'a> {
    /// Number of import descriptors (DLLs).
    pub fn dll_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Total imported symbols across all descriptors, by name and by
    /// ordinal alike.
    pub fn count(&self) -> usize {
        self.descriptors.iter().map(|d| d.entries.len()).sum()
    }

    /// Entries imported from one DLL (case-sensitive name match).
    pub fn imports_from_dll(&self, dll: &str) -> Option<&[ImportEntry<'a>]> {
        self.descriptors
            .iter()
            .find(|d| d.dll_name == dll)
            .map(|d| d.entries.as_slice())
    }
}

/// Walk the import directory.
///
/// Descriptors are 20-byte records terminated by an all-zero record;
/// descriptors with a zero name RVA are skipped. Any unresolvable RVA or
/// truncated record ends the walk with the descriptors collected so far.
pub fn parse_imports<'a>(
    data: &'a [u8],
    sections: &SectionTable,
    import_dir: &DataDirectory,
    is_64bit: bool,
    options: &ParseOptions,
) -> ImportTable<'a> {
    let mut table = ImportTable::default();

    if !import_dir.is_present() {
        return table;
    }

    let Some(mut offset) = sections.rva_to_offset(import_dir.virtual_address) else {
        debug!(
            rva = import_dir.virtual_address,
            "import directory RVA does not map to the file; skipping imports"
        );
        return table;
    };

    let mut total_imports = 0usize;

    loop {
        let Some(desc_data) = data.read_slice_at(offset, 20) else {
            debug!(offset, "import descriptor table truncated");
            break;
        };

        // All-zero descriptor terminates the table.
        if desc_data.iter().all(|&b| b == 0) {
            break;
        }

        let original_first_thunk = data.read_u32_le_at(offset).unwrap();
        let name_rva = data.read_u32_le_at(offset + 12).unwrap();
        let first_thunk = data.read_u32_le_at(offset + 16).unwrap();

        if name_rva == 0 {
            offset += 20;
            continue;
        }

        let dll_name = sections
            .rva_to_offset(name_rva)
            .and_then(|name_offset| data.read_cstring_at(name_offset, 256));
        let Some(dll_name) = dll_name else {
            debug!(
                rva = name_rva,
                "import descriptor name does not resolve; stopping at {} DLLs",
                table.descriptors.len()
            );
            break;
        };

        let entries = parse_thunks(
            data,
            sections,
            original_first_thunk,
            first_thunk,
            is_64bit,
            options.max_imports.saturating_sub(total_imports),
        );

        total_imports += entries.len();

        table.descriptors.push(ImportDescriptor {
            dll_name,
            original_first_thunk,
            name_rva,
            first_thunk,
            entries,
        });

        offset += 20;

        if total_imports >= options.max_imports {
            debug!(cap = options.max_imports, "import count cap reached");
            break;
        }
    }

    table
}

fn parse_thunks<'a>(
    data: &'a [u8],
    sections: &SectionTable,
    original_first_thunk: u32,
    first_thunk: u32,
    is_64bit: bool,
    max_count: usize,
) -> Vec<ImportEntry<'a>> {
    let mut entries = Vec::new();

    // Prefer the import lookup table; bound images may have rewritten the
    // IAT in place.
    let thunk_rva = if original_first_thunk != 0 {
        original_first_thunk
    } else {
        first_thunk
    };

    if thunk_rva == 0 {
        return entries;
    }

    let Some(mut thunk_offset) = sections.rva_to_offset(thunk_rva) else {
        debug!(rva = thunk_rva, "thunk array RVA does not map to the file");
        return entries;
    };

    let entry_size = if is_64bit { 8 } else { 4 };

    while entries.len() < max_count {
        let val = if is_64bit {
            data.read_u64_le_at(thunk_offset)
        } else {
            data.read_u32_le_at(thunk_offset).map(u64::from)
        };
        let Some(val) = val else {
            debug!(offset = thunk_offset, "thunk array runs off the file");
            break;
        };

        // Zero thunk terminates the array.
        if val == 0 {
            break;
        }

        let ordinal_flag = if is_64bit { 1u64 << 63 } else { 1u64 << 31 };

        let entry = if val & ordinal_flag != 0 {
            ImportEntry {
                name: None,
                ordinal: Some((val & 0xFFFF) as u16),
                hint: None,
            }
        } else {
            // Hint/name record: u16 hint followed by a NUL-terminated name.
            let hint_name_rva = (val & 0x7FFF_FFFF) as u32;
            match sections.rva_to_offset(hint_name_rva) {
                Some(hint_offset) => ImportEntry {
                    name: data.read_cstring_at(hint_offset + 2, 512),
                    ordinal: None,
                    hint: data.read_u16_le_at(hint_offset),
                },
                None => ImportEntry {
                    name: None,
                    ordinal: None,
                    hint: None,
                },
            }
        };

        entries.push(entry);
        thunk_offset += entry_size;
    }

    entries
}
