//! Export directory parsing.
//!
//! Same degradation discipline as the import walk: a directory that cannot
//! be established yields an empty table, a table that breaks partway keeps
//! the entries parsed so far. The entry count feeds the `ExportsNb`
//! feature.

use std::collections::HashMap;

use tracing::debug;

use crate::pe::sections::SectionTable;
use crate::pe::types::*;
use crate::pe::utils::ReadExt;

/// Parsed export directory.
#[derive(Debug, Clone, Default)]
pub struct ExportTable<'a> {
    pub dll_name: Option<&'a str>,
    pub ordinal_base: u32,
    pub exports: Vec<ExportEntry<'a>>,
}

impl<'a> ExportTable<'a> {
    /// Number of parsed export entries (zero-RVA slots excluded).
    pub fn count(&self) -> usize {
        self.exports.len()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.exports.iter().filter_map(|e| e.name).collect()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ExportEntry<'a>> {
        self.exports.iter().find(|e| e.name == Some(name))
    }
}

/// Parse the export directory (40-byte header, then the address, name and
/// ordinal tables).
pub fn parse_exports<'a>(
    data: &'a [u8],
    sections: &SectionTable,
    export_dir: &DataDirectory,
    options: &ParseOptions,
) -> ExportTable<'a> {
    if !export_dir.is_present() {
        return ExportTable::default();
    }

    let Some(dir_offset) = sections.rva_to_offset(export_dir.virtual_address) else {
        debug!(
            rva = export_dir.virtual_address,
            "export directory RVA does not map to the file; skipping exports"
        );
        return ExportTable::default();
    };

    if data.read_slice_at(dir_offset, 40).is_none() {
        debug!(offset = dir_offset, "export directory header truncated");
        return ExportTable::default();
    }

    let name_rva = data.read_u32_le_at(dir_offset + 12).unwrap();
    let ordinal_base = data.read_u32_le_at(dir_offset + 16).unwrap();
    let number_of_functions = data.read_u32_le_at(dir_offset + 20).unwrap();
    let number_of_names = data.read_u32_le_at(dir_offset + 24).unwrap();
    let address_table_rva = data.read_u32_le_at(dir_offset + 28).unwrap();
    let name_table_rva = data.read_u32_le_at(dir_offset + 32).unwrap();
    let ordinal_table_rva = data.read_u32_le_at(dir_offset + 36).unwrap();

    let dll_name = if name_rva != 0 {
        sections
            .rva_to_offset(name_rva)
            .and_then(|o| data.read_cstring_at(o, 256))
    } else {
        None
    };

    // The counts come from the file; cap them before trusting them.
    let number_of_functions = number_of_functions.min(options.max_exports as u32);
    let number_of_names = number_of_names.min(options.max_exports as u32);

    let Some(addr_offset) = sections.rva_to_offset(address_table_rva) else {
        debug!(
            rva = address_table_rva,
            "export address table RVA does not map to the file"
        );
        return ExportTable {
            dll_name,
            ordinal_base,
            exports: Vec::new(),
        };
    };

    let mut addresses = Vec::with_capacity(number_of_functions as usize);
    for i in 0..number_of_functions as usize {
        match data.read_u32_le_at(addr_offset + i * 4) {
            Some(rva) => addresses.push(rva),
            None => {
                debug!(index = i, "export address table runs off the file");
                break;
            }
        }
    }

    // Name table: parallel arrays of name RVAs (u32) and address-table
    // indices (u16).
    let mut name_map: HashMap<usize, &'a str> = HashMap::new();
    if number_of_names > 0 && name_table_rva != 0 && ordinal_table_rva != 0 {
        if let (Some(name_offset), Some(ord_offset)) = (
            sections.rva_to_offset(name_table_rva),
            sections.rva_to_offset(ordinal_table_rva),
        ) {
            for i in 0..number_of_names as usize {
                let (Some(name_rva), Some(ordinal_index)) = (
                    data.read_u32_le_at(name_offset + i * 4),
                    data.read_u16_le_at(ord_offset + i * 2),
                ) else {
                    debug!(index = i, "export name table runs off the file");
                    break;
                };

                if name_rva == 0 {
                    continue;
                }
                if let Some(name) = sections
                    .rva_to_offset(name_rva)
                    .and_then(|o| data.read_cstring_at(o, 512))
                {
                    name_map.insert(ordinal_index as usize, name);
                }
            }
        }
    }

    let mut exports = Vec::new();
    for (i, &rva) in addresses.iter().enumerate() {
        // Zero slots are unused ordinals, not exports.
        if rva == 0 {
            continue;
        }

        // An address inside the export directory is a forwarder string.
        let forwarder = if rva >= export_dir.virtual_address
            && (rva as u64) < export_dir.virtual_address as u64 + export_dir.size as u64
        {
            sections
                .rva_to_offset(rva)
                .and_then(|o| data.read_cstring_at(o, 256))
        } else {
            None
        };

        exports.push(ExportEntry {
            name: name_map.get(&i).copied(),
            ordinal: ordinal_base.wrapping_add(i as u32),
            rva,
            forwarder,
        });
    }

    ExportTable {
        dll_name,
        ordinal_base,
        exports,
    }
}
