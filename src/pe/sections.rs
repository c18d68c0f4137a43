//! Section table parsing and RVA resolution.

use crate::entropy::shannon_entropy;
use crate::pe::types::*;
use crate::pe::utils::ReadExt;

/// Section table.
///
/// Sections are kept in file order (the order governs deterministic feature
/// aggregation); a separate index sorted by virtual address backs RVA
/// resolution with binary search.
#[derive(Debug, Clone)]
pub struct SectionTable {
    sections: Vec<Section>,
    by_va: Vec<usize>,
}

impl SectionTable {
    pub fn new(sections: Vec<Section>) -> Self {
        let mut by_va: Vec<usize> = (0..sections.len()).collect();
        by_va.sort_by_key(|&i| sections[i].header.virtual_address);
        Self { sections, by_va }
    }

    /// All sections, in file order.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.header.name() == name)
    }

    /// Convert an RVA to a file offset through the containing section.
    ///
    /// Arithmetic is done in u64: virtual address plus size can overflow
    /// u32 in a hostile header.
    #[inline]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        let rva = rva as u64;
        let idx = self
            .by_va
            .binary_search_by(|&i| {
                let h = &self.sections[i].header;
                let start = h.virtual_address as u64;
                let size = h.virtual_size.max(h.size_of_raw_data) as u64;
                if rva < start {
                    std::cmp::Ordering::Greater
                } else if rva >= start + size {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()?;

        let header = &self.sections[self.by_va[idx]].header;
        let delta = rva - header.virtual_address as u64;
        usize::try_from(header.pointer_to_raw_data as u64 + delta).ok()
    }
}

/// Parse `count` section headers (40 bytes each) at `offset`.
///
/// A section table that runs off the end of the image means the header
/// chain itself lied about its own extent and is fatal.
pub fn parse_section_headers(data: &[u8], offset: usize, count: u16) -> Result<Vec<SectionHeader>> {
    let mut sections = Vec::with_capacity(count as usize);

    for i in 0..count {
        let section_offset = offset
            .checked_add(i as usize * 40)
            .ok_or(PeError::TruncatedHeader {
                expected: usize::MAX,
                actual: data.len(),
            })?;
        if section_offset + 40 > data.len() {
            return Err(PeError::TruncatedHeader {
                expected: section_offset + 40,
                actual: data.len(),
            });
        }

        let mut name = [0u8; 8];
        name.copy_from_slice(&data[section_offset..section_offset + 8]);

        sections.push(SectionHeader {
            name,
            virtual_size: data.read_u32_le_at(section_offset + 8).unwrap(),
            virtual_address: data.read_u32_le_at(section_offset + 12).unwrap(),
            size_of_raw_data: data.read_u32_le_at(section_offset + 16).unwrap(),
            pointer_to_raw_data: data.read_u32_le_at(section_offset + 20).unwrap(),
        });
    }

    Ok(sections)
}

/// Attach raw-data ranges to section headers.
pub fn create_sections(headers: Vec<SectionHeader>) -> Vec<Section> {
    headers
        .into_iter()
        .map(|header| {
            let start = header.pointer_to_raw_data as usize;
            let end = start + header.size_of_raw_data as usize;
            Section {
                header,
                data: start..end,
            }
        })
        .collect()
}

impl Section {
    /// The section's raw bytes, clamped to the file bounds.
    ///
    /// A pointer/size pair past the end of the file yields the overlapping
    /// prefix, possibly empty; it never fails and never reads out of
    /// bounds.
    pub fn data<'a>(&self, file_data: &'a [u8]) -> &'a [u8] {
        let start = self.data.start.min(file_data.len());
        let end = self.data.end.min(file_data.len()).max(start);
        &file_data[start..end]
    }

    /// Shannon entropy of the clamped section data (0.0 when nothing maps).
    pub fn entropy(&self, file_data: &[u8]) -> f64 {
        shannon_entropy(self.data(file_data))
    }
}
