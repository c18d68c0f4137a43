//! Resource directory parsing.
//!
//! The resource section is a tree: directory nodes (16 bytes, entry counts
//! at +12/+14) followed by 8-byte entries whose offset field selects,
//! through its top bit, either a nested directory or a 16-byte data leaf.
//! Well-formed images nest exactly three levels (type, name/id, language);
//! traversal is capped there and deeper structure is ignored. All offsets
//! inside the tree are relative to the start of the resource section.
//!
//! Leaf (RVA, size) pairs are resolved to file ranges through the section
//! table; a leaf whose range does not lie fully inside the image is kept in
//! the tree but marked corrupt (no data), so it drops out of the
//! `ResourcesNb` count and the entropy aggregates without failing the
//! parse.

use tracing::debug;

use crate::pe::sections::SectionTable;
use crate::pe::types::*;
use crate::pe::utils::{range_in_bounds, read_counted_utf16le, ReadExt};

const SUBDIR_FLAG: u32 = 0x8000_0000;
const NAME_FLAG: u32 = 0x8000_0000;
const MAX_RESOURCE_NAME_CHARS: usize = 256;

/// Parsed resource directory.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable<'a> {
    pub root: ResourceDirectory<'a>,
}

impl<'a> ResourceTable<'a> {
    /// Data leaves at the third level (type -> name/id -> language), in
    /// tree order. Leaves parked at shallower levels by a nonstandard tree
    /// are not counted, matching the three-level walk the feature set is
    /// defined over.
    pub fn leaves(&self) -> Vec<(&ResourceId, &ResourceDataEntry<'a>)> {
        let mut out = Vec::new();
        for type_entry in &self.root.entries {
            let ResourceNode::Directory(by_id) = &type_entry.node else {
                continue;
            };
            for id_entry in &by_id.entries {
                let ResourceNode::Directory(by_lang) = &id_entry.node else {
                    continue;
                };
                for lang_entry in &by_lang.entries {
                    if let ResourceNode::Data(leaf) = &lang_entry.node {
                        out.push((&type_entry.id, leaf));
                    }
                }
            }
        }
        out
    }

    /// Number of valid (resolvable) data leaves.
    pub fn valid_leaf_count(&self) -> usize {
        self.leaves().iter().filter(|(_, l)| l.is_valid()).count()
    }

    /// Aggregate byte size of valid RT_VERSION leaf data.
    pub fn version_info_size(&self) -> u64 {
        self.leaves()
            .iter()
            .filter(|(id, leaf)| id.as_id() == Some(RESOURCE_TYPE_VERSION) && leaf.is_valid())
            .map(|(_, leaf)| leaf.size as u64)
            .sum()
    }
}

/// Walk the resource directory. Returns None when the directory is absent
/// or its root does not map to the file.
pub fn parse_resources<'a>(
    data: &'a [u8],
    sections: &SectionTable,
    resource_dir: &DataDirectory,
    options: &ParseOptions,
) -> Option<ResourceTable<'a>> {
    if !resource_dir.is_present() {
        return None;
    }

    let base = sections.rva_to_offset(resource_dir.virtual_address)?;
    if base >= data.len() {
        debug!(base, "resource section start is outside the file");
        return None;
    }

    let mut walker = Walker {
        data,
        sections,
        base,
        options,
        leaves_seen: 0,
    };

    let root = walker.parse_directory(0, 1).unwrap_or_default();
    Some(ResourceTable { root })
}

struct Walker<'a, 'b> {
    data: &'a [u8],
    sections: &'b SectionTable,
    base: usize,
    options: &'b ParseOptions,
    leaves_seen: usize,
}

impl<'a> Walker<'a, '_> {
    /// Parse one directory node at `rel` (relative to the resource section
    /// start), at nesting level `level` (1-based).
    fn parse_directory(&mut self, rel: u32, level: usize) -> Option<ResourceDirectory<'a>> {
        let node_offset = self.base.checked_add(rel as usize)?;

        let named_count = self.data.read_u16_le_at(node_offset.checked_add(12)?)? as usize;
        let id_count = self.data.read_u16_le_at(node_offset.checked_add(14)?)? as usize;
        let total = named_count + id_count;

        if total > self.options.max_resources {
            debug!(
                total,
                cap = self.options.max_resources,
                "resource directory claims more entries than the cap; truncating"
            );
        }

        let mut directory = ResourceDirectory::default();

        for i in 0..total.min(self.options.max_resources) {
            if self.leaves_seen >= self.options.max_resources {
                debug!(cap = self.options.max_resources, "resource leaf cap reached");
                break;
            }

            let entry_offset = node_offset.checked_add(16 + i * 8)?;
            let Some(name_or_id) = self.data.read_u32_le_at(entry_offset) else {
                debug!(offset = entry_offset, "resource entry table runs off the file");
                break;
            };
            let Some(offset_field) = self.data.read_u32_le_at(entry_offset + 4) else {
                break;
            };

            let id = self.entry_id(name_or_id);

            let node = if offset_field & SUBDIR_FLAG != 0 {
                if level >= self.options.max_resource_depth {
                    // Deeper nesting than the format defines; ignore it.
                    debug!(level, "resource tree deeper than expected; ignoring subtree");
                    continue;
                }
                match self.parse_directory(offset_field & !SUBDIR_FLAG, level + 1) {
                    Some(dir) => ResourceNode::Directory(dir),
                    None => continue,
                }
            } else {
                match self.parse_data_entry(offset_field) {
                    Some(leaf) => {
                        self.leaves_seen += 1;
                        ResourceNode::Data(leaf)
                    }
                    None => continue,
                }
            };

            directory.entries.push(ResourceEntry { id, node });
        }

        Some(directory)
    }

    fn entry_id(&self, name_or_id: u32) -> ResourceId {
        if name_or_id & NAME_FLAG != 0 {
            let name_rel = (name_or_id & !NAME_FLAG) as usize;
            match self
                .base
                .checked_add(name_rel)
                .and_then(|o| read_counted_utf16le(self.data, o, MAX_RESOURCE_NAME_CHARS))
            {
                Some(name) => ResourceId::Name(name),
                // Keep the entry under its raw offset when the name is
                // unreadable; the id still makes the entry addressable.
                None => ResourceId::Id(name_or_id),
            }
        } else {
            ResourceId::Id(name_or_id)
        }
    }

    /// Parse a 16-byte data entry (data RVA, size, code page, reserved) at
    /// `rel`, resolving the (RVA, size) pair to a file slice.
    fn parse_data_entry(&self, rel: u32) -> Option<ResourceDataEntry<'a>> {
        let offset = self.base.checked_add(rel as usize)?;

        let rva = self.data.read_u32_le_at(offset)?;
        let size = self.data.read_u32_le_at(offset + 4)?;
        let code_page = self.data.read_u32_le_at(offset + 8)?;

        let data = self
            .sections
            .rva_to_offset(rva)
            .filter(|&start| range_in_bounds(start, size as usize, self.data.len()))
            .map(|start| &self.data[start..start + size as usize]);

        if data.is_none() {
            debug!(rva, size, "resource leaf does not map inside the file; marking corrupt");
        }

        Some(ResourceDataEntry {
            rva,
            size,
            code_page,
            data,
        })
    }
}
