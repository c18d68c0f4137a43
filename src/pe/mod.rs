//! PE structural reader.
//!
//! [`PeImage`] parses the header chain eagerly (that part failing is what
//! makes an image malformed) and the optional directories lazily on first
//! access. Directory access is infallible: an absent directory is empty
//! and a damaged one degrades to whatever was parsed before the damage.
//! All views borrow from the caller's byte buffer; nothing is copied.

use std::cell::OnceCell;

pub mod directories;
pub mod headers;
pub mod sections;
pub mod types;
pub mod utils;

use directories::{
    parse_exports, parse_imports, parse_resources, ExportTable, ImportTable, ResourceTable,
};
use headers::{parse_dos_header, parse_nt_headers};
use sections::{create_sections, parse_section_headers, SectionTable};
pub use types::*;

/// Parsed structural view over a PE image.
pub struct PeImage<'data> {
    data: &'data [u8],
    dos_header: DosHeader,
    nt_headers: NtHeaders,
    data_directories: Vec<DataDirectory>,
    section_table: SectionTable,
    options: ParseOptions,

    imports: OnceCell<ImportTable<'data>>,
    exports: OnceCell<ExportTable<'data>>,
    resources: OnceCell<Option<ResourceTable<'data>>>,
}

impl<'data> PeImage<'data> {
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        Self::parse_with_options(data, ParseOptions::default())
    }

    pub fn parse_with_options(data: &'data [u8], options: ParseOptions) -> Result<Self> {
        let dos_header = parse_dos_header(data)?;

        let (nt_headers, data_directories) =
            parse_nt_headers(data, dos_header.e_lfanew as usize)?;

        let section_offset = dos_header.e_lfanew as usize
            + 24
            + nt_headers.file_header.size_of_optional_header as usize;
        let section_headers = parse_section_headers(
            data,
            section_offset,
            nt_headers.file_header.number_of_sections,
        )?;

        let section_table = SectionTable::new(create_sections(section_headers));

        Ok(Self {
            data,
            dos_header,
            nt_headers,
            data_directories,
            section_table,
            options,
            imports: OnceCell::new(),
            exports: OnceCell::new(),
            resources: OnceCell::new(),
        })
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    pub fn nt_headers(&self) -> &NtHeaders {
        &self.nt_headers
    }

    pub fn optional_header(&self) -> &OptionalHeader {
        &self.nt_headers.optional_header
    }

    pub fn machine(&self) -> Machine {
        self.nt_headers.file_header.machine
    }

    pub fn is_64bit(&self) -> bool {
        self.nt_headers.optional_header.is_64bit()
    }

    /// Sections in file order.
    pub fn sections(&self) -> &[Section] {
        self.section_table.sections()
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.section_table.section_by_name(name)
    }

    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.section_table.rva_to_offset(rva)
    }

    /// Data directory by index. Always in range after parsing: the table
    /// is padded to 16.
    pub fn data_directory(&self, index: usize) -> &DataDirectory {
        static ABSENT: DataDirectory = DataDirectory {
            virtual_address: 0,
            size: 0,
        };
        self.data_directories.get(index).unwrap_or(&ABSENT)
    }

    pub fn has_imports(&self) -> bool {
        self.data_directory(IMAGE_DIRECTORY_ENTRY_IMPORT).is_present()
    }

    pub fn has_exports(&self) -> bool {
        self.data_directory(IMAGE_DIRECTORY_ENTRY_EXPORT).is_present()
    }

    pub fn has_resources(&self) -> bool {
        self.data_directory(IMAGE_DIRECTORY_ENTRY_RESOURCE)
            .is_present()
    }

    /// Import directory, parsed on first access. Empty when absent or
    /// unwalkable.
    pub fn imports(&self) -> &ImportTable<'data> {
        self.imports.get_or_init(|| {
            parse_imports(
                self.data,
                &self.section_table,
                self.data_directory(IMAGE_DIRECTORY_ENTRY_IMPORT),
                self.is_64bit(),
                &self.options,
            )
        })
    }

    /// Export directory, parsed on first access.
    pub fn exports(&self) -> &ExportTable<'data> {
        self.exports.get_or_init(|| {
            parse_exports(
                self.data,
                &self.section_table,
                self.data_directory(IMAGE_DIRECTORY_ENTRY_EXPORT),
                &self.options,
            )
        })
    }

    /// Resource tree, parsed on first access. None when the directory is
    /// absent or its root does not map into the file.
    pub fn resources(&self) -> Option<&ResourceTable<'data>> {
        self.resources
            .get_or_init(|| {
                parse_resources(
                    self.data,
                    &self.section_table,
                    self.data_directory(IMAGE_DIRECTORY_ENTRY_RESOURCE),
                    &self.options,
                )
            })
            .as_ref()
    }

    /// Aggregate byte size of valid RT_VERSION resource data; 0 when the
    /// resource tree or the type is absent.
    pub fn version_info_size(&self) -> u64 {
        self.resources()
            .map(|r| r.version_info_size())
            .unwrap_or(0)
    }
}
