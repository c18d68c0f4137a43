//! Core PE data types and structures

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

// Data directory indices
pub const IMAGE_DIRECTORY_ENTRY_EXPORT: usize = 0;
pub const IMAGE_DIRECTORY_ENTRY_IMPORT: usize = 1;
pub const IMAGE_DIRECTORY_ENTRY_RESOURCE: usize = 2;
pub const IMAGE_DIRECTORY_ENTRY_EXCEPTION: usize = 3;
pub const IMAGE_DIRECTORY_ENTRY_SECURITY: usize = 4;
pub const IMAGE_DIRECTORY_ENTRY_BASERELOC: usize = 5;
pub const IMAGE_DIRECTORY_ENTRY_DEBUG: usize = 6;
pub const IMAGE_DIRECTORY_ENTRY_ARCHITECTURE: usize = 7;
pub const IMAGE_DIRECTORY_ENTRY_GLOBALPTR: usize = 8;
pub const IMAGE_DIRECTORY_ENTRY_TLS: usize = 9;
pub const IMAGE_DIRECTORY_ENTRY_LOAD_CONFIG: usize = 10;
pub const IMAGE_DIRECTORY_ENTRY_BOUND_IMPORT: usize = 11;
pub const IMAGE_DIRECTORY_ENTRY_IAT: usize = 12;
pub const IMAGE_DIRECTORY_ENTRY_DELAY_IMPORT: usize = 13;
pub const IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR: usize = 14;

/// Resource type id for version information (RT_VERSION)
pub const RESOURCE_TYPE_VERSION: u32 = 16;

/// PE parsing error types.
///
/// These are the fatal causes: a header chain that cannot be established
/// aborts the parse. Damage inside an optional directory is not represented
/// here; directory walks degrade to the entries parsed so far instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    InvalidDosSignature,
    InvalidPeSignature,
    InvalidMagic(u16),
    TruncatedHeader { expected: usize, actual: usize },
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDosSignature => write!(f, "Invalid DOS signature"),
            Self::InvalidPeSignature => write!(f, "Invalid PE signature"),
            Self::InvalidMagic(m) => write!(f, "Invalid optional header magic: 0x{:04x}", m),
            Self::TruncatedHeader { expected, actual } => {
                write!(
                    f,
                    "Truncated header: expected {} bytes, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for PeError {}

pub type Result<T> = std::result::Result<T, PeError>;

/// Machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Unknown,
    I386,   // 0x014c
    X86_64, // 0x8664
    Arm,    // 0x01c0
    Arm64,  // 0xaa64
    ArmNT,  // 0x01c4
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x014c => Self::I386,
            0x8664 => Self::X86_64,
            0x01c0 => Self::Arm,
            0xaa64 => Self::Arm64,
            0x01c4 => Self::ArmNT,
            0 => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

/// Subsystem types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Unknown,
    Native,                 // 1
    WindowsGui,             // 2
    WindowsCui,             // 3
    Os2Cui,                 // 5
    PosixCui,               // 7
    WindowsCeGui,           // 9
    EfiApplication,         // 10
    EfiBootServiceDriver,   // 11
    EfiRuntimeDriver,       // 12
    EfiRom,                 // 13
    Xbox,                   // 14
    WindowsBootApplication, // 16
    Other(u16),
}

impl From<u16> for Subsystem {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Native,
            2 => Self::WindowsGui,
            3 => Self::WindowsCui,
            5 => Self::Os2Cui,
            7 => Self::PosixCui,
            9 => Self::WindowsCeGui,
            10 => Self::EfiApplication,
            11 => Self::EfiBootServiceDriver,
            12 => Self::EfiRuntimeDriver,
            13 => Self::EfiRom,
            14 => Self::Xbox,
            16 => Self::WindowsBootApplication,
            other => Self::Other(other),
        }
    }
}

/// DOS header fields the parser cares about (the full header is 64 bytes)
#[derive(Debug, Clone, Copy)]
pub struct DosHeader {
    pub e_magic: u16,
    pub e_lfanew: u32, // File address of the PE header
}

/// COFF header (20 bytes)
#[derive(Debug, Clone, Copy)]
pub struct CoffHeader {
    pub machine: Machine,
    pub number_of_sections: u16,
    pub time_date_stamp: u32,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
}

/// Data directory entry
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDirectory {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectory {
    /// An absent directory has a zero address or size. Absence is a valid
    /// state, distinct from a directory that is present but damaged.
    pub fn is_present(&self) -> bool {
        self.virtual_address != 0 && self.size > 0
    }
}

/// Optional header - common fields
#[derive(Debug, Clone)]
pub struct OptionalHeaderCommon {
    pub magic: u16,
    pub major_linker_version: u8,
    pub minor_linker_version: u8,
    pub size_of_code: u32,
    pub size_of_initialized_data: u32,
    pub size_of_uninitialized_data: u32,
    pub address_of_entry_point: u32,
    pub base_of_code: u32,
}

/// 32-bit optional header
#[derive(Debug, Clone)]
pub struct OptionalHeader32 {
    pub common: OptionalHeaderCommon,
    pub base_of_data: u32,
    pub image_base: u32,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u32,
    pub size_of_stack_commit: u32,
    pub size_of_heap_reserve: u32,
    pub size_of_heap_commit: u32,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

/// 64-bit optional header
#[derive(Debug, Clone)]
pub struct OptionalHeader64 {
    pub common: OptionalHeaderCommon,
    pub image_base: u64,
    pub section_alignment: u32,
    pub file_alignment: u32,
    pub size_of_image: u32,
    pub size_of_headers: u32,
    pub checksum: u32,
    pub subsystem: u16,
    pub dll_characteristics: u16,
    pub size_of_stack_reserve: u64,
    pub size_of_stack_commit: u64,
    pub size_of_heap_reserve: u64,
    pub size_of_heap_commit: u64,
    pub loader_flags: u32,
    pub number_of_rva_and_sizes: u32,
}

/// Combined optional header enum.
///
/// Accessors normalize the width differences between the two layouts:
/// image base and the stack/heap reserves are 32-bit in PE32 and 64-bit in
/// PE32+, so they are exposed as u64.
#[derive(Debug, Clone)]
pub enum OptionalHeader {
    Pe32(OptionalHeader32),
    Pe32Plus(OptionalHeader64),
}

impl OptionalHeader {
    pub fn magic(&self) -> u16 {
        match self {
            Self::Pe32(h) => h.common.magic,
            Self::Pe32Plus(h) => h.common.magic,
        }
    }

    pub fn size_of_code(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.common.size_of_code,
            Self::Pe32Plus(h) => h.common.size_of_code,
        }
    }

    pub fn size_of_initialized_data(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.common.size_of_initialized_data,
            Self::Pe32Plus(h) => h.common.size_of_initialized_data,
        }
    }

    pub fn entry_point(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.common.address_of_entry_point,
            Self::Pe32Plus(h) => h.common.address_of_entry_point,
        }
    }

    pub fn image_base(&self) -> u64 {
        match self {
            Self::Pe32(h) => h.image_base as u64,
            Self::Pe32Plus(h) => h.image_base,
        }
    }

    pub fn subsystem(&self) -> Subsystem {
        Subsystem::from(self.subsystem_raw())
    }

    pub fn subsystem_raw(&self) -> u16 {
        match self {
            Self::Pe32(h) => h.subsystem,
            Self::Pe32Plus(h) => h.subsystem,
        }
    }

    pub fn dll_characteristics(&self) -> u16 {
        match self {
            Self::Pe32(h) => h.dll_characteristics,
            Self::Pe32Plus(h) => h.dll_characteristics,
        }
    }

    pub fn size_of_stack_reserve(&self) -> u64 {
        match self {
            Self::Pe32(h) => h.size_of_stack_reserve as u64,
            Self::Pe32Plus(h) => h.size_of_stack_reserve,
        }
    }

    pub fn size_of_heap_reserve(&self) -> u64 {
        match self {
            Self::Pe32(h) => h.size_of_heap_reserve as u64,
            Self::Pe32Plus(h) => h.size_of_heap_reserve,
        }
    }

    pub fn number_of_rva_and_sizes(&self) -> u32 {
        match self {
            Self::Pe32(h) => h.number_of_rva_and_sizes,
            Self::Pe32Plus(h) => h.number_of_rva_and_sizes,
        }
    }

    pub fn is_64bit(&self) -> bool {
        matches!(self, Self::Pe32Plus(_))
    }
}

/// NT headers (PE signature + COFF + Optional)
#[derive(Debug, Clone)]
pub struct NtHeaders {
    pub signature: [u8; 4],
    pub file_header: CoffHeader,
    pub optional_header: OptionalHeader,
}

/// Section header fields used by the structural view
#[derive(Debug, Clone)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub size_of_raw_data: u32,
    pub pointer_to_raw_data: u32,
}

impl SectionHeader {
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(8);
        String::from_utf8_lossy(&self.name[..end]).to_string()
    }
}

/// Section with its raw-data range in the file.
///
/// The range is as declared by the header; it is clamped to the file bounds
/// every time the data is read.
#[derive(Debug, Clone)]
pub struct Section {
    pub header: SectionHeader,
    pub data: Range<usize>,
}

/// Import descriptor (one DLL)
#[derive(Debug, Clone)]
pub struct ImportDescriptor<'a> {
    pub dll_name: &'a str,
    pub original_first_thunk: u32,
    pub name_rva: u32,
    pub first_thunk: u32,
    pub entries: Vec<ImportEntry<'a>>,
}

/// Import entry, either by name or by ordinal
#[derive(Debug, Clone)]
pub struct ImportEntry<'a> {
    pub name: Option<&'a str>,
    pub ordinal: Option<u16>,
    pub hint: Option<u16>,
}

/// Export entry
#[derive(Debug, Clone)]
pub struct ExportEntry<'a> {
    pub name: Option<&'a str>,
    pub ordinal: u32,
    pub rva: u32,
    pub forwarder: Option<&'a str>,
}

/// Resource identifier: a numeric id or a UTF-16 name decoded from the
/// resource section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Id(u32),
    Name(String),
}

impl ResourceId {
    pub fn as_id(&self) -> Option<u32> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }
}

/// Resource data leaf.
///
/// `rva` and `size` are the values stored in the file. `data` is the
/// resolved slice of the underlying image; None means the pair does not map
/// inside the image and the leaf is corrupt. Corrupt leaves stay in the
/// tree but carry no bytes and are excluded from aggregate statistics.
#[derive(Debug, Clone)]
pub struct ResourceDataEntry<'a> {
    pub rva: u32,
    pub size: u32,
    pub code_page: u32,
    pub data: Option<&'a [u8]>,
}

impl ResourceDataEntry<'_> {
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }
}

/// Resource tree node: a nested directory or a data leaf
#[derive(Debug, Clone)]
pub enum ResourceNode<'a> {
    Directory(ResourceDirectory<'a>),
    Data(ResourceDataEntry<'a>),
}

/// One level of the resource tree
#[derive(Debug, Clone, Default)]
pub struct ResourceDirectory<'a> {
    pub entries: Vec<ResourceEntry<'a>>,
}

/// Resource directory entry
#[derive(Debug, Clone)]
pub struct ResourceEntry<'a> {
    pub id: ResourceId,
    pub node: ResourceNode<'a>,
}

/// Parse options.
///
/// The caps bound how much of each directory an adversarial image can make
/// the parser walk; a table that claims more entries is cut off at the cap
/// with everything before it kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOptions {
    pub max_imports: usize,
    pub max_exports: usize,
    pub max_resources: usize,
    pub max_resource_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_imports: 10_000,
            max_exports: 10_000,
            max_resources: 4_096,
            max_resource_depth: 3,
        }
    }
}
