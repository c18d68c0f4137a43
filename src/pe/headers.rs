//! PE header chain parsing.
//!
//! DOS header -> "PE\0\0" signature -> COFF header -> optional header
//! (PE32 or PE32+, dispatched on the magic) -> data directories. A break
//! anywhere in this chain is fatal for the image; everything past it
//! (directories, sections) degrades instead.

use crate::pe::types::*;
use crate::pe::utils::ReadExt;

/// Parse the DOS header (64 bytes, `e_lfanew` at offset 60).
pub fn parse_dos_header(data: &[u8]) -> Result<DosHeader> {
    if data.len() < 64 {
        return Err(PeError::TruncatedHeader {
            expected: 64,
            actual: data.len(),
        });
    }

    let e_magic = data.read_u16_le_at(0).unwrap();
    if e_magic != DOS_SIGNATURE {
        return Err(PeError::InvalidDosSignature);
    }

    Ok(DosHeader {
        e_magic,
        e_lfanew: data.read_u32_le_at(60).unwrap(),
    })
}

/// Parse the COFF header (20 bytes) at `offset`.
pub fn parse_coff_header(data: &[u8], offset: usize) -> Result<CoffHeader> {
    let end = offset.checked_add(20).ok_or(PeError::TruncatedHeader {
        expected: usize::MAX,
        actual: data.len(),
    })?;
    if end > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: end,
            actual: data.len(),
        });
    }

    Ok(CoffHeader {
        machine: Machine::from(data.read_u16_le_at(offset).unwrap()),
        number_of_sections: data.read_u16_le_at(offset + 2).unwrap(),
        time_date_stamp: data.read_u32_le_at(offset + 4).unwrap(),
        size_of_optional_header: data.read_u16_le_at(offset + 16).unwrap(),
        characteristics: data.read_u16_le_at(offset + 18).unwrap(),
    })
}

/// Parse the optional header at `offset`, dispatching on the magic.
pub fn parse_optional_header(data: &[u8], offset: usize, size: u16) -> Result<OptionalHeader> {
    if size < 2 {
        return Err(PeError::TruncatedHeader {
            expected: offset + 2,
            actual: data.len(),
        });
    }

    let end = offset
        .checked_add(size as usize)
        .ok_or(PeError::TruncatedHeader {
            expected: usize::MAX,
            actual: data.len(),
        })?;
    if end > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: end,
            actual: data.len(),
        });
    }

    let magic = data.read_u16_le_at(offset).unwrap();

    match magic {
        PE32_MAGIC => parse_optional_header32(data, offset, size),
        PE32PLUS_MAGIC => parse_optional_header64(data, offset, size),
        _ => Err(PeError::InvalidMagic(magic)),
    }
}

fn parse_optional_header32(data: &[u8], offset: usize, size: u16) -> Result<OptionalHeader> {
    // Standard fields + Windows-specific fields, without the directories.
    if size < 96 {
        return Err(PeError::TruncatedHeader {
            expected: offset + 96,
            actual: offset + size as usize,
        });
    }

    let common = OptionalHeaderCommon {
        magic: data.read_u16_le_at(offset).unwrap(),
        major_linker_version: data.read_u8_at(offset + 2).unwrap(),
        minor_linker_version: data.read_u8_at(offset + 3).unwrap(),
        size_of_code: data.read_u32_le_at(offset + 4).unwrap(),
        size_of_initialized_data: data.read_u32_le_at(offset + 8).unwrap(),
        size_of_uninitialized_data: data.read_u32_le_at(offset + 12).unwrap(),
        address_of_entry_point: data.read_u32_le_at(offset + 16).unwrap(),
        base_of_code: data.read_u32_le_at(offset + 20).unwrap(),
    };

    let header = OptionalHeader32 {
        common,
        base_of_data: data.read_u32_le_at(offset + 24).unwrap(),
        image_base: data.read_u32_le_at(offset + 28).unwrap(),
        section_alignment: data.read_u32_le_at(offset + 32).unwrap(),
        file_alignment: data.read_u32_le_at(offset + 36).unwrap(),
        size_of_image: data.read_u32_le_at(offset + 56).unwrap(),
        size_of_headers: data.read_u32_le_at(offset + 60).unwrap(),
        checksum: data.read_u32_le_at(offset + 64).unwrap(),
        subsystem: data.read_u16_le_at(offset + 68).unwrap(),
        dll_characteristics: data.read_u16_le_at(offset + 70).unwrap(),
        size_of_stack_reserve: data.read_u32_le_at(offset + 72).unwrap(),
        size_of_stack_commit: data.read_u32_le_at(offset + 76).unwrap(),
        size_of_heap_reserve: data.read_u32_le_at(offset + 80).unwrap(),
        size_of_heap_commit: data.read_u32_le_at(offset + 84).unwrap(),
        loader_flags: data.read_u32_le_at(offset + 88).unwrap(),
        number_of_rva_and_sizes: data.read_u32_le_at(offset + 92).unwrap(),
    };

    Ok(OptionalHeader::Pe32(header))
}

fn parse_optional_header64(data: &[u8], offset: usize, size: u16) -> Result<OptionalHeader> {
    if size < 112 {
        return Err(PeError::TruncatedHeader {
            expected: offset + 112,
            actual: offset + size as usize,
        });
    }

    let common = OptionalHeaderCommon {
        magic: data.read_u16_le_at(offset).unwrap(),
        major_linker_version: data.read_u8_at(offset + 2).unwrap(),
        minor_linker_version: data.read_u8_at(offset + 3).unwrap(),
        size_of_code: data.read_u32_le_at(offset + 4).unwrap(),
        size_of_initialized_data: data.read_u32_le_at(offset + 8).unwrap(),
        size_of_uninitialized_data: data.read_u32_le_at(offset + 12).unwrap(),
        address_of_entry_point: data.read_u32_le_at(offset + 16).unwrap(),
        base_of_code: data.read_u32_le_at(offset + 20).unwrap(),
    };

    let header = OptionalHeader64 {
        common,
        image_base: data.read_u64_le_at(offset + 24).unwrap(),
        section_alignment: data.read_u32_le_at(offset + 32).unwrap(),
        file_alignment: data.read_u32_le_at(offset + 36).unwrap(),
        size_of_image: data.read_u32_le_at(offset + 56).unwrap(),
        size_of_headers: data.read_u32_le_at(offset + 60).unwrap(),
        checksum: data.read_u32_le_at(offset + 64).unwrap(),
        subsystem: data.read_u16_le_at(offset + 68).unwrap(),
        dll_characteristics: data.read_u16_le_at(offset + 70).unwrap(),
        size_of_stack_reserve: data.read_u64_le_at(offset + 72).unwrap(),
        size_of_stack_commit: data.read_u64_le_at(offset + 80).unwrap(),
        size_of_heap_reserve: data.read_u64_le_at(offset + 88).unwrap(),
        size_of_heap_commit: data.read_u64_le_at(offset + 96).unwrap(),
        loader_flags: data.read_u32_le_at(offset + 104).unwrap(),
        number_of_rva_and_sizes: data.read_u32_le_at(offset + 108).unwrap(),
    };

    Ok(OptionalHeader::Pe32Plus(header))
}

/// Parse the data directory table at `offset`.
///
/// The count is a value read from the file and is capped at 16; the result
/// is padded to 16 entries so directory indices are always in range. A
/// table that runs off the end of the image keeps the entries read so far.
pub fn parse_data_directories(data: &[u8], offset: usize, count: u32) -> Vec<DataDirectory> {
    let mut directories = Vec::with_capacity(16);
    let count = count.min(16);

    for i in 0..count {
        let dir_offset = match offset.checked_add(i as usize * 8) {
            Some(o) => o,
            None => break,
        };

        let (va, size) = match (
            data.read_u32_le_at(dir_offset),
            data.read_u32_le_at(dir_offset + 4),
        ) {
            (Some(va), Some(size)) => (va, size),
            _ => break,
        };

        directories.push(DataDirectory {
            virtual_address: va,
            size,
        });
    }

    while directories.len() < 16 {
        directories.push(DataDirectory::default());
    }

    directories
}

/// Parse the NT headers (PE signature + COFF + optional + directories) at
/// `offset` (the value of `e_lfanew`).
pub fn parse_nt_headers(data: &[u8], offset: usize) -> Result<(NtHeaders, Vec<DataDirectory>)> {
    let sig_end = offset.checked_add(4).ok_or(PeError::TruncatedHeader {
        expected: usize::MAX,
        actual: data.len(),
    })?;
    if sig_end > data.len() {
        return Err(PeError::TruncatedHeader {
            expected: sig_end,
            actual: data.len(),
        });
    }

    let signature = [
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ];

    if signature != PE_SIGNATURE {
        return Err(PeError::InvalidPeSignature);
    }

    let coff_header = parse_coff_header(data, offset + 4)?;

    let opt_offset = offset + 24; // 4 (signature) + 20 (COFF)
    let optional_header =
        parse_optional_header(data, opt_offset, coff_header.size_of_optional_header)?;

    // The directory table sits at the tail of the optional header. An
    // inflated NumberOfRvaAndSizes would place the table before the header
    // start; reject that instead of underflowing.
    let dir_count = optional_header.number_of_rva_and_sizes().min(16);
    let dir_bytes = dir_count as usize * 8;
    let opt_size = coff_header.size_of_optional_header as usize;
    if dir_bytes > opt_size {
        return Err(PeError::TruncatedHeader {
            expected: dir_bytes,
            actual: opt_size,
        });
    }
    let dir_offset = opt_offset + opt_size - dir_bytes;
    let directories = parse_data_directories(data, dir_offset, dir_count);

    let nt_headers = NtHeaders {
        signature,
        file_header: coff_header,
        optional_header,
    };

    Ok((nt_headers, directories))
}
