//! Utility functions for PE parsing

/// Extension trait for reading primitive types from byte slices.
///
/// Every field pulled out of a PE image goes through these readers; a read
/// that would cross the end of the slice returns None instead of panicking.
pub trait ReadExt {
    fn read_u8_at(&self, offset: usize) -> Option<u8>;
    fn read_u16_le_at(&self, offset: usize) -> Option<u16>;
    fn read_u32_le_at(&self, offset: usize) -> Option<u32>;
    fn read_u64_le_at(&self, offset: usize) -> Option<u64>;
    fn read_cstring_at(&self, offset: usize, max_len: usize) -> Option<&str>;
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl ReadExt for [u8] {
    #[inline(always)]
    fn read_u8_at(&self, offset: usize) -> Option<u8> {
        self.get(offset).copied()
    }

    #[inline(always)]
    fn read_u16_le_at(&self, offset: usize) -> Option<u16> {
        self.get(offset..offset.checked_add(2)?)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
    }

    #[inline(always)]
    fn read_u32_le_at(&self, offset: usize) -> Option<u32> {
        self.get(offset..offset.checked_add(4)?)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
    }

    #[inline(always)]
    fn read_u64_le_at(&self, offset: usize) -> Option<u64> {
        self.get(offset..offset.checked_add(8)?)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
    }

    fn read_cstring_at(&self, offset: usize, max_len: usize) -> Option<&str> {
        let end = offset.checked_add(max_len)?.min(self.len());
        let slice = self.get(offset..end)?;

        // Stop at the null terminator when there is one within max_len
        let len = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
        std::str::from_utf8(&slice[..len]).ok()
    }

    #[inline(always)]
    fn read_slice_at(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.get(offset..end)
    }
}

/// Reads a length-prefixed UTF-16LE string, the encoding used for resource
/// directory names (a u16 character count followed by the characters).
pub fn read_counted_utf16le(data: &[u8], offset: usize, max_chars: usize) -> Option<String> {
    let count = data.read_u16_le_at(offset)? as usize;
    if count > max_chars {
        return None;
    }

    let bytes = data.read_slice_at(offset.checked_add(2)?, count.checked_mul(2)?)?;
    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&words).ok()
}

/// Check if an (offset, size) pair stays within a buffer of the given length
#[inline(always)]
pub fn range_in_bounds(offset: usize, size: usize, data_len: usize) -> bool {
    offset <= data_len && size <= data_len && offset + size <= data_len
}
