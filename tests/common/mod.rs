//! Shared test helpers: an in-memory PE file builder.
//!
//! The builder emits a fixed layout: DOS header with `e_lfanew` 0x80, COFF
//! at 0x84, optional header at 0x98 (224 bytes for PE32, 240 for PE32+)
//! with all 16 data directories, section headers right after, and section
//! raw data from file offset 0x400 aligned to 0x200. Directory payloads
//! (imports, exports, resources) are produced by the `*_blob` helpers and
//! dropped into sections at a virtual address of the caller's choosing.

pub fn put_u16(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn put_u32(buf: &mut [u8], at: usize, v: u32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn put_u64(buf: &mut [u8], at: usize, v: u64) {
    buf[at..at + 8].copy_from_slice(&v.to_le_bytes());
}

/// Data directory indices used by the tests.
pub const DIR_EXPORT: usize = 0;
pub const DIR_IMPORT: usize = 1;
pub const DIR_RESOURCE: usize = 2;

pub struct PeBuilder {
    pe32_plus: bool,
    machine: u16,
    entry_point: u32,
    image_base: u64,
    subsystem: u16,
    dll_characteristics: u16,
    size_of_code: u32,
    size_of_initialized_data: u32,
    size_of_stack_reserve: u64,
    size_of_heap_reserve: u64,
    sections: Vec<([u8; 8], u32, Vec<u8>)>,
    directories: Vec<(usize, u32, u32)>,
}

impl PeBuilder {
    pub fn pe32() -> Self {
        Self {
            pe32_plus: false,
            machine: 0x014C,
            entry_point: 0,
            image_base: 0x40_0000,
            subsystem: 0,
            dll_characteristics: 0,
            size_of_code: 0,
            size_of_initialized_data: 0,
            size_of_stack_reserve: 0,
            size_of_heap_reserve: 0,
            sections: Vec::new(),
            directories: Vec::new(),
        }
    }

    pub fn pe32plus() -> Self {
        Self {
            pe32_plus: true,
            machine: 0x8664,
            image_base: 0x1_4000_0000,
            ..Self::pe32()
        }
    }

    pub fn entry_point(mut self, v: u32) -> Self {
        self.entry_point = v;
        self
    }

    pub fn image_base(mut self, v: u64) -> Self {
        self.image_base = v;
        self
    }

    pub fn subsystem(mut self, v: u16) -> Self {
        self.subsystem = v;
        self
    }

    pub fn dll_characteristics(mut self, v: u16) -> Self {
        self.dll_characteristics = v;
        self
    }

    pub fn size_of_code(mut self, v: u32) -> Self {
        self.size_of_code = v;
        self
    }

    pub fn size_of_initialized_data(mut self, v: u32) -> Self {
        self.size_of_initialized_data = v;
        self
    }

    pub fn stack_reserve(mut self, v: u64) -> Self {
        self.size_of_stack_reserve = v;
        self
    }

    pub fn heap_reserve(mut self, v: u64) -> Self {
        self.size_of_heap_reserve = v;
        self
    }

    /// Add a section with the given raw contents at the given RVA.
    pub fn section(mut self, name: &str, virtual_address: u32, data: Vec<u8>) -> Self {
        let mut name8 = [0u8; 8];
        name8[..name.len()].copy_from_slice(name.as_bytes());
        self.sections.push((name8, virtual_address, data));
        self
    }

    /// Point a data directory slot at (virtual_address, size).
    pub fn directory(mut self, index: usize, virtual_address: u32, size: u32) -> Self {
        self.directories.push((index, virtual_address, size));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let opt_offset = 0x98usize;
        let opt_size: usize = if self.pe32_plus { 0xF0 } else { 0xE0 };
        let section_headers = opt_offset + opt_size;
        assert!(
            section_headers + self.sections.len() * 40 <= 0x400,
            "too many sections for the fixed header area"
        );

        let mut buf = vec![0u8; 0x400];

        // DOS header.
        buf[0] = b'M';
        buf[1] = b'Z';
        put_u32(&mut buf, 60, 0x80);

        // Signature + COFF.
        buf[0x80..0x84].copy_from_slice(b"PE\0\0");
        put_u16(&mut buf, 0x84, self.machine);
        put_u16(&mut buf, 0x86, self.sections.len() as u16);
        put_u16(&mut buf, 0x94, opt_size as u16);
        put_u16(&mut buf, 0x96, 0x0102); // EXECUTABLE_IMAGE | 32BIT_MACHINE

        // Optional header.
        let magic: u16 = if self.pe32_plus { 0x020B } else { 0x010B };
        put_u16(&mut buf, opt_offset, magic);
        put_u32(&mut buf, opt_offset + 4, self.size_of_code);
        put_u32(&mut buf, opt_offset + 8, self.size_of_initialized_data);
        put_u32(&mut buf, opt_offset + 16, self.entry_point);
        put_u32(&mut buf, opt_offset + 32, 0x1000); // section alignment
        put_u32(&mut buf, opt_offset + 36, 0x200); // file alignment
        put_u16(&mut buf, opt_offset + 68, self.subsystem);
        put_u16(&mut buf, opt_offset + 70, self.dll_characteristics);

        if self.pe32_plus {
            put_u64(&mut buf, opt_offset + 24, self.image_base);
            put_u64(&mut buf, opt_offset + 72, self.size_of_stack_reserve);
            put_u64(&mut buf, opt_offset + 88, self.size_of_heap_reserve);
            put_u32(&mut buf, opt_offset + 108, 16);
        } else {
            put_u32(&mut buf, opt_offset + 28, self.image_base as u32);
            put_u32(&mut buf, opt_offset + 72, self.size_of_stack_reserve as u32);
            put_u32(&mut buf, opt_offset + 80, self.size_of_heap_reserve as u32);
            put_u32(&mut buf, opt_offset + 92, 16);
        }

        // Directory table at the tail of the optional header.
        let dir_table = opt_offset + opt_size - 16 * 8;
        for (index, va, size) in &self.directories {
            put_u32(&mut buf, dir_table + index * 8, *va);
            put_u32(&mut buf, dir_table + index * 8 + 4, *size);
        }

        // Section headers + raw data.
        for (i, (name, va, data)) in self.sections.iter().enumerate() {
            let raw_ptr = buf.len();
            let h = section_headers + i * 40;
            buf[h..h + 8].copy_from_slice(name);
            put_u32(&mut buf, h + 8, data.len() as u32); // virtual size
            put_u32(&mut buf, h + 12, *va);
            put_u32(&mut buf, h + 16, data.len() as u32);
            put_u32(&mut buf, h + 20, raw_ptr as u32);

            buf.extend_from_slice(data);
            let aligned = (buf.len() + 0x1FF) & !0x1FF;
            buf.resize(aligned, 0);
        }

        buf
    }
}

/// Build an import directory blob (32-bit thunks) meant to live at RVA
/// `va`: descriptor table, thunk arrays, hint/name records, DLL names.
pub fn import_blob(va: u32, dlls: &[(&str, &[&str])]) -> Vec<u8> {
    let mut buf = vec![0u8; (dlls.len() + 1) * 20];

    for (i, (dll, funcs)) in dlls.iter().enumerate() {
        let thunks = buf.len();
        buf.resize(thunks + (funcs.len() + 1) * 4, 0);

        for (j, func) in funcs.iter().enumerate() {
            let hint_name = buf.len();
            buf.extend_from_slice(&[0, 0]); // hint
            buf.extend_from_slice(func.as_bytes());
            buf.push(0);
            if buf.len() % 2 == 1 {
                buf.push(0);
            }
            put_u32(&mut buf, thunks + j * 4, va + hint_name as u32);
        }

        let name = buf.len();
        buf.extend_from_slice(dll.as_bytes());
        buf.push(0);

        let d = i * 20;
        put_u32(&mut buf, d, va + thunks as u32); // original first thunk
        put_u32(&mut buf, d + 12, va + name as u32);
        put_u32(&mut buf, d + 16, va + thunks as u32);
    }

    buf
}

/// Build an export directory blob meant to live at RVA `va`, exporting one
/// function per name with ordinal base 1.
pub fn export_blob(va: u32, names: &[&str]) -> Vec<u8> {
    let mut buf = vec![0u8; 40];

    let addr_table = buf.len();
    buf.resize(buf.len() + names.len() * 4, 0);
    let name_table = buf.len();
    buf.resize(buf.len() + names.len() * 4, 0);
    let ordinal_table = buf.len();
    buf.resize(buf.len() + names.len() * 2, 0);

    for (i, name) in names.iter().enumerate() {
        let s = buf.len();
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);

        // Function RVAs well below the directory, so nothing looks like a
        // forwarder.
        put_u32(&mut buf, addr_table + i * 4, 0x10 + i as u32 * 0x10);
        put_u32(&mut buf, name_table + i * 4, va + s as u32);
        put_u16(&mut buf, ordinal_table + i * 2, i as u16);
    }

    put_u32(&mut buf, 16, 1); // ordinal base
    put_u32(&mut buf, 20, names.len() as u32);
    put_u32(&mut buf, 24, names.len() as u32);
    put_u32(&mut buf, 28, va + addr_table as u32);
    put_u32(&mut buf, 32, va + name_table as u32);
    put_u32(&mut buf, 36, va + ordinal_table as u32);

    buf
}

/// One leaf of a resource tree to synthesize.
pub enum ResLeaf<'a> {
    /// Valid leaf with this payload, under the given type id.
    Data(u32, &'a [u8]),
    /// Leaf whose (RVA, size) pair points far outside the file.
    Corrupt(u32),
}

/// Build a three-level resource tree blob meant to live at RVA `va`: one
/// (type, id 1, language 0x409) chain per leaf, payloads appended at the
/// end of the blob.
pub fn resource_blob(va: u32, leaves: &[ResLeaf]) -> Vec<u8> {
    let mut buf = vec![0u8; 16 + leaves.len() * 8];
    put_u16(&mut buf, 14, leaves.len() as u16);

    let mut pending: Vec<(usize, &[u8])> = Vec::new();

    for (i, leaf) in leaves.iter().enumerate() {
        let (type_id, payload) = match leaf {
            ResLeaf::Data(t, p) => (*t, Some(*p)),
            ResLeaf::Corrupt(t) => (*t, None),
        };

        let type_dir = buf.len();
        buf.resize(type_dir + 24, 0);
        let lang_dir = buf.len();
        buf.resize(lang_dir + 24, 0);
        let data_entry = buf.len();
        buf.resize(data_entry + 16, 0);

        put_u32(&mut buf, 16 + i * 8, type_id);
        put_u32(&mut buf, 16 + i * 8 + 4, type_dir as u32 | 0x8000_0000);

        put_u16(&mut buf, type_dir + 14, 1);
        put_u32(&mut buf, type_dir + 16, 1);
        put_u32(&mut buf, type_dir + 20, lang_dir as u32 | 0x8000_0000);

        put_u16(&mut buf, lang_dir + 14, 1);
        put_u32(&mut buf, lang_dir + 16, 0x409);
        put_u32(&mut buf, lang_dir + 20, data_entry as u32);

        match payload {
            Some(p) => pending.push((data_entry, p)),
            None => {
                put_u32(&mut buf, data_entry, 0x00F0_0000);
                put_u32(&mut buf, data_entry + 4, 0x1000_0000);
            }
        }
    }

    for (data_entry, payload) in pending {
        let at = buf.len();
        buf.extend_from_slice(payload);
        put_u32(&mut buf, data_entry, va + at as u32);
        put_u32(&mut buf, data_entry + 4, payload.len() as u32);
    }

    buf
}
