use goblin::pe::PE;

/// One entry of a PE section table.
///
/// Only the raw-data window and the virtual address take part in address
/// translation; `name`, `virtual_size` and `flags` are kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub pointer_to_raw_data: u32,
    pub size_of_raw_data: u32,
    pub flags: u32,
}

impl Section {
    /// Section with only the fields used by address translation.
    pub fn new(virtual_address: u32, pointer_to_raw_data: u32, size_of_raw_data: u32) -> Self {
        Self {
            name: String::new(),
            virtual_address,
            virtual_size: size_of_raw_data,
            pointer_to_raw_data,
            size_of_raw_data,
            flags: 0,
        }
    }

    pub fn from_goblin(sh: &goblin::pe::section_table::SectionTable) -> Self {
        Self {
            name: sh.name().unwrap_or("").to_string(),
            virtual_address: sh.virtual_address,
            virtual_size: sh.virtual_size,
            pointer_to_raw_data: sh.pointer_to_raw_data,
            size_of_raw_data: sh.size_of_raw_data,
            flags: sh.characteristics,
        }
    }

    /// Returns true if `offset` lies in this section's raw data.
    pub fn contains_offset(&self, offset: u32) -> bool {
        // u64 so a corrupt table near u32::MAX cannot wrap.
        let start = self.pointer_to_raw_data as u64;
        let end = start + self.size_of_raw_data as u64;
        (start..end).contains(&(offset as u64))
    }

    /// Translates a file offset inside this section to an RVA.
    pub fn offset_to_rva(&self, offset: u32) -> Option<u32> {
        if !self.contains_offset(offset) {
            return None;
        }
        (offset - self.pointer_to_raw_data).checked_add(self.virtual_address)
    }
}

/// Section table of one image, used to map file offsets to RVAs.
///
/// Sections keep file order. Overlapping raw ranges only occur in malformed
/// images; the first matching section wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    sections: Vec<Section>,
}

impl SectionTable {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn from_goblin(pe: &PE) -> Self {
        let sections = pe.sections.iter().map(Section::from_goblin).collect();
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Converts a file offset to a relative virtual address.
    ///
    /// Returns `None` for offsets in the headers, in padding between raw
    /// ranges, or past the last section. Callers skip such entries with a
    /// warning.
    pub fn resolve(&self, offset: u32) -> Option<u32> {
        self.sections
            .iter()
            .find(|s| s.contains_offset(offset))
            .and_then(|s| s.offset_to_rva(offset))
    }
}
