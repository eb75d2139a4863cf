use goblin::pe::PE;

pub const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
pub const IMAGE_FILE_DLL: u16 = 0x2000;

/// Optional header magic for PE32+ images.
pub const PE32_PLUS_MAGIC: u16 = 0x20b;

/// The PE header fields used to identify a build.
///
/// This is the COFF file header plus the few optional header fields that
/// game patch tools key their files on. The layout follows the
/// `IMAGE_FILE_HEADER` / `IMAGE_OPTIONAL_HEADER` structures.
///
/// Reference: [PE Format](https://learn.microsoft.com/en-us/windows/win32/debug/pe-format)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeHeader {
    /// Target machine (e.g. `0x14c` for i386, `0x8664` for x86-64).
    pub machine: u16,

    /// Number of entries in the section table.
    pub number_of_sections: u16,

    /// Link time, seconds since the Unix epoch.
    ///
    /// Together with the entry point this is unique enough per build to
    /// name spice patch files.
    pub time_date_stamp: u32,

    /// Size of the optional header that follows the file header.
    pub size_of_optional_header: u16,

    /// `IMAGE_FILE_*` flags.
    pub characteristics: u16,

    /// Optional header magic (`0x10b` PE32, `0x20b` PE32+), zero if absent.
    pub magic: u16,

    /// RVA of the entry point, zero if the optional header is absent.
    pub address_of_entry_point: u32,
}

impl PeHeader {
    pub fn from_goblin(pe: &PE) -> PeHeader {
        let coff = &pe.header.coff_header;
        let (magic, address_of_entry_point) = pe
            .header
            .optional_header
            .as_ref()
            .map(|oh| {
                let fields = &oh.standard_fields;
                // stored widened to u64 by goblin, always 32 bits on disk
                (fields.magic, fields.address_of_entry_point as u32)
            })
            .unwrap_or((0, 0));

        PeHeader {
            machine: coff.machine,
            number_of_sections: coff.number_of_sections,
            time_date_stamp: coff.time_date_stamp,
            size_of_optional_header: coff.size_of_optional_header,
            characteristics: coff.characteristics,
            magic,
            address_of_entry_point,
        }
    }

    pub fn is_64(&self) -> bool {
        self.magic == PE32_PLUS_MAGIC
    }

    pub fn is_dll(&self) -> bool {
        self.characteristics & IMAGE_FILE_DLL != 0
    }

    pub fn is_executable(&self) -> bool {
        self.characteristics & IMAGE_FILE_EXECUTABLE_IMAGE != 0 && !self.is_dll()
    }

    /// Short image kind for display: `DLL`, `EXE` or `OBJ`.
    pub fn kind(&self) -> &'static str {
        if self.is_dll() {
            "DLL"
        } else if self.is_executable() {
            "EXE"
        } else {
            "OBJ"
        }
    }

    /// Build identifier: decimal time stamp followed by decimal entry point.
    pub fn build_id(&self) -> String {
        format!("{}{}", self.time_date_stamp, self.address_of_entry_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::test_image::ImageBuilder;

    #[test]
    fn reads_file_and_optional_header_fields() {
        let image = ImageBuilder::new()
            .time_date_stamp(0x5f3e_1a2b)
            .entry_point(0x1234)
            .characteristics(IMAGE_FILE_EXECUTABLE_IMAGE | IMAGE_FILE_DLL)
            .section(".text", 0x1000, 0x200)
            .build();

        let pe = PE::parse(&image).unwrap();
        let header = PeHeader::from_goblin(&pe);
        assert_eq!(header.machine, 0x14c);
        assert_eq!(header.number_of_sections, 1);
        assert_eq!(header.time_date_stamp, 0x5f3e_1a2b);
        assert_eq!(header.address_of_entry_point, 0x1234);
        assert_eq!(header.magic, 0x10b);
        assert!(header.is_dll());
        assert!(!header.is_executable());
        assert!(!header.is_64());
        assert_eq!(header.kind(), "DLL");
        assert_eq!(header.build_id(), "15979054514660");
    }

    #[test]
    fn image_kind_follows_characteristics() {
        let exe = PeHeader {
            characteristics: IMAGE_FILE_EXECUTABLE_IMAGE,
            ..Default::default()
        };
        assert!(exe.is_executable());
        assert_eq!(exe.kind(), "EXE");
        assert_eq!(PeHeader::default().kind(), "OBJ");
    }
}
