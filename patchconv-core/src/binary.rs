use crate::error::{PatchError, Result};
use crate::header::PeHeader;
use crate::sections::SectionTable;
use goblin::Object;
use std::path::Path;

/// A target image read fully into memory.
///
/// Holds the untouched bytes (union patches slice their "off" state from
/// them), the section table used to resolve offsets, and the header fields
/// used to name output files.
#[derive(Debug, Clone)]
pub struct Binary {
    pub file_name: String,
    pub data: Vec<u8>,
    pub sections: SectionTable,
    pub header: PeHeader,
}

impl Binary {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        log::debug!("Read {} bytes from {}", data.len(), path.display());
        Self::parse(file_name, data)
    }

    pub fn parse(file_name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let (sections, header) = match Object::parse(&data)? {
            Object::PE(pe) => (SectionTable::from_goblin(&pe), PeHeader::from_goblin(&pe)),
            _ => return Err(PatchError::InvalidImage("not a PE image".into())),
        };

        if sections.is_empty() {
            log::warn!("Image has no sections; no offset will resolve");
        } else {
            log::info!("Loaded {} sections", sections.sections().len());
        }

        Ok(Self {
            file_name: file_name.into(),
            data,
            sections,
            header,
        })
    }

    /// Builds a binary from an already known section table.
    pub fn from_parts(file_name: impl Into<String>, data: Vec<u8>, sections: SectionTable) -> Self {
        Self {
            file_name: file_name.into(),
            data,
            sections,
            header: PeHeader::default(),
        }
    }

    pub fn resolve(&self, offset: u32) -> Option<u32> {
        self.sections.resolve(offset)
    }

    /// Returns `len` bytes of the original image starting at `offset`.
    pub fn bytes_at(&self, offset: u32, len: usize) -> Option<&[u8]> {
        let start = offset as usize;
        self.data.get(start..start.checked_add(len)?)
    }
}

#[cfg(any(test, feature = "test-image"))]
pub mod test_image {
    use byteorder::{WriteBytesExt, LE};
    use std::io::Write;

    const PE_OFFSET: usize = 0x80;
    const OPTIONAL_HEADER_SIZE: u16 = 0xe0;
    const HEADERS_SIZE: u32 = 0x400;

    /// Minimal PE32 image writer for tests.
    #[derive(Debug, Clone)]
    pub struct ImageBuilder {
        time_date_stamp: u32,
        entry_point: u32,
        characteristics: u16,
        sections: Vec<(String, u32, u32)>,
        patches: Vec<(usize, Vec<u8>)>,
    }

    impl Default for ImageBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ImageBuilder {
        pub fn new() -> Self {
            Self {
                time_date_stamp: 0,
                entry_point: 0,
                characteristics: 0x0102,
                sections: Vec::new(),
                patches: Vec::new(),
            }
        }

        pub fn time_date_stamp(mut self, v: u32) -> Self {
            self.time_date_stamp = v;
            self
        }

        pub fn entry_point(mut self, v: u32) -> Self {
            self.entry_point = v;
            self
        }

        pub fn characteristics(mut self, v: u16) -> Self {
            self.characteristics = v;
            self
        }

        /// Adds a section; raw data is laid out back to back from 0x400.
        pub fn section(mut self, name: &str, virtual_address: u32, raw_size: u32) -> Self {
            self.sections.push((name.to_string(), virtual_address, raw_size));
            self
        }

        /// Overwrites bytes of the finished image at a file offset.
        pub fn bytes(mut self, offset: usize, data: &[u8]) -> Self {
            self.patches.push((offset, data.to_vec()));
            self
        }

        pub fn build(self) -> Vec<u8> {
            let raw_total: u32 = self.sections.iter().map(|s| s.2).sum();
            let mut out = Vec::new();

            // DOS header, stub left zeroed
            out.extend_from_slice(b"MZ");
            out.resize(0x3c, 0);
            out.write_u32::<LE>(PE_OFFSET as u32).unwrap();
            out.resize(PE_OFFSET, 0);

            // COFF file header
            out.extend_from_slice(b"PE\0\0");
            out.write_u16::<LE>(0x14c).unwrap();
            out.write_u16::<LE>(self.sections.len() as u16).unwrap();
            out.write_u32::<LE>(self.time_date_stamp).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u16::<LE>(OPTIONAL_HEADER_SIZE).unwrap();
            out.write_u16::<LE>(self.characteristics).unwrap();

            // PE32 optional header, standard fields
            let size_of_image = self
                .sections
                .iter()
                .map(|s| s.1 + s.2)
                .max()
                .unwrap_or(0x1000);
            out.write_u16::<LE>(0x10b).unwrap();
            out.write_u8(14).unwrap();
            out.write_u8(0).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u32::<LE>(self.entry_point).unwrap();
            out.write_u32::<LE>(0x1000).unwrap();
            out.write_u32::<LE>(0).unwrap();

            // windows fields
            out.write_u32::<LE>(0x1000_0000).unwrap();
            out.write_u32::<LE>(0x1000).unwrap();
            out.write_u32::<LE>(0x200).unwrap();
            for v in [6u16, 0, 0, 0, 6, 0] {
                out.write_u16::<LE>(v).unwrap();
            }
            out.write_u32::<LE>(0).unwrap();
            out.write_u32::<LE>(size_of_image).unwrap();
            out.write_u32::<LE>(HEADERS_SIZE).unwrap();
            out.write_u32::<LE>(0).unwrap();
            out.write_u16::<LE>(2).unwrap();
            out.write_u16::<LE>(0).unwrap();
            for v in [0x10_0000u32, 0x1000, 0x10_0000, 0x1000, 0] {
                out.write_u32::<LE>(v).unwrap();
            }
            out.write_u32::<LE>(16).unwrap();
            out.resize(out.len() + 16 * 8, 0);

            // section table
            let mut pointer = HEADERS_SIZE;
            for (name, virtual_address, raw_size) in &self.sections {
                let mut raw_name = [0u8; 8];
                let n = name.len().min(8);
                raw_name[..n].copy_from_slice(&name.as_bytes()[..n]);
                out.write_all(&raw_name).unwrap();
                out.write_u32::<LE>(*raw_size).unwrap();
                out.write_u32::<LE>(*virtual_address).unwrap();
                out.write_u32::<LE>(*raw_size).unwrap();
                out.write_u32::<LE>(pointer).unwrap();
                out.write_u32::<LE>(0).unwrap();
                out.write_u32::<LE>(0).unwrap();
                out.write_u16::<LE>(0).unwrap();
                out.write_u16::<LE>(0).unwrap();
                out.write_u32::<LE>(0x6000_0020).unwrap();
                pointer += raw_size;
            }

            out.resize((HEADERS_SIZE + raw_total) as usize, 0);
            for (offset, data) in self.patches {
                out[offset..offset + data.len()].copy_from_slice(&data);
            }
            out
        }
    }
}
