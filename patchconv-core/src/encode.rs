pub mod derive;
pub mod mempatch;
pub mod spice;

pub use derive::derive_patch;
pub use mempatch::encode_mempatch;
pub use spice::{encode_spice, SpiceRecord};

use crate::binary::Binary;
use std::fmt;

/// Why an entry, or part of one, was left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// File offset outside every section.
    UnresolvableOffset(u32),
    /// Union slice reaching past the end of the target binary.
    OutOfBounds { offset: u32, len: usize },
    /// `number` patches have no representation in either grammar.
    UnsupportedVariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub entry: String,
    pub kind: WarningKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WarningKind::UnresolvableOffset(offset) => write!(
                f,
                "offset {offset:#x} of \"{}\" is not in any section, skipping",
                self.entry
            ),
            WarningKind::OutOfBounds { offset, len } => write!(
                f,
                "{len} bytes at {offset:#x} of \"{}\" lie past the end of the binary, skipping",
                self.entry
            ),
            WarningKind::UnsupportedVariant => {
                write!(f, "number patch not supported, skipping \"{}\"", self.entry)
            }
        }
    }
}

/// Output of one encoder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion<T> {
    pub output: T,
    /// Entries that made it into `output`.
    pub converted: usize,
    pub warnings: Vec<Warning>,
}

/// Collects warnings while an encoder folds over a descriptor.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    warnings: Vec<Warning>,
}

impl Tally {
    pub(crate) fn warn(&mut self, entry: &str, kind: WarningKind) {
        let warning = Warning {
            entry: entry.to_string(),
            kind,
        };
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Resolves `offset`, recording a warning when it maps to no section.
    pub(crate) fn resolve(&mut self, binary: &Binary, entry: &str, offset: u32) -> Option<u32> {
        let rva = binary.resolve(offset);
        if rva.is_none() {
            self.warn(entry, WarningKind::UnresolvableOffset(offset));
        }
        rva
    }

    /// Original bytes under a union option, recording a warning when the
    /// slice leaves the binary.
    pub(crate) fn slice<'a>(
        &mut self,
        binary: &'a Binary,
        entry: &str,
        offset: u32,
        len: usize,
    ) -> Option<&'a [u8]> {
        let bytes = binary.bytes_at(offset, len);
        if bytes.is_none() {
            self.warn(entry, WarningKind::OutOfBounds { offset, len });
        }
        bytes
    }

    pub(crate) fn finish<T>(self, output: T, converted: usize) -> Conversion<T> {
        Conversion {
            output,
            converted,
            warnings: self.warnings,
        }
    }
}

/// Uppercase hex pairs without separators.
pub fn format_bytes(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Uppercase hex RVA without a radix prefix.
pub fn format_rva(rva: u32) -> String {
    format!("{rva:X}")
}
