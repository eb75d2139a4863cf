//! mempatch-hook text grammar.
//!
//! ```text
//! # <entry name>
//! ## <union option name>
//! <file> <RVA> <on bytes> <off bytes>
//! # <file> <RVA> <on bytes> <off bytes>
//! ```
//!
//! Data lines whose on and off bytes coincide change nothing when applied;
//! they are written commented out so they read as placeholders.

use super::{format_bytes, format_rva, Conversion, Tally, WarningKind};
use crate::binary::Binary;
use crate::patch::{PatchDescriptor, PatchEntry};
use std::fmt::Write;

/// Renders one `.mph` file for `descriptor` against its target `binary`.
pub fn encode_mempatch(descriptor: &PatchDescriptor, binary: &Binary) -> Conversion<String> {
    let mut tally = Tally::default();
    let mut blocks = Vec::new();

    for entry in &descriptor.entries {
        if let Some(block) = render_entry(entry, &descriptor.file_name, binary, &mut tally) {
            blocks.push(block);
        }
    }

    log::info!(
        "successfully converted {} patches for \"{}\" version \"{}\"",
        blocks.len(),
        descriptor.file_name,
        descriptor.description
    );

    let converted = blocks.len();
    tally.finish(blocks.join("\n"), converted)
}

fn render_entry(
    entry: &PatchEntry,
    file_name: &str,
    binary: &Binary,
    tally: &mut Tally,
) -> Option<String> {
    match entry {
        PatchEntry::NumberUnsupported { name } => {
            tally.warn(name, WarningKind::UnsupportedVariant);
            None
        }
        PatchEntry::Plain { name, patches, .. } => {
            let mut lines = String::new();
            for patch in patches {
                let Some(rva) = tally.resolve(binary, name, patch.offset) else {
                    continue;
                };
                push_data_line(&mut lines, file_name, rva, &patch.on, &patch.off);
            }

            if lines.is_empty() {
                return None;
            }
            Some(format!("# {name}\n{lines}"))
        }
        PatchEntry::Union {
            name,
            offset,
            options,
            ..
        } => {
            let rva = tally.resolve(binary, name, *offset)?;

            let mut lines = String::new();
            let mut dropped = 0;
            // options[0] is what the binary already contains
            for option in options.iter().skip(1) {
                let Some(off) = tally.slice(binary, name, *offset, option.bytes.len()) else {
                    dropped += 1;
                    continue;
                };
                let _ = writeln!(lines, "## {}", option.name);
                push_data_line(&mut lines, file_name, rva, &option.bytes, off);
            }

            if dropped > 0 && lines.is_empty() {
                return None;
            }
            Some(format!("# {name}\n{lines}"))
        }
    }
}

fn push_data_line(out: &mut String, file_name: &str, rva: u32, on: &[u8], off: &[u8]) {
    if on == off {
        out.push_str("# ");
    }
    let _ = writeln!(
        out,
        "{} {} {} {}",
        file_name,
        format_rva(rva),
        format_bytes(on),
        format_bytes(off)
    );
}
