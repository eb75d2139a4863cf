use anyhow::{Context, Result};
use colored::Colorize;
use patchconv_core::encode::spice::to_json_pretty;
use patchconv_core::encode::{encode_mempatch, encode_spice};
use patchconv_core::{Binary, PatchDescriptor, PatchError, descriptors_from_json};
use std::path::{Path, PathBuf};

use crate::output::write_atomic;
use crate::sanitize::sanitize;
use crate::target;

pub enum Format {
    Mempatch,
    Spice { prefix: String },
}

#[derive(Debug, Default)]
pub struct Summary {
    pub written: usize,
    pub failed: usize,
    pub warnings: usize,
}

impl Summary {
    pub fn print(&self) {
        let written = format!("{} written", self.written).green();
        let failed = if self.failed > 0 {
            format!("{} failed", self.failed).red()
        } else {
            format!("{} failed", self.failed).normal()
        };
        let warnings = if self.warnings > 0 {
            format!("{} warnings", self.warnings).yellow()
        } else {
            format!("{} warnings", self.warnings).normal()
        };
        println!("{written}, {failed}, {warnings}");
    }
}

/// Converts every descriptor in one extractor output file.
///
/// A descriptor that fails is logged and counted; the others still run.
pub fn run_source(source: &Path, dir: &Path, out_dir: &Path, format: &Format, summary: &mut Summary) {
    log::info!("reading patches from {}", source.display());

    let descriptors = match std::fs::read_to_string(source)
        .map_err(PatchError::from)
        .and_then(|s| descriptors_from_json(&s))
    {
        Ok(d) => d,
        Err(e) => {
            log::error!("{}: {e}", source.display());
            summary.failed += 1;
            return;
        }
    };

    for (index, descriptor) in descriptors.iter().enumerate() {
        let descriptor = match descriptor {
            Ok(d) => d,
            Err(e) => {
                log::error!("{} descriptor #{index}: {e}", source.display());
                summary.failed += 1;
                continue;
            }
        };

        match convert_descriptor(descriptor, dir, out_dir, format, summary) {
            Ok(Some(path)) => {
                log::info!("wrote patch file \"{}\"", path.display());
                summary.written += 1;
            }
            Ok(None) => {}
            Err(e) => {
                log::error!(
                    "\"{}\" version \"{}\": {e:#}",
                    descriptor.file_name,
                    descriptor.description
                );
                summary.failed += 1;
            }
        }
    }
}

fn convert_descriptor(
    descriptor: &PatchDescriptor,
    dir: &Path,
    out_dir: &Path,
    format: &Format,
    summary: &mut Summary,
) -> Result<Option<PathBuf>> {
    let exe = target::locate(dir, descriptor)?;
    let binary =
        Binary::open(&exe).with_context(|| format!("failed to load \"{}\"", exe.display()))?;

    let (file_name, contents) = match format {
        Format::Mempatch => {
            let conversion = encode_mempatch(descriptor, &binary);
            summary.warnings += conversion.warnings.len();
            if conversion.converted == 0 {
                log::warn!("nothing to write for \"{}\"", descriptor.file_name);
                return Ok(None);
            }
            let name = format!("{}.{}.mph", descriptor.description, descriptor.file_name);
            (sanitize(&name), conversion.output)
        }
        Format::Spice { prefix } => {
            let conversion = encode_spice(descriptor, &binary, prefix);
            summary.warnings += conversion.warnings.len();
            let name = format!("{}.json", binary.header.build_id());
            (sanitize(&name), to_json_pretty(&conversion.output)?)
        }
    };

    let path = out_dir.join(file_name);
    write_atomic(&path, contents.as_bytes())?;
    Ok(Some(path))
}
