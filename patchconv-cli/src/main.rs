mod convert;
mod output;
mod sanitize;
mod target;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use patchconv_core::Binary;
use patchconv_core::encode::derive_patch;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::convert::{Format, Summary};

/// BemaniPatcher patch converter
#[derive(Parser)]
#[command(
    name = "patchconv",
    about = "Convert BemaniPatcher patches to mempatch-hook and spice2x formats",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert extracted patches to mempatch-hook files
    Mempatch(BatchArgs),
    /// Convert extracted patches to spice2x patch files
    Spice {
        /// Game code prefix (e.g. LDJ, KFC)
        #[arg(long)]
        prefix: String,
        #[command(flatten)]
        batch: BatchArgs,
    },
    /// Create a mempatch file from differences in two binaries
    Diff {
        /// Original binary
        #[arg(short, long)]
        original: PathBuf,
        /// Modified binary
        #[arg(short, long)]
        modified: PathBuf,
        /// Output patch file
        #[arg(short, long)]
        patch: PathBuf,
    },
    /// List the section table of a PE image
    Sections {
        /// Path to binary file
        path: PathBuf,
    },
}

#[derive(Args)]
struct BatchArgs {
    /// Patch descriptor files (JSON) produced by the extractor
    #[arg(long, num_args = 1.., required = true)]
    descriptors: Vec<PathBuf>,
    /// Directory containing executables to patch, one per descriptor file
    #[arg(long, num_args = 1.., required = true)]
    dir: Vec<PathBuf>,
    /// Directory to write output files to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Tabled)]
struct SectionRow {
    #[tabled(rename = "Section")]
    name: String,
    #[tabled(rename = "RVA")]
    rva: String,
    #[tabled(rename = "Virtual size")]
    virtual_size: String,
    #[tabled(rename = "Raw offset")]
    raw_offset: String,
    #[tabled(rename = "Raw size")]
    raw_size: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Mempatch(batch) => run_batch(&batch, &Format::Mempatch)?,

        Command::Spice { prefix, batch } => run_batch(&batch, &Format::Spice { prefix })?,

        Command::Diff {
            original,
            modified,
            patch,
        } => {
            let original = Binary::open(&original)
                .with_context(|| format!("failed to load \"{}\"", original.display()))?;
            let modified = std::fs::read(&modified)
                .with_context(|| format!("failed to read \"{}\"", modified.display()))?;

            let conversion = derive_patch(&original, &modified)?;
            log::info!(
                "writing {} patches to file \"{}\"...",
                conversion.converted,
                patch.display()
            );
            output::write_atomic(&patch, conversion.output.as_bytes())?;
        }

        Command::Sections { path } => {
            let bin = Binary::open(&path)
                .with_context(|| format!("failed to load \"{}\"", path.display()))?;

            println!(
                "{} time stamp {} entry point 0x{:x} ({} {})",
                bin.file_name.bold(),
                bin.header.time_date_stamp,
                bin.header.address_of_entry_point,
                if bin.header.is_64() { "PE32+" } else { "PE32" },
                bin.header.kind()
            );

            if bin.sections.is_empty() {
                println!("No sections found.");
            } else {
                let rows = bin.sections.sections().iter().map(|s| SectionRow {
                    name: s.name.clone(),
                    rva: format!("0x{:x}", s.virtual_address),
                    virtual_size: format!("0x{:x}", s.virtual_size),
                    raw_offset: format!("0x{:x}", s.pointer_to_raw_data),
                    raw_size: format!("0x{:x}", s.size_of_raw_data),
                    flags: format!("0x{:08x}", s.flags),
                });
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
    }

    Ok(())
}

fn run_batch(batch: &BatchArgs, format: &Format) -> Result<()> {
    if batch.descriptors.len() != batch.dir.len() {
        bail!("--descriptors and --dir must have the same number of arguments");
    }

    std::fs::create_dir_all(&batch.output)
        .with_context(|| format!("failed to create \"{}\"", batch.output.display()))?;

    let mut summary = Summary::default();
    for (source, dir) in batch.descriptors.iter().zip(&batch.dir) {
        convert::run_source(source, dir, &batch.output, format, &mut summary);
    }

    summary.print();
    Ok(())
}
