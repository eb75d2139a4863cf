use super::{format_bytes, format_rva, Conversion, Tally};
use crate::binary::Binary;
use crate::diff::diff;
use crate::error::Result;
use std::fmt::Write;

/// Builds mempatch lines from the differences between `original` and
/// `modified`, one line per differing run.
///
/// Lines are named after `original.file_name` and carry no entry headers.
pub fn derive_patch(original: &Binary, modified: &[u8]) -> Result<Conversion<String>> {
    let runs = diff(&original.data, modified)?;
    let mut tally = Tally::default();
    let mut output = String::new();
    let mut converted = 0;

    for run in &runs {
        let label = format!("run at {:#x}", run.offset);
        let Some(rva) = tally.resolve(original, &label, run.offset) else {
            continue;
        };
        let _ = writeln!(
            output,
            "{} {} {} {}",
            original.file_name,
            format_rva(rva),
            format_bytes(&run.on),
            format_bytes(&run.off)
        );
        converted += 1;
    }

    log::info!("writing {} of {} patches", converted, runs.len());
    Ok(tally.finish(output, converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::test_image::ImageBuilder;
    use crate::encode::WarningKind;
    use crate::error::PatchError;
    use crate::sections::{Section, SectionTable};

    #[test]
    fn one_line_per_run() {
        let image = ImageBuilder::new()
            .section(".text", 0x1000, 0x200)
            .section(".rdata", 0x2000, 0x200)
            .bytes(0x410, &[0x74, 0x05])
            .build();
        let mut modified = image.clone();
        modified[0x410] = 0xeb;
        modified[0x411] = 0x06;
        modified[0x640] = 0x01;
        let original = Binary::parse("bm2dx.dll", image).unwrap();

        let c = derive_patch(&original, &modified).unwrap();
        assert_eq!(c.output, "bm2dx.dll 1010 EB06 7405\nbm2dx.dll 2040 01 00\n");
        assert_eq!(c.converted, 2);
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn header_changes_warn_and_skip() {
        let sections = SectionTable::new(vec![Section::new(0x1000, 0x10, 0x10)]);
        let original = Binary::from_parts("a.exe", vec![0u8; 0x20], sections);
        let mut modified = vec![0u8; 0x20];
        modified[0x2] = 1;
        modified[0x12] = 2;

        let c = derive_patch(&original, &modified).unwrap();
        assert_eq!(c.output, "a.exe 1002 02 00\n");
        assert_eq!(c.warnings[0].kind, WarningKind::UnresolvableOffset(2));
    }

    #[test]
    fn differ_errors_propagate() {
        let original = Binary::from_parts("a.exe", vec![0u8; 4], SectionTable::default());
        assert!(matches!(
            derive_patch(&original, &[0u8; 4]),
            Err(PatchError::NoDifferences)
        ));
        assert!(matches!(
            derive_patch(&original, &[0u8; 5]),
            Err(PatchError::SizeMismatch { .. })
        ));
    }
}
