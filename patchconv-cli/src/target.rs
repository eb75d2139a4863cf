use patchconv_core::{PatchDescriptor, PatchError};
use std::path::{Path, PathBuf};

use crate::sanitize::sanitize;

/// Finds the binary a descriptor applies to inside `dir`.
///
/// Game directories often keep one copy per version named after the patcher
/// description (`2023-09-12.dll`), so that name is tried first before the
/// literal file name.
pub fn locate(dir: &Path, descriptor: &PatchDescriptor) -> Result<PathBuf, PatchError> {
    let ext = Path::new(&descriptor.file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let preferred = dir.join(format!("{}{}", sanitize(&descriptor.description), ext));

    if preferred.is_file() {
        return Ok(preferred);
    }

    log::warn!(
        "target file \"{}\" does not exist, falling back to \"{}\"...",
        preferred.display(),
        descriptor.file_name
    );

    let fallback = dir.join(sanitize(&descriptor.file_name));
    if fallback.is_file() {
        Ok(fallback)
    } else {
        Err(PatchError::MissingTarget(fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(description: &str) -> PatchDescriptor {
        PatchDescriptor {
            file_name: "soundvoltex.dll".into(),
            description: description.into(),
            entries: Vec::new(),
        }
    }

    #[test]
    fn prefers_description_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("2023-09-12.dll"), b"MZ").unwrap();
        std::fs::write(tmp.path().join("soundvoltex.dll"), b"MZ").unwrap();

        let found = locate(tmp.path(), &descriptor("2023-09-12")).unwrap();
        assert_eq!(found, tmp.path().join("2023-09-12.dll"));
    }

    #[test]
    fn falls_back_to_file_name() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("soundvoltex.dll"), b"MZ").unwrap();

        let found = locate(tmp.path(), &descriptor("2023/09/12")).unwrap();
        assert_eq!(found, tmp.path().join("soundvoltex.dll"));
    }

    #[test]
    fn missing_target_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = locate(tmp.path(), &descriptor("x")).unwrap_err();
        assert!(matches!(err, PatchError::MissingTarget(p) if p.ends_with("soundvoltex.dll")));
    }
}
