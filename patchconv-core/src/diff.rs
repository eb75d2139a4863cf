use crate::error::{PatchError, Result};

/// A maximal span of differing bytes between two same-sized buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRun {
    pub offset: u32,
    /// Bytes of the modified buffer.
    pub on: Vec<u8>,
    /// Bytes of the original buffer.
    pub off: Vec<u8>,
}

impl DiffRun {
    fn end(&self) -> usize {
        self.offset as usize + self.on.len()
    }

    /// Writes the modified bytes of this run over `buf`.
    ///
    /// Returns `None` and leaves `buf` untouched if the run does not fit.
    pub fn apply(&self, buf: &mut [u8]) -> Option<()> {
        buf.get_mut(self.offset as usize..self.end())?
            .copy_from_slice(&self.on);
        Some(())
    }
}

/// Collects the contiguous runs where `modified` differs from `original`.
///
/// Runs come out ordered by offset. Two differing bytes share a run only if
/// they are adjacent; a single equal byte between them splits the run.
pub fn diff(original: &[u8], modified: &[u8]) -> Result<Vec<DiffRun>> {
    if original.len() != modified.len() {
        return Err(PatchError::SizeMismatch {
            original: original.len(),
            modified: modified.len(),
        });
    }

    let mut runs: Vec<DiffRun> = Vec::new();

    for (i, (&off, &on)) in original.iter().zip(modified).enumerate() {
        if on == off {
            continue;
        }

        match runs.last_mut() {
            Some(run) if run.end() == i => {
                run.on.push(on);
                run.off.push(off);
            }
            _ => {
                let offset = u32::try_from(i).map_err(|_| PatchError::OffsetOverflow(i))?;
                runs.push(DiffRun {
                    offset,
                    on: vec![on],
                    off: vec![off],
                });
            }
        }
    }

    if runs.is_empty() {
        return Err(PatchError::NoDifferences);
    }

    log::debug!("Found {} differing runs", runs.len());
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(offset: u32, on: &[u8], off: &[u8]) -> DiffRun {
        DiffRun {
            offset,
            on: on.to_vec(),
            off: off.to_vec(),
        }
    }

    #[test]
    fn merges_adjacent_bytes_only() {
        let original = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let modified = [0x00, 0xaa, 0xbb, 0x33, 0xcc, 0x55, 0x66];

        let runs = diff(&original, &modified).unwrap();
        assert_eq!(
            runs,
            vec![run(1, &[0xaa, 0xbb], &[0x11, 0x22]), run(4, &[0xcc], &[0x44])]
        );
    }

    #[test]
    fn runs_at_buffer_edges() {
        let original = [1, 2, 3, 4];
        let modified = [9, 2, 3, 8];

        let runs = diff(&original, &modified).unwrap();
        assert_eq!(runs, vec![run(0, &[9], &[1]), run(3, &[8], &[4])]);
    }

    #[test]
    fn whole_buffer_is_one_run() {
        let runs = diff(&[1, 2, 3], &[4, 5, 6]).unwrap();
        assert_eq!(runs, vec![run(0, &[4, 5, 6], &[1, 2, 3])]);
    }

    #[test]
    fn applying_runs_reproduces_modified() {
        let original: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let mut modified = original.clone();
        for i in [3usize, 4, 5, 100, 102, 1000, 4095] {
            modified[i] ^= 0x5a;
        }

        let runs = diff(&original, &modified).unwrap();
        assert_eq!(runs.len(), 5);

        let mut rebuilt = original.clone();
        for r in &runs {
            assert_eq!(r.on.len(), r.off.len());
            assert_eq!(&original[r.offset as usize..r.end()], r.off.as_slice());
            assert_eq!(r.apply(&mut rebuilt), Some(()));
        }
        assert_eq!(rebuilt, modified);

        for pair in runs.windows(2) {
            // disjoint, ascending, and at least one equal byte in between
            assert!(pair[0].end() < pair[1].offset as usize);
        }
    }

    #[test]
    fn apply_rejects_short_buffer() {
        let r = run(2, &[0xaa, 0xbb], &[0, 0]);
        let mut short = [1u8, 2, 3];
        assert_eq!(r.apply(&mut short), None);
        assert_eq!(short, [1, 2, 3]);

        let mut exact = [1u8, 2, 3, 4];
        assert_eq!(r.apply(&mut exact), Some(()));
        assert_eq!(exact, [1, 2, 0xaa, 0xbb]);
    }

    #[test]
    fn identical_buffers_have_no_differences() {
        let err = diff(&[1, 2, 3], &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, PatchError::NoDifferences));

        let err = diff(&[], &[]).unwrap_err();
        assert!(matches!(err, PatchError::NoDifferences));
    }

    #[test]
    fn size_mismatch_is_fatal() {
        let err = diff(&[1, 2, 3], &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            PatchError::SizeMismatch {
                original: 3,
                modified: 2
            }
        ));
    }
}
