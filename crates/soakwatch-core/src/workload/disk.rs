//! Disk load: write, transform, verify and copy scratch files.
//!
//! Every path is registered with a [`ScratchFiles`] guard before it is
//! created, and the guard deletes everything it knows about when dropped.
//! The scratch directory is left exactly as it was found on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;

use super::{Workload, WorkloadError, WorkloadKind, check_stop};
use crate::intensity::WorkloadSpec;
use crate::stop::StopSignal;

/// Deletes registered paths on drop.
#[derive(Default)]
pub struct ScratchFiles {
    paths: Vec<PathBuf>,
}

impl ScratchFiles {
    pub fn register(&mut self, path: PathBuf) -> &Path {
        self.paths.push(path);
        &self.paths[self.paths.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for p in self.paths.drain(..) {
            if let Err(e) = fs::remove_file(&p) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("failed to remove scratch file {}: {e}", p.display());
                }
            }
        }
    }
}

/// What one disk cycle did, captured before cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskCycleReport {
    /// Primary files created, with their size on disk after the write phase.
    pub files: Vec<(PathBuf, u64)>,
    pub copies: usize,
    pub bytes_written: u64,
}

/// Runs [`run_cycle`] in a fixed scratch directory.
pub struct DiskWorkload {
    scratch_dir: PathBuf,
}

impl DiskWorkload {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

impl Workload for DiskWorkload {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Disk
    }

    fn execute(&self, spec: &WorkloadSpec, stop: &StopSignal) -> Result<String, WorkloadError> {
        let report = run_cycle(&self.scratch_dir, spec, stop)?;
        Ok(format!(
            "{} files x {} KiB verified, {} copies, {} KiB written",
            report.files.len(),
            spec.file_size / 1024,
            report.copies,
            report.bytes_written / 1024
        ))
    }
}

/// Create `file_count` files of `file_size` random bytes in `dir`, then for
/// each: read, byte-reverse, write back, verify; copy and verify the copy.
pub fn run_cycle(
    dir: &Path,
    spec: &WorkloadSpec,
    stop: &StopSignal,
) -> Result<DiskCycleReport, WorkloadError> {
    cycle_with(dir, spec, stop, &mut |_| {})
}

/// [`run_cycle`] with a callback invoked after each primary file is written.
fn cycle_with(
    dir: &Path,
    spec: &WorkloadSpec,
    stop: &StopSignal,
    after_write: &mut dyn FnMut(&Path),
) -> Result<DiskCycleReport, WorkloadError> {
    check_stop(stop)?;
    let mut scratch = ScratchFiles::default();
    let run_id = uuid::Uuid::new_v4().simple().to_string();
    let mut rng = rand::rng();
    let mut report = DiskCycleReport {
        files: Vec::with_capacity(spec.file_count),
        copies: 0,
        bytes_written: 0,
    };

    let mut buf = vec![0u8; spec.file_size];
    for i in 0..spec.file_count {
        rng.fill_bytes(&mut buf);
        let path = scratch
            .register(dir.join(format!("soak_{run_id}_{i}.bin")))
            .to_path_buf();
        fs::write(&path, &buf)?;
        report.bytes_written += buf.len() as u64;
        report.files.push((path.clone(), fs::metadata(&path)?.len()));
        after_write(&path);
        check_stop(stop)?;

        let mut data = fs::read(&path)?;
        data.reverse();
        fs::write(&path, &data)?;
        report.bytes_written += data.len() as u64;
        let reread = fs::read(&path)?;
        if reread != data {
            return Err(WorkloadError::VerifyMismatch {
                path,
                reason: "reversed content did not read back".into(),
            });
        }
        check_stop(stop)?;

        let copy = scratch
            .register(dir.join(format!("soak_{run_id}_{i}.copy")))
            .to_path_buf();
        fs::copy(&path, &copy)?;
        report.bytes_written += data.len() as u64;
        report.copies += 1;
        if fs::read(&copy)? != reread {
            return Err(WorkloadError::VerifyMismatch {
                path: copy,
                reason: "copy differs from source".into(),
            });
        }
        check_stop(stop)?;
    }

    drop(scratch);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::IntensityLevel;

    fn listing(dir: &Path) -> Vec<PathBuf> {
        let mut v: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_tier_one_files_and_cleanup() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("keep.txt"), b"untouched").unwrap();
        let before = listing(tmp.path());

        let spec = WorkloadSpec::for_level(IntensityLevel::Low);
        let report = run_cycle(tmp.path(), &spec, &StopSignal::new()).unwrap();

        assert_eq!(report.files.len(), spec.file_count);
        assert_eq!(report.files.len(), 1);
        for (_, size) in &report.files {
            assert_eq!(*size, spec.file_size as u64);
        }
        assert_eq!(report.copies, 1);
        assert_eq!(listing(tmp.path()), before);
    }

    #[test]
    fn test_cleanup_on_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let spec = WorkloadSpec::for_level(IntensityLevel::Low);
        let r = run_cycle(&missing, &spec, &StopSignal::new());
        assert!(matches!(r, Err(WorkloadError::Io(_))));
        assert!(listing(tmp.path()).is_empty());
    }

    #[test]
    fn test_cleanup_when_stopped_mid_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("keep.txt"), b"untouched").unwrap();
        let before = listing(tmp.path());

        let spec = WorkloadSpec::for_level(IntensityLevel::High);
        let stop = StopSignal::new();
        let mut seen_on_disk = 0;
        let r = cycle_with(tmp.path(), &spec, &stop, &mut |path| {
            assert!(path.exists());
            seen_on_disk = listing(tmp.path()).len();
            stop.stop();
        });

        assert!(matches!(r, Err(WorkloadError::Cancelled)));
        // The first file existed when the cycle was interrupted.
        assert_eq!(seen_on_disk, before.len() + 1);
        assert_eq!(listing(tmp.path()), before);
    }

    #[test]
    fn test_cleanup_when_copy_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let before = listing(tmp.path());
        let spec = WorkloadSpec::for_level(IntensityLevel::Medium);
        let mut blocked = None;
        let r = cycle_with(tmp.path(), &spec, &StopSignal::new(), &mut |path| {
            if blocked.is_none() {
                // A directory in the way makes the copy step fail.
                let copy = path.with_extension("copy");
                fs::create_dir(&copy).unwrap();
                blocked = Some(copy);
            }
        });

        assert!(matches!(r, Err(WorkloadError::Io(_))));
        let blocked = blocked.unwrap();
        fs::remove_dir(&blocked).unwrap();
        assert_eq!(listing(tmp.path()), before);
    }

    #[test]
    fn test_guard_removes_registered_files() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let mut guard = ScratchFiles::default();
            let p = guard.register(tmp.path().join("a.bin")).to_path_buf();
            fs::write(&p, b"x").unwrap();
            // Registered but never created.
            guard.register(tmp.path().join("b.bin"));
            assert_eq!(guard.len(), 2);
        }
        assert!(listing(tmp.path()).is_empty());
    }

    #[test]
    fn test_workload_medium() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = WorkloadSpec::for_level(IntensityLevel::Medium);
        let r = DiskWorkload::new(tmp.path()).run(&spec, &StopSignal::new());
        assert!(r.is_success(), "{:?}", r.error);
        assert!(r.detail.starts_with("2 files x 512 KiB"));
        assert!(listing(tmp.path()).is_empty());
    }
}
