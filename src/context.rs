//! Immutable build context derived from the stage's positional inputs.

use std::path::{Path, PathBuf};

use crate::target::{FilesystemType, TargetSpec};

/// Location of the archive relative to the package image mountpoint.
pub const BR_FILENAME: &str = "boot/x86.microroot";

/// Loopback mountpoint directory name under the temp directory.
pub const BR_LOFI_MNT_DIR: &str = "br_lofimnt";

/// Paths for one invocation. Constructed once and passed to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Manifest handle the configuration was read from.
    pub manifest: PathBuf,
    /// Package image area mountpoint.
    pub pkg_image: PathBuf,
    /// Temporary directory holding the loopback mountpoint.
    pub tmp_dir: PathBuf,
    /// Area where the bootroot was put together.
    pub staging: PathBuf,
    /// Media area. Accepted for interface compatibility, not used here.
    pub media_dir: PathBuf,
    /// Canonical archive path handed to the packaging stage.
    pub archive: PathBuf,
    /// Where the archive is mounted while it is populated.
    pub mount_point: PathBuf,
}

impl BuildContext {
    pub fn new(
        manifest: &Path,
        pkg_image: &Path,
        tmp_dir: &Path,
        staging: &Path,
        media_dir: &Path,
    ) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
            pkg_image: pkg_image.to_path_buf(),
            tmp_dir: tmp_dir.to_path_buf(),
            staging: staging.to_path_buf(),
            media_dir: media_dir.to_path_buf(),
            archive: pkg_image.join(BR_FILENAME),
            mount_point: tmp_dir.join(BR_LOFI_MNT_DIR),
        }
    }

    /// Intermediate path of the gzip-compressed archive.
    pub fn compressed_archive(&self) -> PathBuf {
        let mut name = self.archive.clone().into_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Target description used for both creating and releasing the archive.
    pub fn target_spec(&self, fs_type: FilesystemType, size_kib: u64) -> TargetSpec {
        TargetSpec {
            mount_point: self.mount_point.clone(),
            fs_type,
            size_kib,
            archive: self.archive.clone(),
        }
    }
}
