//! Lifecycle of the loopback-backed archive target.
//!
//! Creating a target allocates the flat archive file, formats it and mounts
//! it. Releasing unmounts it, leaving the archive behind as the flat image.
//! Release is idempotent and tolerates a partially created target.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::BuildError;
use crate::process::{Cmd, CommandRunner};

/// Filesystem the archive is formatted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilesystemType {
    #[default]
    Ext2,
    Ext4,
}

impl FilesystemType {
    pub fn parse(name: &str) -> Result<Self, BuildError> {
        match name.trim() {
            "ext2" => Ok(Self::Ext2),
            "ext4" => Ok(Self::Ext4),
            other => Err(BuildError::UnsupportedFilesystemType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ext2 => "ext2",
            Self::Ext4 => "ext4",
        }
    }
}

impl fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to create a target and to release it again.
///
/// Release must be called with the same spec that was used for create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub mount_point: PathBuf,
    pub fs_type: FilesystemType,
    pub size_kib: u64,
    pub archive: PathBuf,
}

/// Creates and releases archive targets.
pub trait TargetService: Send + Sync {
    fn create(&self, spec: &TargetSpec) -> Result<(), BuildError>;
    fn release(&self, spec: &TargetSpec) -> Result<(), BuildError>;
}

/// Loop-mounted file target built from util-linux and e2fsprogs tools.
pub struct LoopbackTarget {
    runner: Arc<dyn CommandRunner>,
}

impl LoopbackTarget {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn create_step(&self, cmd: Cmd) -> Result<(), BuildError> {
        let result = self.runner.run(&cmd)?;
        if !result.success() {
            return Err(BuildError::TargetCreateFailure {
                command: cmd.to_string(),
                status: result.code,
            });
        }
        Ok(())
    }

    fn is_mounted(&self, spec: &TargetSpec) -> Result<bool, BuildError> {
        let result = self
            .runner
            .run(&Cmd::new("mountpoint").arg("-q").arg_path(&spec.mount_point))?;
        Ok(result.success())
    }
}

impl TargetService for LoopbackTarget {
    fn create(&self, spec: &TargetSpec) -> Result<(), BuildError> {
        fs::create_dir_all(&spec.mount_point).map_err(|e| {
            BuildError::io(
                format!("creating mountpoint {}", spec.mount_point.display()),
                e,
            )
        })?;
        if let Some(parent) = spec.archive.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BuildError::io(format!("creating archive directory {}", parent.display()), e)
            })?;
        }

        self.create_step(
            Cmd::new("truncate")
                .arg("-s")
                .arg(format!("{}K", spec.size_kib))
                .arg_path(&spec.archive),
        )?;
        self.create_step(
            Cmd::new(format!("mkfs.{}", spec.fs_type))
                .args(["-F", "-q"])
                .arg_path(&spec.archive),
        )?;
        self.create_step(
            Cmd::new("mount")
                .arg("-t")
                .arg(spec.fs_type.as_str())
                .args(["-o", "loop"])
                .arg_path(&spec.archive)
                .arg_path(&spec.mount_point),
        )
    }

    fn release(&self, spec: &TargetSpec) -> Result<(), BuildError> {
        if spec.mount_point.exists() && self.is_mounted(spec)? {
            let cmd = Cmd::new("umount").arg_path(&spec.mount_point);
            let result = self.runner.run(&cmd)?;
            if !result.success() {
                return Err(BuildError::TargetReleaseFailure {
                    command: cmd.to_string(),
                    status: result.code,
                });
            }
        }

        // Only succeeds once the directory is unmounted and empty.
        let _ = fs::remove_dir(&spec.mount_point);
        Ok(())
    }
}
