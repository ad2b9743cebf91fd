//! Transfer of the staging tree into the mounted archive.

use std::io;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::BuildError;
use crate::process::{Cmd, CommandRunner};

/// Copy everything under `staging` into `mount_point`.
///
/// `cp -a` keeps modes, ownership, timestamps, symlinks and device nodes
/// exactly as found. The staging tree is never modified.
pub fn copy_tree(
    runner: &dyn CommandRunner,
    staging: &Path,
    mount_point: &Path,
) -> Result<(), BuildError> {
    let cmd = Cmd::new("cp")
        .arg("-a")
        .arg_path(&staging.join("."))
        .arg_path(mount_point);
    let result = runner.run(&cmd)?;
    if !result.success() {
        if !result.stderr_trimmed().is_empty() {
            eprintln!("{}", result.stderr_trimmed());
        }
        return Err(BuildError::CopyFailure {
            status: result.code,
        });
    }
    Ok(())
}

/// Check that every staging entry exists in the target with the same type.
///
/// Returns the number of entries checked.
pub fn verify_copy(staging: &Path, mount_point: &Path) -> Result<usize, BuildError> {
    let mut checked = 0;
    for entry in WalkDir::new(staging).min_depth(1) {
        let entry = entry.map_err(|e| {
            BuildError::io(
                format!("walking staging area {}", staging.display()),
                io::Error::from(e),
            )
        })?;
        let relative = entry
            .path()
            .strip_prefix(staging)
            .map_err(|_| BuildError::CopyIncomplete(entry.path().to_path_buf()))?;

        let copied = mount_point.join(relative);
        match copied.symlink_metadata() {
            Ok(meta) if meta.file_type() == entry.file_type() => checked += 1,
            _ => return Err(BuildError::CopyIncomplete(relative.to_path_buf())),
        }
    }
    Ok(checked)
}
