//! Archive file housekeeping: stale artifact removal and finalization.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::BuildError;

/// Final mode of the archive: rw-r--r--.
pub const ARCHIVE_MODE: u32 = 0o644;

/// Remove leftovers of a previous run. Missing files, or a missing parent
/// directory, are fine.
pub fn remove_stale(archive: &Path, compressed: &Path) -> Result<(), BuildError> {
    for path in [compressed, archive] {
        match fs::remove_file(path) {
            Ok(()) => println!("Removed stale {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BuildError::io(
                    format!("removing stale archive {}", path.display()),
                    e,
                ))
            }
        }
    }
    Ok(())
}

/// Set the final permissions on the archive.
pub fn finalize(archive: &Path) -> Result<(), BuildError> {
    fs::set_permissions(archive, fs::Permissions::from_mode(ARCHIVE_MODE)).map_err(|e| {
        BuildError::io(
            format!("setting permissions on {}", archive.display()),
            e,
        )
    })
}
