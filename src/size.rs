//! Sizing of the archive from the staging tree's on-disk usage.

use std::path::Path;

use crate::error::BuildError;
use crate::process::{Cmd, CommandRunner};

/// Raw and padded archive sizes, in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSize {
    pub raw_kib: u64,
    pub padded_kib: u64,
}

/// Measure the staging tree with `du -sk` and add the padding.
pub fn estimate(
    runner: &dyn CommandRunner,
    staging: &Path,
    padding_kib: u64,
) -> Result<ArchiveSize, BuildError> {
    let cmd = Cmd::new("du").arg("-sk").arg_path(staging);
    let result = runner.run(&cmd)?;
    if !result.success() {
        return Err(BuildError::SizingFailure(format!(
            "'{}' returned {}: {}",
            cmd,
            result.code,
            result.stderr_trimmed()
        )));
    }

    let raw_kib = parse_du_output(&result.stdout)?;
    let padded_kib = raw_kib
        .checked_add(padding_kib)
        .ok_or_else(|| BuildError::SizingFailure("padded size overflows".to_string()))?;
    if padded_kib == 0 {
        return Err(BuildError::SizingFailure(
            "staging area is empty and no padding is configured".to_string(),
        ));
    }

    Ok(ArchiveSize {
        raw_kib,
        padded_kib,
    })
}

/// First field of `du -sk` output, e.g. `"100000\t/path"`.
pub fn parse_du_output(output: &str) -> Result<u64, BuildError> {
    let field = output.split_whitespace().next().unwrap_or("");
    field
        .parse()
        .map_err(|_| BuildError::SizingFailure(format!("unexpected du output: {:?}", output.trim())))
}
