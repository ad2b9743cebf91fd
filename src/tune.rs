//! Reserved-space tuning of a freshly created archive filesystem.
//!
//! Keeping the usual 5% reserved for root buys nothing on a ramdisk, so the
//! reservation is dropped to zero. Best effort: failures come back as a
//! [`TuningWarning`] and the build carries on.

use std::path::Path;

use crate::error::TuningWarning;
use crate::process::{Cmd, CommandRunner};

/// Set the reserved block percentage of the filesystem mounted at
/// `mount_point` to zero.
pub fn release_reserved_space(
    runner: &dyn CommandRunner,
    mount_point: &Path,
) -> Result<(), TuningWarning> {
    let device = mounted_device(runner, mount_point)?;
    run_tuning_step(runner, Cmd::new("tune2fs").args(["-m", "0"]).arg(&device)).map(|_| ())
}

fn mounted_device(
    runner: &dyn CommandRunner,
    mount_point: &Path,
) -> Result<String, TuningWarning> {
    let stdout = run_tuning_step(
        runner,
        Cmd::new("findmnt")
            .args(["-n", "-o", "SOURCE", "--target"])
            .arg_path(mount_point),
    )?;
    let device = stdout.trim();
    if device.is_empty() {
        return Err(TuningWarning {
            command: format!("findmnt --target {}", mount_point.display()),
            status: 0,
        });
    }
    Ok(device.to_string())
}

fn run_tuning_step(runner: &dyn CommandRunner, cmd: Cmd) -> Result<String, TuningWarning> {
    match runner.run(&cmd) {
        Ok(result) if result.success() => Ok(result.stdout),
        Ok(result) => Err(TuningWarning {
            command: cmd.to_string(),
            status: result.code,
        }),
        Err(_) => Err(TuningWarning {
            command: cmd.to_string(),
            status: -1,
        }),
    }
}
