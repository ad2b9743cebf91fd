//! Host tool availability checks.

use crate::compress::Compression;
use crate::target::FilesystemType;

use super::types::CheckResult;

/// Tools every build needs, with the package that provides them.
const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("du", "coreutils"),
    ("truncate", "coreutils"),
    ("cp", "coreutils"),
    ("mv", "coreutils"),
    ("mount", "util-linux"),
    ("umount", "util-linux"),
    ("mountpoint", "util-linux"),
    ("findmnt", "util-linux"),
    ("tune2fs", "e2fsprogs"),
];

/// Check the tools a build with this filesystem and compression will run.
pub fn check_host_tools(fs_type: FilesystemType, compression: &Compression) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = REQUIRED_TOOLS
        .iter()
        .map(|(tool, package)| check_tool_exists(tool, package))
        .collect();

    let mkfs = format!("mkfs.{}", fs_type);
    results.push(check_tool_exists(&mkfs, "e2fsprogs"));

    if compression.is_none() {
        results.push(CheckResult::skip("gzip", "compression disabled"));
    } else {
        results.push(check_tool_exists("gzip", "gzip"));
    }

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.to_string_lossy()),
        Err(_) => CheckResult::fail(
            tool,
            &format!("Not found. Install the '{}' package.", package),
        ),
    }
}
