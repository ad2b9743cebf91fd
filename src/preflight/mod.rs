//! Preflight checks for the boot-root archive build.
//!
//! Verifies that every host tool the configured build will run is available
//! before anything is removed, created or mounted.

mod host_tools;
pub mod types;

use anyhow::{bail, Result};

use crate::config::BuildSettings;

pub use types::PreflightReport;

/// Run all preflight checks.
pub fn run_preflight(settings: &BuildSettings) -> PreflightReport {
    println!("Checking host tools...");
    PreflightReport {
        checks: host_tools::check_host_tools(settings.fs_type, &settings.compression),
    }
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(settings: &BuildSettings) -> Result<()> {
    let report = run_preflight(settings);

    if !report.all_passed() {
        report.print();
        bail!(
            "Preflight failed: {} missing: {}",
            report.fail_count(),
            report.failures().join(", ")
        );
    }

    Ok(())
}
