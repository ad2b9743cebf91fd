//! The boot-root archive build, start to finish.
//!
//! Stages run strictly in order:
//! 1. Resolve configuration (nothing touched on failure)
//! 2. Remove stale archives from a previous run
//! 3. Size the staging area and add padding
//! 4. Create and mount the archive target (interruptible)
//! 5. Relax reserved space (best effort)
//! 6. Copy and verify the staging tree
//! 7. Release the target
//! 8. Compress, if configured
//! 9. Set final permissions
//!
//! Once the target exists, every failure path releases it before the error
//! is returned.

use std::path::PathBuf;
use std::sync::Arc;

use crate::artifact;
use crate::compress;
use crate::config::{BuildSettings, ConfigSource};
use crate::context::BuildContext;
use crate::copy;
use crate::error::BuildError;
use crate::interrupt::Interrupts;
use crate::process::CommandRunner;
use crate::size::{self, ArchiveSize};
use crate::target::{TargetService, TargetSpec};
use crate::timing::Timer;
use crate::tune;

/// How a build ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The archive is at its canonical path and ready for packaging.
    Finalized { archive: PathBuf, size: ArchiveSize },
    /// Target creation was interrupted and the target released.
    Interrupted,
}

pub struct Pipeline {
    runner: Arc<dyn CommandRunner>,
    target: Arc<dyn TargetService>,
    interrupts: Interrupts,
}

impl Pipeline {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        target: Arc<dyn TargetService>,
        interrupts: Interrupts,
    ) -> Self {
        Self {
            runner,
            target,
            interrupts,
        }
    }

    /// Resolve settings from `config`, then build.
    pub fn build(
        &self,
        ctx: &BuildContext,
        config: &dyn ConfigSource,
    ) -> Result<BuildOutcome, BuildError> {
        let settings = BuildSettings::from_source(config)?;
        self.run(ctx, &settings)
    }

    /// Build with already validated settings.
    pub fn run(
        &self,
        ctx: &BuildContext,
        settings: &BuildSettings,
    ) -> Result<BuildOutcome, BuildError> {
        artifact::remove_stale(&ctx.archive, &ctx.compressed_archive())?;

        println!("Sizing bootroot requirements...");
        let size = size::estimate(self.runner.as_ref(), &ctx.staging, settings.padding_kib)?;
        println!("    Raw uncompressed: {} MB.", size.raw_kib / 1024);
        println!(
            "Creating bootroot archive with padded size of {} MB...",
            size.padded_kib / 1024
        );

        let spec = ctx.target_spec(settings.fs_type, size.padded_kib);
        self.create_target(&spec)?;
        if self.interrupts.was_interrupted() {
            return Ok(BuildOutcome::Interrupted);
        }

        let populated = self.populate(ctx, &spec);
        let released = self.target.release(&spec);
        // A copy failure takes precedence over a release failure.
        populated?;
        released?;

        let timer = Timer::start("Compress archive");
        compress::compress_archive(
            self.runner.as_ref(),
            &settings.compression,
            &ctx.archive,
            &ctx.compressed_archive(),
        )?;
        timer.finish();

        artifact::finalize(&ctx.archive)?;
        println!("Bootroot archive: {}", ctx.archive.display());

        Ok(BuildOutcome::Finalized {
            archive: ctx.archive.clone(),
            size,
        })
    }

    /// Create the target with interrupt cleanup armed for the duration of
    /// the call. A failed create is released before the error is returned.
    fn create_target(&self, spec: &TargetSpec) -> Result<(), BuildError> {
        let timer = Timer::start("Create archive target");
        let created = {
            let target = Arc::clone(&self.target);
            let cleanup_spec = spec.clone();
            let _guard = self.interrupts.arm(move || {
                if let Err(e) = target.release(&cleanup_spec) {
                    eprintln!("Warning: cleanup after interrupt failed: {}", e);
                }
            });
            // Dropping the guard waits for a cleanup an interrupt started.
            self.target.create(spec)
        };

        // An interrupt already released the target. A create error caused by
        // the interrupt is not a build failure.
        if self.interrupts.was_interrupted() {
            return Ok(());
        }
        if let Err(e) = created {
            if let Err(release_err) = self.target.release(spec) {
                eprintln!("Warning: {}", release_err);
            }
            return Err(e);
        }
        timer.finish();
        Ok(())
    }

    /// Everything done while the target is mounted.
    fn populate(&self, ctx: &BuildContext, spec: &TargetSpec) -> Result<(), BuildError> {
        if let Err(warning) = tune::release_reserved_space(self.runner.as_ref(), &spec.mount_point)
        {
            eprintln!("Warning: {}", warning);
        }

        println!("Copying bootroot contents...");
        let timer = Timer::start("Copy staging area");
        copy::copy_tree(self.runner.as_ref(), &ctx.staging, &spec.mount_point)?;
        let entries = copy::verify_copy(&ctx.staging, &spec.mount_point)?;
        println!("    {} entries copied.", entries);
        timer.finish();
        Ok(())
    }
}
