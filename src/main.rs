//! bootroot-archive - release the bootroot mount and archive the bootroot
//! area.
//!
//! Invoked by the image construction pipeline with five positional
//! arguments; see `--help`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use bootroot::config::{BuildSettings, EnvOverrides, ManifestFile};
use bootroot::context::BuildContext;
use bootroot::interrupt::Interrupts;
use bootroot::preflight;
use bootroot::process::{CommandRunner, SystemRunner};
use bootroot::target::LoopbackTarget;
use bootroot::{BuildOutcome, Pipeline};

#[derive(Parser)]
#[command(name = "bootroot-archive")]
#[command(about = "Build the bootroot archive from the bootroot build area")]
struct Cli {
    /// Build manifest to read bootroot settings from
    manifest: PathBuf,

    /// Package image area mountpoint (the archive is placed here)
    pkg_image: PathBuf,

    /// Temporary directory for the archive mountpoint
    tmp_dir: PathBuf,

    /// Area where the bootroot was put together
    bootroot_build: PathBuf,

    /// Area where the media is put (not used)
    media_dir: PathBuf,

    /// Don't check for required host tools before building
    #[arg(long)]
    skip_preflight: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();

    let manifest = ManifestFile::open(&cli.manifest)?;
    let config = EnvOverrides::new(manifest);
    let settings = BuildSettings::from_source(&config)?;
    settings.print();

    if !cli.skip_preflight {
        preflight::run_preflight_or_fail(&settings)?;
    }

    let ctx = BuildContext::new(
        &cli.manifest,
        &cli.pkg_image,
        &cli.tmp_dir,
        &cli.bootroot_build,
        &cli.media_dir,
    );

    let interrupts = Interrupts::new();
    interrupts
        .install()
        .context("Failed to install interrupt handler")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let target = Arc::new(LoopbackTarget::new(Arc::clone(&runner)));
    let pipeline = Pipeline::new(runner, target, interrupts);

    match pipeline.run(&ctx, &settings)? {
        BuildOutcome::Finalized { archive, size } => {
            println!("\n=== Bootroot Archive Built ===");
            println!("  Output: {}", archive.display());
            println!("  Size: {} KiB (padded)", size.padded_kib);
        }
        BuildOutcome::Interrupted => {
            println!("Bootroot build interrupted; archive target released.");
        }
    }

    Ok(())
}
