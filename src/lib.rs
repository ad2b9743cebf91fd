//! Boot-root archive builder.
//!
//! Builds the compressed ramdisk image loaded early at boot: a loop-mounted
//! filesystem sized from the staging area, populated with its contents,
//! released, optionally gzip-compressed and published at a fixed path inside
//! the package image for the packaging stage.

pub mod artifact;
pub mod compress;
pub mod config;
pub mod context;
pub mod copy;
pub mod error;
pub mod interrupt;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod size;
pub mod target;
pub mod timing;
pub mod tune;

pub use error::BuildError;
pub use pipeline::{BuildOutcome, Pipeline};
