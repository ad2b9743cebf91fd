//! Optional compression of the released archive.
//!
//! A gzip-compressed archive keeps the canonical, uncompressed-looking
//! filename: the packaging stage expects it there regardless of compression.

use std::fmt;
use std::path::Path;

use crate::error::BuildError;
use crate::process::{Cmd, CommandRunner};

/// Compression applied to the finished archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip { level: u32 },
}

impl Compression {
    /// Parse the manifest's compression type and level.
    ///
    /// The level is only interpreted for gzip, where it must be 1-9.
    pub fn parse(kind: &str, level: &str) -> Result<Self, BuildError> {
        match kind.trim() {
            "none" => Ok(Self::None),
            "gzip" => {
                let level = level
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|l| (1..=9).contains(l))
                    .ok_or_else(|| BuildError::InvalidCompressionLevel(level.to_string()))?;
                Ok(Self::Gzip { level })
            }
            other => Err(BuildError::UnsupportedCompressionType(other.to_string())),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Gzip { level } => write!(f, "gzip (level {})", level),
        }
    }
}

/// Compress `archive` in place.
///
/// For gzip, `compressed` is written next to the archive and then moved
/// over it. A failure between the two steps leaves both files behind.
pub fn compress_archive(
    runner: &dyn CommandRunner,
    compression: &Compression,
    archive: &Path,
    compressed: &Path,
) -> Result<(), BuildError> {
    let level = match compression {
        Compression::None => {
            println!("Skipping compression...");
            return Ok(());
        }
        Compression::Gzip { level } => *level,
    };

    println!("Doing compression...");
    let result = runner.run(
        &Cmd::new("gzip")
            .arg(format!("-{}", level))
            .args(["-k", "-f", "-n"])
            .arg_path(archive),
    )?;
    if !result.success() {
        return Err(BuildError::CompressionFailure {
            status: result.code,
        });
    }

    let result = runner.run(
        &Cmd::new("mv")
            .arg("-f")
            .arg_path(compressed)
            .arg_path(archive),
    )?;
    if !result.success() {
        return Err(BuildError::MoveFailure {
            from: compressed.to_path_buf(),
            to: archive.to_path_buf(),
            status: result.code,
        });
    }
    Ok(())
}
