//! Error types for the boot-root archive build.
//!
//! Every fatal condition is a [`BuildError`] variant. Configuration problems
//! are detected before anything on disk is touched; everything else names the
//! stage that failed and, when an external tool was involved, its exit status.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal build failures.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unable to read manifest {path}: {reason}")]
    ManifestUnreadable { path: PathBuf, reason: String },

    #[error("bootroot {0} missing from manifest")]
    ConfigMissingValue(&'static str),

    #[error("bootroot padding size is missing from manifest or invalid (got {0:?})")]
    InvalidPaddingValue(Option<String>),

    #[error("invalid gzip compression level {0:?} (expected 1-9)")]
    InvalidCompressionLevel(String),

    #[error("unrecognized bootroot compression type: {0}")]
    UnsupportedCompressionType(String),

    #[error("unsupported bootroot filesystem type: {0}")]
    UnsupportedFilesystemType(String),

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("sizing bootroot failed: {0}")]
    SizingFailure(String),

    #[error("unable to create boot archive: '{command}' returned {status}")]
    TargetCreateFailure { command: String, status: i32 },

    #[error("unable to release boot archive: '{command}' returned {status}")]
    TargetReleaseFailure { command: String, status: i32 },

    #[error("error copying files to bootroot container: cp returned {status}")]
    CopyFailure { status: i32 },

    #[error("bootroot container is missing {0} after copy")]
    CopyIncomplete(PathBuf),

    #[error("error compressing bootroot: gzip returned {status}")]
    CompressionFailure { status: i32 },

    #[error("error moving bootroot from {from} to {to}: mv returned {status}")]
    MoveFailure {
        from: PathBuf,
        to: PathBuf,
        status: i32,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// True for errors caused by the manifest rather than by the host.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BuildError::ManifestUnreadable { .. }
                | BuildError::ConfigMissingValue(_)
                | BuildError::InvalidPaddingValue(_)
                | BuildError::InvalidCompressionLevel(_)
                | BuildError::UnsupportedCompressionType(_)
                | BuildError::UnsupportedFilesystemType(_)
        )
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Non-fatal: the reserved-space policy could not be relaxed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningWarning {
    pub command: String,
    pub status: i32,
}

impl fmt::Display for TuningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Could not tune the bootroot to use all space ('{}' returned {})",
            self.command, self.status
        )
    }
}
