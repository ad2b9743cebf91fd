//! Build configuration.
//!
//! Values come from the build manifest handed over by the pipeline driver,
//! optionally overridden by environment variables (and a `.env` file loaded
//! by the binary). Everything is resolved into [`BuildSettings`] before the
//! build touches the disk.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::compress::Compression;
use crate::error::BuildError;
use crate::target::FilesystemType;

/// Manifest key for the compression level.
pub const BOOT_ROOT_COMPRESSION_LEVEL: &str = "bootroot.compression.level";
/// Manifest key for the compression type (`none` or `gzip`).
pub const BOOT_ROOT_COMPRESSION_TYPE: &str = "bootroot.compression.type";
/// Manifest key for the size padding, in KiB.
pub const BOOT_ROOT_SIZE_PAD: &str = "bootroot.size_pad";
/// Manifest key for the archive filesystem. Optional.
pub const BOOT_ROOT_FS_TYPE: &str = "bootroot.fs_type";

/// Typed lookups into the build manifest.
pub trait ConfigSource {
    /// Look up a value, `None` if absent.
    fn value(&self, key: &str) -> Option<String>;
}

impl ConfigSource for BTreeMap<String, String> {
    fn value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// A JSON build manifest. Keys are dotted paths into the document.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    root: Value,
}

impl ManifestFile {
    pub fn open(path: &Path) -> Result<Self, BuildError> {
        let unreadable = |reason: String| BuildError::ManifestUnreadable {
            path: path.to_path_buf(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let root = serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn from_value(root: Value) -> Self {
        Self {
            path: PathBuf::new(),
            root,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for ManifestFile {
    fn value(&self, key: &str) -> Option<String> {
        let mut node = &self.root;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        match node {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Environment variables take precedence over the wrapped source.
///
/// `bootroot.size_pad` is overridden by `BOOTROOT_SIZE_PAD`, and so on.
pub struct EnvOverrides<S> {
    inner: S,
    vars: HashMap<String, String>,
}

impl<S: ConfigSource> EnvOverrides<S> {
    /// Snapshot the current process environment.
    pub fn new(inner: S) -> Self {
        Self::with_vars(inner, std::env::vars().collect())
    }

    pub fn with_vars(inner: S, vars: HashMap<String, String>) -> Self {
        Self { inner, vars }
    }

    /// Environment variable name for a manifest key.
    pub fn var_name(key: &str) -> String {
        key.to_ascii_uppercase().replace('.', "_")
    }
}

impl<S: ConfigSource> ConfigSource for EnvOverrides<S> {
    fn value(&self, key: &str) -> Option<String> {
        self.vars
            .get(&Self::var_name(key))
            .cloned()
            .or_else(|| self.inner.value(key))
    }
}

/// Fully resolved, validated build parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub compression: Compression,
    pub padding_kib: u64,
    pub fs_type: FilesystemType,
}

impl BuildSettings {
    /// Resolve every value the build needs, or fail before any side effect.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, BuildError> {
        let level = source
            .value(BOOT_ROOT_COMPRESSION_LEVEL)
            .ok_or(BuildError::ConfigMissingValue("compression level"))?;
        let kind = source
            .value(BOOT_ROOT_COMPRESSION_TYPE)
            .ok_or(BuildError::ConfigMissingValue("compression type"))?;
        let padding_kib = parse_padding(source.value(BOOT_ROOT_SIZE_PAD))?;
        let compression = Compression::parse(&kind, &level)?;
        let fs_type = match source.value(BOOT_ROOT_FS_TYPE) {
            Some(name) => FilesystemType::parse(&name)?,
            None => FilesystemType::default(),
        };

        Ok(Self {
            compression,
            padding_kib,
            fs_type,
        })
    }

    /// Print settings for the build log.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Compression: {}", self.compression);
        println!("  Size padding: {} KiB", self.padding_kib);
        println!("  Filesystem: {}", self.fs_type);
    }
}

fn parse_padding(raw: Option<String>) -> Result<u64, BuildError> {
    raw.as_deref()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or(BuildError::InvalidPaddingValue(raw))
}
