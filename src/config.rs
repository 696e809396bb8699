//! TOML configuration for CD creation.
//!
//! ```toml
//! cd_files = ["seed/user-data", "seed/meta-data", "extra/*.cfg"]
//! cd_label = "cidata"
//! cd_capacity = 67108864
//! ```
//!
//! Relative entries are resolved against the directory holding the config
//! file, so a config can be run from anywhere.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::build::{CdManifest, DEFAULT_CAPACITY_BYTES};
use crate::preflight::{is_glob, validate_manifest, ManifestError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CdConfig {
    /// Files, directories or glob patterns to place on the CD.
    #[serde(default)]
    pub cd_files: Vec<String>,

    /// Volume label. Empty means the default label.
    #[serde(default)]
    pub cd_label: String,

    /// Raw image capacity in bytes.
    #[serde(default)]
    pub cd_capacity: Option<u64>,
}

impl CdConfig {
    /// Load and parse a config file, resolving relative entries.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading CD config '{}'", path.display()))?;
        let mut config: CdConfig = toml::from_str(&raw)
            .with_context(|| format!("parsing CD config '{}'", path.display()))?;

        if config.cd_capacity == Some(0) {
            bail!(
                "invalid CD config '{}': cd_capacity must be greater than zero",
                path.display()
            );
        }

        let base = path.parent().unwrap_or(Path::new(""));
        config.cd_files = config
            .cd_files
            .iter()
            .map(|entry| resolve_entry(base, entry))
            .collect();
        Ok(config)
    }

    /// Validate every entry. An empty result means the config is usable.
    pub fn prepare(&self) -> Vec<ManifestError> {
        validate_manifest(&self.cd_files)
    }

    pub fn manifest(&self) -> CdManifest {
        let mut manifest = CdManifest::new(self.cd_files.clone(), self.cd_label.clone());
        manifest.capacity = self.cd_capacity.unwrap_or(DEFAULT_CAPACITY_BYTES);
        manifest
    }
}

fn resolve_entry(base: &Path, entry: &str) -> String {
    if base.as_os_str().is_empty() || Path::new(entry).is_absolute() {
        return entry.to_string();
    }
    let base = base.to_string_lossy();
    if is_glob(entry) {
        // The base directory is literal even if it contains metacharacters.
        format!("{}/{}", glob::Pattern::escape(&base), entry)
    } else {
        format!("{}/{}", base, entry)
    }
}
