//! CD image build step.
//!
//! This module provides:
//! - [`step`] - The image builder and the [`StepCreateCd`](step::StepCreateCd) adapter
//! - [`state`] - Typed build state shared between steps

pub mod state;
pub mod step;

use std::path::PathBuf;

/// Volume label used when none is configured.
pub const DEFAULT_VOLUME_LABEL: &str = "packer";

/// Default raw image capacity: 10 GiB. Images are sparse and truncated to
/// their content on finalize, so this is an upper bound only.
pub const DEFAULT_CAPACITY_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// Everything the image builder needs to produce a CD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdManifest {
    /// Host paths or glob patterns, copied in order.
    pub files: Vec<String>,

    /// Volume label. Empty means [`DEFAULT_VOLUME_LABEL`].
    pub label: String,

    /// Capacity of the raw image in bytes.
    pub capacity: u64,

    /// Directory for the temporary image. `None` uses the system default.
    pub temp_dir: Option<PathBuf>,
}

impl CdManifest {
    pub fn new(files: Vec<String>, label: impl Into<String>) -> Self {
        Self {
            files,
            label: label.into(),
            capacity: DEFAULT_CAPACITY_BYTES,
            temp_dir: None,
        }
    }

    /// The label to write, with the default applied.
    pub fn resolved_label(&self) -> &str {
        if self.label.is_empty() {
            DEFAULT_VOLUME_LABEL
        } else {
            &self.label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_label() {
        assert_eq!(CdManifest::new(vec![], "").resolved_label(), "packer");
        assert_eq!(CdManifest::new(vec![], "cidata").resolved_label(), "cidata");
        assert_eq!(CdManifest::new(vec![], " My Label ").resolved_label(), " My Label ");
    }

    #[test]
    fn test_new_uses_default_capacity() {
        let manifest = CdManifest::new(vec!["a".into()], "x");
        assert_eq!(manifest.capacity, DEFAULT_CAPACITY_BYTES);
        assert!(manifest.temp_dir.is_none());
    }
}
