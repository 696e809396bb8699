//! Typed state carried between build steps.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::{CdError, ErrorKind};

/// Name under which the finished image path is published.
pub const CD_PATH_KEY: &str = "cd_path";

/// Name under which a step failure is published.
pub const ERROR_KEY: &str = "error";

/// Whether the pipeline should run the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Continue,
    Halt,
}

#[derive(Debug, Default)]
pub struct BuildState {
    /// Path of the finalized CD image, once created.
    pub cd_path: Option<PathBuf>,

    /// The error that halted the build.
    pub error: Option<CdError>,
}

/// Serializable view of a [`BuildState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    pub cd_path: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub error: Option<String>,
}

impl BuildState {
    pub fn summary(&self) -> BuildSummary {
        BuildSummary {
            cd_path: self
                .cd_path
                .as_ref()
                .map(|path| path.display().to_string()),
            error_kind: self.error.as_ref().map(CdError::kind),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json_keys() {
        let state = BuildState {
            cd_path: Some(PathBuf::from("/tmp/cdrom123.iso")),
            error: None,
        };
        let json = serde_json::to_value(state.summary()).unwrap();
        assert_eq!(json[CD_PATH_KEY], "/tmp/cdrom123.iso");
        assert!(json[ERROR_KEY].is_null());

        let state = BuildState {
            cd_path: None,
            error: Some(CdError::UnsupportedPlatform("windows")),
        };
        let json = serde_json::to_value(state.summary()).unwrap();
        assert!(json[CD_PATH_KEY].is_null());
        assert_eq!(json["error_kind"], "unsupported_platform");
        assert_eq!(json[ERROR_KEY], "creating CD disks is not supported on windows");
    }
}
