//! Errors raised while building a CD image.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::artifact::iso::IsoError;
use crate::preflight::ManifestError;

/// Which phase of the build failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A manifest entry did not resolve.
    Validation,
    /// The image file could not be allocated or formatted.
    Allocation,
    /// A source path could not be copied into the image.
    Population,
    /// The image could not be written out.
    Finalize,
    /// CD creation is not available on this platform.
    UnsupportedPlatform,
}

#[derive(Debug, Error)]
pub enum CdError {
    #[error("error creating temporary file for CD: {0}")]
    TempFile(#[source] io::Error),

    #[error("error creating CD: {}: {source}", .path.display())]
    CreateImage {
        path: PathBuf,
        #[source]
        source: IsoError,
    },

    #[error("error creating filesystem on CD: {0}")]
    CreateFilesystem(#[source] IsoError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("error adding {} to CD: {source}", .path.display())]
    AddPath {
        path: PathBuf,
        #[source]
        source: IsoError,
    },

    #[error("error finalizing CD: {0}")]
    Finalize(#[source] IsoError),

    #[error("creating CD disks is not supported on {0}")]
    UnsupportedPlatform(&'static str),
}

impl CdError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CdError::Manifest(_) => ErrorKind::Validation,
            CdError::TempFile(_) | CdError::CreateImage { .. } | CdError::CreateFilesystem(_) => {
                ErrorKind::Allocation
            }
            CdError::AddPath { .. } => ErrorKind::Population,
            CdError::Finalize(_) => ErrorKind::Finalize,
            CdError::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = CdError::AddPath {
            path: PathBuf::from("/src/user-data"),
            source: IsoError::NotFound("user-data".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Population);
        assert!(err.to_string().starts_with("error adding /src/user-data to CD: "));

        let err = CdError::UnsupportedPlatform("windows");
        assert_eq!(err.kind(), ErrorKind::UnsupportedPlatform);
        assert_eq!(err.to_string(), "creating CD disks is not supported on windows");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnsupportedPlatform).unwrap();
        assert_eq!(json, "\"unsupported_platform\"");
    }
}
