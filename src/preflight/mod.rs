//! Preflight checks for CD file manifests.
//!
//! Validates that every configured source path exists before any disk image
//! work begins. This prevents cryptic errors halfway through a build.
//!
//! Entries containing any of `*`, `?` or `[` are treated as glob patterns
//! and must match at least one path. Everything else is a literal path that
//! must exist (symlinks count, even dangling ones; the builder skips them).
//!
//! # Example
//!
//! ```rust
//! use cdrom_builder::preflight::validate_manifest;
//!
//! let errors = validate_manifest(&["/definitely/not/here", "/also/missing*"]);
//! assert_eq!(errors.len(), 2);
//! for err in &errors {
//!     eprintln!("{}", err);
//! }
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

const GLOB_METACHARACTERS: [char; 3] = ['*', '?', '['];

/// A manifest entry that does not resolve to anything on disk.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("bad CD disk file '{entry}': invalid glob pattern: {source}")]
    BadPattern {
        entry: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("bad CD disk file '{entry}': pattern matched no files")]
    NoMatches { entry: String },
    #[error("bad CD disk file '{entry}': {source}")]
    Unreadable {
        entry: String,
        #[source]
        source: glob::GlobError,
    },
    #[error("bad CD disk file '{entry}': {source}")]
    Missing {
        entry: String,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    /// The manifest entry this error is about.
    pub fn entry(&self) -> &str {
        match self {
            ManifestError::BadPattern { entry, .. }
            | ManifestError::NoMatches { entry }
            | ManifestError::Unreadable { entry, .. }
            | ManifestError::Missing { entry, .. } => entry,
        }
    }
}

/// Whether `entry` is a glob pattern rather than a literal path.
pub fn is_glob(entry: &str) -> bool {
    entry.contains(GLOB_METACHARACTERS)
}

/// Check every entry, returning one error per entry that fails to resolve.
///
/// An empty result means the manifest is valid. Errors are collected rather
/// than returned on the first failure so every broken path is reported at
/// once.
pub fn validate_manifest<S: AsRef<str>>(entries: &[S]) -> Vec<ManifestError> {
    entries
        .iter()
        .filter_map(|entry| resolve_entry(entry.as_ref()).err())
        .collect()
}

/// Resolve entries to concrete paths, in manifest order.
///
/// Glob entries expand to their matches in sorted order. Stops at the first
/// entry that does not resolve.
pub fn expand_manifest<S: AsRef<str>>(entries: &[S]) -> Result<Vec<PathBuf>, ManifestError> {
    let mut paths = Vec::with_capacity(entries.len());
    for entry in entries {
        paths.extend(resolve_entry(entry.as_ref())?);
    }
    Ok(paths)
}

fn resolve_entry(entry: &str) -> Result<Vec<PathBuf>, ManifestError> {
    if !is_glob(entry) {
        fs::symlink_metadata(entry).map_err(|source| ManifestError::Missing {
            entry: entry.to_string(),
            source,
        })?;
        return Ok(vec![PathBuf::from(entry)]);
    }

    let matches = glob::glob(entry)
        .map_err(|source| ManifestError::BadPattern {
            entry: entry.to_string(),
            source,
        })?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ManifestError::Unreadable {
            entry: entry.to_string(),
            source,
        })?;

    if matches.is_empty() {
        return Err(ManifestError::NoMatches {
            entry: entry.to_string(),
        });
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(temp: &TempDir, rel: &str) -> String {
        temp.path().join(rel).to_string_lossy().into_owned()
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("configs/*.yaml"));
        assert!(is_glob("file?.txt"));
        assert!(is_glob("[ab].txt"));
        assert!(!is_glob("plain/path.txt"));
    }

    #[test]
    fn test_valid_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "a").unwrap();
        fs::create_dir(temp.path().join("dir")).unwrap();

        let entries = [entry(&temp, "a.txt"), entry(&temp, "dir"), entry(&temp, "*.txt")];
        assert!(validate_manifest(&entries).is_empty());
    }

    #[test]
    fn test_reports_every_bad_entry() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("good.txt"), "ok").unwrap();

        let missing = entry(&temp, "missing.txt");
        let bad_pattern = entry(&temp, "[unclosed");
        let entries = [missing.clone(), entry(&temp, "good.txt"), bad_pattern.clone()];

        let errors = validate_manifest(&entries);
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ManifestError::Missing { .. }));
        assert_eq!(errors[0].entry(), missing);
        assert!(matches!(errors[1], ManifestError::BadPattern { .. }));
        assert_eq!(errors[1].entry(), bad_pattern);
        assert!(errors[0].to_string().contains("missing.txt"));
    }

    #[test]
    fn test_zero_match_glob_is_an_error() {
        let temp = TempDir::new().unwrap();

        let errors = validate_manifest(&[entry(&temp, "*.nothing")]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ManifestError::NoMatches { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_counts_as_present() {
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink("nowhere", temp.path().join("link")).unwrap();

        assert!(validate_manifest(&[entry(&temp, "link")]).is_empty());
    }

    #[test]
    fn test_expand_manifest_keeps_order() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("z.cfg"), "").unwrap();
        fs::write(temp.path().join("b.yaml"), "").unwrap();
        fs::write(temp.path().join("a.yaml"), "").unwrap();

        let paths = expand_manifest(&[entry(&temp, "z.cfg"), entry(&temp, "*.yaml")]).unwrap();
        assert_eq!(
            paths,
            vec![
                temp.path().join("z.cfg"),
                temp.path().join("a.yaml"),
                temp.path().join("b.yaml"),
            ]
        );
    }

    #[test]
    fn test_expand_manifest_stops_at_first_failure() {
        let temp = TempDir::new().unwrap();
        let err = expand_manifest(&[entry(&temp, "gone"), entry(&temp, "also-gone")]).unwrap_err();
        assert_eq!(err.entry(), entry(&temp, "gone"));
    }
}
