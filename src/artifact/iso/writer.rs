//! Writable ISO-9660 filesystem handle.
//!
//! ISO-9660 needs to know every directory and file size before it can
//! place anything, so content is staged in a private workspace while the
//! handle is open. [`IsoFileSystem::finalize`] formats the workspace onto
//! the image with `hadris-iso`: a Level 1 primary directory tree plus a
//! Joliet tree carrying the names as they were added.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use hadris_iso::joliet::JolietLevel;
use hadris_iso::read::PathSeparator;
use hadris_iso::rrip::RripOptions;
use hadris_iso::write::options::{BaseIsoLevel, CreationFeatures, IsoFormatOptions};
use hadris_iso::write::{estimator, InputTree, IsoImageWriter};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use super::{BlockSize, IsoError, MAX_DIRECTORY_DEPTH, MAX_LABEL_LEN, MAX_NAME_LEN};

const APPLICATION_ID: &str = "CDROM-BUILDER";

/// Prefix of the staging directory created next to the image.
pub const STAGING_PREFIX: &str = ".cdrom-staging";

/// Lifecycle of an open filesystem.
///
/// Finalizing consumes the [`IsoFileSystem`], so a finalized filesystem
/// cannot be modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsState {
    /// Formatted, nothing added yet.
    Created,
    /// At least one directory or file has been added.
    Populated,
}

/// Options for [`IsoFileSystem::finalize`].
#[derive(Debug, Clone, Default)]
pub struct FinalizeOptions {
    /// Allow directories nested deeper than [`MAX_DIRECTORY_DEPTH`].
    ///
    /// Deep directories are relocated with Rock Ridge `CL`/`RE` records.
    pub deep_directories: bool,
}

/// A sealed image on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedImage {
    pub path: PathBuf,
    /// Image size in bytes.
    pub size: u64,
    /// Volume size in logical blocks.
    pub blocks: u32,
}

/// An ISO-9660 filesystem being built on a raw disk image.
///
/// Created by [`Disk::create_filesystem`](crate::artifact::disk::Disk::create_filesystem).
#[derive(Debug)]
pub struct IsoFileSystem {
    image: File,
    image_path: PathBuf,
    capacity: u64,
    block_size: BlockSize,
    volume_label: String,
    workspace: TempDir,
    state: FsState,
}

impl IsoFileSystem {
    pub(crate) fn create(
        image: File,
        image_path: PathBuf,
        capacity: u64,
        block_size: BlockSize,
        volume_label: &str,
    ) -> Result<Self, IsoError> {
        if volume_label.len() > MAX_LABEL_LEN || !volume_label.is_ascii() {
            return Err(IsoError::InvalidLabel(volume_label.to_string()));
        }
        if block_size != BlockSize::B2048 {
            return Err(IsoError::UnsupportedBlockSize(block_size.bytes()));
        }

        // Staged content lives on the same filesystem as the image.
        let staging_root = match image_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let workspace = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(staging_root)?;
        debug!(
            "staging ISO content for {} in {}",
            image_path.display(),
            workspace.path().display()
        );

        Ok(Self {
            image,
            image_path,
            capacity,
            block_size,
            volume_label: volume_label.to_string(),
            workspace,
            state: FsState::Created,
        })
    }

    pub fn volume_label(&self) -> &str {
        &self.volume_label
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn state(&self) -> FsState {
        self.state
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Directory holding the staged content until [`finalize`](Self::finalize).
    pub fn staging_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Create a directory and any missing parents.
    ///
    /// Paths are `/`-separated and relative to the image root. Creating the
    /// root or an existing directory is a no-op.
    pub fn mkdir(&mut self, path: &str) -> Result<(), IsoError> {
        let staged = self.staged_path(path)?;
        fs::create_dir_all(&staged)?;
        self.state = FsState::Populated;
        Ok(())
    }

    /// Create a file, truncating any previous content at the same path.
    ///
    /// The parent directory must already exist in the image.
    pub fn create_file(&mut self, path: &str) -> Result<File, IsoError> {
        let staged = self.staged_path(path)?;
        if staged == self.workspace.path() || staged.is_dir() {
            return Err(IsoError::IsADirectory(path.to_string()));
        }
        if !staged.parent().is_some_and(Path::is_dir) {
            let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
            return Err(IsoError::NotFound(parent.to_string()));
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staged)?;
        self.state = FsState::Populated;
        Ok(file)
    }

    fn staged_path(&self, path: &str) -> Result<PathBuf, IsoError> {
        let mut staged = self.workspace.path().to_path_buf();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => return Err(IsoError::InvalidPath(path.to_string())),
                name => {
                    validate_name(name, path)?;
                    staged.push(name);
                }
            }
        }
        Ok(staged)
    }

    /// Format the staged content as an ISO-9660 volume on the image.
    ///
    /// The image is truncated to the volume size. Fails without touching
    /// the image if the volume would not fit in the disk's capacity.
    pub fn finalize(self, options: FinalizeOptions) -> Result<FinalizedImage, IsoError> {
        let IsoFileSystem {
            mut image,
            image_path,
            capacity,
            block_size,
            volume_label,
            workspace,
            ..
        } = self;

        check_limits(workspace.path(), options.deep_directories)?;
        let tree = InputTree::from_fs(workspace.path(), PathSeparator::ForwardSlash)
            .map_err(|err| IsoError::Format(err.to_string()))?;
        let format = format_options(&volume_label, block_size, options.deep_directories);

        let required = estimator::estimate_tree(&tree, &format).minimum_bytes();
        if required > capacity {
            return Err(IsoError::CapacityExceeded { required, capacity });
        }
        debug!(
            "finalizing {}: at most {} bytes of {}",
            image_path.display(),
            required,
            capacity
        );

        image.set_len(0)?;
        image.seek(SeekFrom::Start(0))?;
        IsoImageWriter::create(&mut image, tree, format)
            .map_err(|err| IsoError::Format(err.to_string()))?;
        image.sync_all()?;

        let size = image.metadata()?.len();
        if size > capacity {
            return Err(IsoError::CapacityExceeded {
                required: size,
                capacity,
            });
        }

        Ok(FinalizedImage {
            path: image_path,
            size,
            blocks: (size / u64::from(block_size.bytes())) as u32,
        })
    }
}

fn validate_name(name: &str, path: &str) -> Result<(), IsoError> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(IsoError::NameTooLong {
            name: name.to_string(),
            max: MAX_NAME_LEN,
        });
    }
    // ';' separates the file version and NUL is never a valid identifier byte.
    if name.contains([';', '\0']) {
        return Err(IsoError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Reject staged trees the formatter cannot represent, naming the offending path.
fn check_limits(root: &Path, deep_directories: bool) -> Result<(), IsoError> {
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| IsoError::Io(err.into()))?;
        let relative = || {
            entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .display()
                .to_string()
        };

        if entry.file_type().is_dir() {
            // The root is level 1.
            if entry.depth() + 1 > MAX_DIRECTORY_DEPTH && !deep_directories {
                return Err(IsoError::TooDeep(relative()));
            }
        } else {
            let size = entry.metadata().map_err(|err| IsoError::Io(err.into()))?.len();
            if u32::try_from(size).is_err() {
                return Err(IsoError::FileTooLarge {
                    path: relative(),
                    size,
                });
            }
        }
    }
    Ok(())
}

fn format_options(volume_label: &str, block_size: BlockSize, deep_directories: bool) -> IsoFormatOptions {
    let rock_ridge = deep_directories.then(|| RripOptions {
        relocate_deep_dirs: true,
        preserve_symlinks: false,
        preserve_devices: false,
        ..RripOptions::default()
    });

    IsoFormatOptions {
        volume_name: volume_label.to_string(),
        system_id: None,
        volume_set_id: None,
        publisher_id: None,
        preparer_id: None,
        application_id: Some(APPLICATION_ID.to_string()),
        sector_size: block_size.bytes() as usize,
        path_separator: PathSeparator::ForwardSlash,
        features: CreationFeatures {
            filenames: BaseIsoLevel::Level1 {
                supports_lowercase: false,
                supports_rrip: rock_ridge.is_some(),
            },
            long_filenames: false,
            joliet: Some(JolietLevel::Level3),
            rock_ridge,
            el_torito: None,
            hybrid_boot: None,
        },
        strict_charset: false,
    }
}
