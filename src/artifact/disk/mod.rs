//! Raw disk images.
//!
//! A [`Disk`] is a fixed-capacity image file that a filesystem is then
//! formatted onto. The file is created sparse, so a large capacity costs
//! nothing until data is written.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artifact::iso::{BlockSize, IsoError, IsoFileSystem};

/// What to format onto a [`Disk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilesystemSpec<'a> {
    /// Partition index. Raw images carry no partition table, so only
    /// partition 0 (the whole disk) is valid.
    pub partition: u32,

    /// Volume identifier written to the filesystem.
    pub volume_label: &'a str,
}

impl<'a> FilesystemSpec<'a> {
    /// An ISO-9660 filesystem spanning the whole disk.
    pub fn iso9660(volume_label: &'a str) -> Self {
        Self {
            partition: 0,
            volume_label,
        }
    }
}

/// A raw disk image file.
#[derive(Debug)]
pub struct Disk {
    file: File,
    path: PathBuf,
    size: u64,

    /// Block size the filesystem will be formatted with.
    ///
    /// Default: 2048
    pub logical_block_size: BlockSize,
}

impl Disk {
    /// Create a new raw image of `size` bytes at `path`.
    ///
    /// Fails if `path` already exists.
    pub fn create(path: &Path, size: u64) -> Result<Self, IsoError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        file.set_len(size)?;
        debug!("created raw disk {} ({} bytes)", path.display(), size);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            size,
            logical_block_size: BlockSize::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Capacity in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Format the disk, handing ownership of the image to the filesystem.
    pub fn create_filesystem(self, spec: FilesystemSpec<'_>) -> Result<IsoFileSystem, IsoError> {
        if spec.partition != 0 {
            return Err(IsoError::UnsupportedPartition(spec.partition));
        }
        IsoFileSystem::create(
            self.file,
            self.path,
            self.size,
            self.logical_block_size,
            spec.volume_label,
        )
    }
}
