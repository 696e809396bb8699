//! ISO-9660 filesystem support.
//!
//! - [`IsoFileSystem`] - a writable filesystem handle. Content is staged in
//!   a workspace next to the image and formatted with `hadris-iso` on
//!   [`IsoFileSystem::finalize`].
//! - [`IsoReader`] - a reader for finished images built on `cdfs`, used to
//!   inspect and verify what was written.
//!
//! Images carry a Level 1 primary tree (upper-case 8.3 names) and a Joliet
//! tree with the names exactly as added. There is no El Torito support.
//!
//! # Example
//!
//! ```rust,ignore
//! use cdrom_builder::artifact::disk::{Disk, FilesystemSpec};
//! use cdrom_builder::artifact::iso::{FinalizeOptions, IsoReader};
//! use std::io::Write;
//!
//! let disk = Disk::create(path, 16 * 1024 * 1024)?;
//! let mut fs = disk.create_filesystem(FilesystemSpec::iso9660("cidata"))?;
//! fs.mkdir("openstack/latest")?;
//! fs.create_file("user-data")?.write_all(b"#cloud-config\n")?;
//! fs.finalize(FinalizeOptions::default())?;
//!
//! let image = IsoReader::open(path)?;
//! assert_eq!(image.volume_label(), "cidata");
//! ```

mod reader;
mod writer;

pub use reader::{IsoEntry, IsoReader};
pub use writer::{FinalizeOptions, FinalizedImage, FsState, IsoFileSystem, STAGING_PREFIX};

use std::io;
use thiserror::Error;

/// Maximum length of a single file or directory name, in characters.
///
/// Joliet identifiers hold at most 64 UCS-2 characters.
pub const MAX_NAME_LEN: usize = 64;

/// Maximum directory nesting, counting the root, allowed by ECMA-119.
pub const MAX_DIRECTORY_DEPTH: usize = 8;

/// Maximum volume identifier length.
pub const MAX_LABEL_LEN: usize = 32;

/// Logical block sizes permitted for ISO-9660 images.
///
/// 2048 is the only size every consumer understands and the only one the
/// formatter writes; the larger sizes are legal but rarely supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockSize {
    #[default]
    B2048,
    B4096,
    B8192,
}

impl BlockSize {
    /// Size in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            BlockSize::B2048 => 2048,
            BlockSize::B4096 => 4096,
            BlockSize::B8192 => 8192,
        }
    }

    /// Parse a size in bytes, rejecting anything ISO-9660 does not allow.
    pub fn from_bytes(bytes: u32) -> Option<Self> {
        match bytes {
            2048 => Some(BlockSize::B2048),
            4096 => Some(BlockSize::B4096),
            8192 => Some(BlockSize::B8192),
            _ => None,
        }
    }
}

/// Errors from formatting, populating, finalizing or reading an image.
#[derive(Debug, Error)]
pub enum IsoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid path in image: '{0}'")]
    InvalidPath(String),
    #[error("name '{name}' exceeds {max} characters")]
    NameTooLong { name: String, max: usize },
    #[error("invalid volume label '{0}': must be ASCII and at most 32 bytes")]
    InvalidLabel(String),
    #[error("unsupported partition {0}: raw images hold a single filesystem at partition 0")]
    UnsupportedPartition(u32),
    #[error("unsupported logical block size {0}: only 2048-byte blocks can be formatted")]
    UnsupportedBlockSize(u32),
    #[error("directory '{0}' is nested deeper than 8 levels")]
    TooDeep(String),
    #[error("file '{path}' is {size} bytes; ISO-9660 extents are limited to 4 GiB")]
    FileTooLarge { path: String, size: u64 },
    #[error("image needs {required} bytes but capacity is {capacity} bytes")]
    CapacityExceeded { required: u64, capacity: u64 },
    #[error("formatting ISO-9660 volume: {0}")]
    Format(String),
    #[error("reading ISO-9660 image: {0}")]
    Read(#[from] cdfs::ISOError),
    #[error("reading ISO-9660 volume descriptor: {0}")]
    Descriptor(String),
    #[error("no such entry in image: '{0}'")]
    NotFound(String),
    #[error("not a directory in image: '{0}'")]
    NotADirectory(String),
    #[error("is a directory in image: '{0}'")]
    IsADirectory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_round_trips_legal_values() {
        for size in [BlockSize::B2048, BlockSize::B4096, BlockSize::B8192] {
            assert_eq!(BlockSize::from_bytes(size.bytes()), Some(size));
        }
        assert_eq!(BlockSize::default(), BlockSize::B2048);
    }

    #[test]
    fn test_block_size_rejects_other_values() {
        assert_eq!(BlockSize::from_bytes(512), None);
        assert_eq!(BlockSize::from_bytes(3000), None);
        assert_eq!(BlockSize::from_bytes(16384), None);
    }
}
