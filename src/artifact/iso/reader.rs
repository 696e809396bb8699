//! Read access to finished images.
//!
//! Directory trees and file content come from `cdfs`, which prefers the
//! Joliet tree when one is present. `cdfs` does not expose the primary
//! volume identifier, so the label is read with `hadris-iso`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cdfs::{DirectoryEntry, ISO9660};

use super::IsoError;

/// One directory entry as seen by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsoEntry {
    pub name: String,
    pub is_dir: bool,
    /// File size in bytes; zero for directories.
    pub size: u64,
}

/// A finished ISO-9660 image opened for reading.
pub struct IsoReader {
    iso: ISO9660<File>,
    volume_label: String,
}

impl IsoReader {
    pub fn open(path: &Path) -> Result<Self, IsoError> {
        let file = File::open(path)?;
        let volume_label = read_volume_label(file.try_clone()?)?;
        let iso = ISO9660::new(file)?;
        Ok(Self { iso, volume_label })
    }

    pub fn volume_label(&self) -> &str {
        &self.volume_label
    }

    /// List a directory, sorted by name. `.` and `..` are omitted.
    pub fn read_dir(&self, path: &str) -> Result<Vec<IsoEntry>, IsoError> {
        let dir = match self.iso.open(path)? {
            Some(DirectoryEntry::Directory(dir)) => dir,
            Some(_) => return Err(IsoError::NotADirectory(path.to_string())),
            None => return Err(IsoError::NotFound(path.to_string())),
        };

        let mut entries = Vec::new();
        for entry in dir.contents() {
            match entry? {
                DirectoryEntry::Directory(sub) => {
                    let name = sub.identifier.clone();
                    if name == "." || name == ".." {
                        continue;
                    }
                    entries.push(IsoEntry {
                        name,
                        is_dir: true,
                        size: 0,
                    });
                }
                DirectoryEntry::File(file) => entries.push(IsoEntry {
                    name: file.identifier.clone(),
                    is_dir: false,
                    size: u64::from(file.size()),
                }),
                DirectoryEntry::Symlink(_) => {}
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Read a whole file.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, IsoError> {
        match self.iso.open(path)? {
            Some(DirectoryEntry::File(file)) => {
                let mut data = Vec::with_capacity(file.size() as usize);
                file.read().read_to_end(&mut data)?;
                Ok(data)
            }
            Some(DirectoryEntry::Directory(_)) => Err(IsoError::IsADirectory(path.to_string())),
            Some(DirectoryEntry::Symlink(_)) | None => Err(IsoError::NotFound(path.to_string())),
        }
    }
}

fn read_volume_label(file: File) -> Result<String, IsoError> {
    let image = hadris_iso::read::IsoImage::open(file)
        .map_err(|err| IsoError::Descriptor(err.to_string()))?;
    let pvd = image
        .read_pvd()
        .map_err(|err| IsoError::Descriptor(err.to_string()))?;
    let label = pvd
        .volume_identifier
        .try_to_str()
        .map_err(|err| IsoError::Descriptor(err.to_string()))?;
    Ok(label.trim_end().to_string())
}
