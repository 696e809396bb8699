//! Filesystem utilities for CD image building.
//!
//! Copies host files and directory trees into an [`IsoFileSystem`], and moves
//! finished images into place.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;

use crate::artifact::iso::{IsoError, IsoFileSystem};
use crate::error::CdError;

/// Copy a host path into the image root.
///
/// - A regular file is copied to `/<file name>`.
/// - A directory contributes its *contents*: `src/sub/file.txt` lands at
///   `/sub/file.txt`. The directory itself does not appear in the image.
/// - Symbolic links and special files are skipped, at any depth.
///
/// Returns the number of bytes copied.
///
/// # Arguments
///
/// * `fs` - Filesystem to populate
/// * `src` - Host file or directory
///
/// # Example
///
/// ```rust,ignore
/// use cdrom_builder::artifact::filesystem::add_path;
/// use std::path::Path;
///
/// add_path(&mut fs, Path::new("seed/user-data"))?;
/// add_path(&mut fs, Path::new("seed/openstack"))?;
/// ```
pub fn add_path(fs: &mut IsoFileSystem, src: &Path) -> Result<u64, CdError> {
    let add_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: IsoError| CdError::AddPath { path, source }
    };

    let meta = fs::symlink_metadata(src).map_err(|err| add_err(src)(IsoError::Io(err)))?;
    let file_type = meta.file_type();

    if file_type.is_file() {
        let name = src
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| add_err(src)(IsoError::InvalidPath(src.display().to_string())))?;
        return copy_file(fs, src, name).map_err(add_err(src));
    }
    if !file_type.is_dir() {
        debug!("Skipping {}: not a regular file or directory", src.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(src).to_path_buf();
            add_err(path.as_path())(IsoError::Io(io::Error::from(err)))
        })?;
        if entry.depth() == 0 {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            debug!("Skipping {}: not a regular file or directory", path.display());
            continue;
        }

        let rel = image_path(src, path).map_err(add_err(path))?;
        if file_type.is_dir() {
            fs.mkdir(&rel).map_err(add_err(path))?;
        } else {
            copied += copy_file(fs, path, &rel).map_err(add_err(path))?;
        }
    }
    Ok(copied)
}

fn copy_file(fs: &mut IsoFileSystem, src: &Path, dst: &str) -> Result<u64, IsoError> {
    let mut input = File::open(src)?;
    let mut output = fs.create_file(dst)?;
    let written = io::copy(&mut input, &mut output)?;
    debug!("Wrote {} bytes to {}", written, dst);
    Ok(written)
}

/// Image path of `path` relative to the walked directory `base`.
fn image_path(base: &Path, path: &Path) -> Result<String, IsoError> {
    let invalid = || IsoError::InvalidPath(path.display().to_string());
    let rel = path.strip_prefix(base).map_err(|_| invalid())?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(name) => parts.push(name.to_str().ok_or_else(invalid)?),
            _ => return Err(invalid()),
        }
    }
    Ok(parts.join("/"))
}

/// Move a finished CD image from its temp path to `dst`.
///
/// A rename is tried first. When that fails (temp dir on another
/// filesystem), the image is copied into a temp file beside `dst` and
/// persisted over it, so `dst` never holds a partially copied image.
pub fn move_image(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        debug!("Renamed CD image {} to {}", src.display(), dst.display());
        return Ok(());
    }
    copy_image_into_place(src, dst)?;
    fs::remove_file(src).with_context(|| format!("removing temp CD image '{}'", src.display()))
}

fn copy_image_into_place(src: &Path, dst: &Path) -> Result<()> {
    let dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".cdrom-publish")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in '{}'", dir.display()))?;
    let mut input =
        File::open(src).with_context(|| format!("opening CD image '{}'", src.display()))?;
    let copied = io::copy(&mut input, staged.as_file_mut())
        .with_context(|| format!("copying CD image '{}' to '{}'", src.display(), dst.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("syncing CD image copy for '{}'", dst.display()))?;
    staged
        .persist(dst)
        .with_context(|| format!("replacing '{}' with CD image", dst.display()))?;
    debug!("Copied {} byte CD image to {}", copied, dst.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::disk::{Disk, FilesystemSpec};
    use crate::artifact::iso::{FinalizeOptions, IsoReader};
    use tempfile::TempDir;

    fn new_fs(temp: &TempDir) -> IsoFileSystem {
        let disk = Disk::create(&temp.path().join("out.iso"), 8 * 1024 * 1024).unwrap();
        disk.create_filesystem(FilesystemSpec::iso9660("test")).unwrap()
    }

    fn finish(fs: IsoFileSystem) -> IsoReader {
        let image = fs.finalize(FinalizeOptions::default()).unwrap();
        IsoReader::open(&image.path).unwrap()
    }

    fn names(iso: &IsoReader, dir: &str) -> Vec<String> {
        iso.read_dir(dir).unwrap().into_iter().map(|e| e.name).collect()
    }

    #[test]
    fn test_add_file_uses_base_name() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("host/deep");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("meta-data"), "instance-id: a\n").unwrap();

        let mut fs = new_fs(&temp);
        let copied = add_path(&mut fs, &src.join("meta-data")).unwrap();
        assert_eq!(copied, 15);

        let iso = finish(fs);
        assert_eq!(iso.volume_label(), "test");
        assert_eq!(names(&iso, "/"), ["meta-data"]);
        assert_eq!(iso.read_file("/meta-data").unwrap(), b"instance-id: a\n");
    }

    #[test]
    fn test_add_directory_flattens_into_root() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("D");
        fs::create_dir_all(src.join("sub/inner")).unwrap();
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("sub/file.txt"), "sub").unwrap();
        fs::write(src.join("sub/inner/leaf.txt"), "leaf").unwrap();

        let mut fs = new_fs(&temp);
        assert_eq!(add_path(&mut fs, &src).unwrap(), 10);

        let iso = finish(fs);
        assert_eq!(names(&iso, "/"), ["empty", "sub", "top.txt"]);
        assert_eq!(names(&iso, "/sub"), ["file.txt", "inner"]);
        assert_eq!(names(&iso, "/sub/inner"), ["leaf.txt"]);
        assert!(matches!(iso.read_dir("/D"), Err(IsoError::NotFound(_))));
        assert_eq!(iso.read_file("/sub/file.txt").unwrap(), b"sub");
        assert_eq!(iso.read_file("/sub/inner/leaf.txt").unwrap(), b"leaf");
        assert!(iso.read_dir("/empty").unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("D");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("real.txt"), "real").unwrap();
        std::os::unix::fs::symlink("real.txt", src.join("link.txt")).unwrap();
        std::os::unix::fs::symlink("../real.txt", src.join("sub/nested-link")).unwrap();
        std::os::unix::fs::symlink("sub", src.join("dir-link")).unwrap();

        let mut fs = new_fs(&temp);
        add_path(&mut fs, &src).unwrap();
        assert_eq!(add_path(&mut fs, &src.join("link.txt")).unwrap(), 0);

        let iso = finish(fs);
        assert_eq!(names(&iso, "/"), ["real.txt", "sub"]);
        assert!(iso.read_dir("/sub").unwrap().is_empty());
    }

    #[test]
    fn test_later_file_replaces_earlier() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("a")).unwrap();
        fs::create_dir_all(temp.path().join("b")).unwrap();
        fs::write(temp.path().join("a/config"), "first version").unwrap();
        fs::write(temp.path().join("b/config"), "second").unwrap();

        let mut fs = new_fs(&temp);
        add_path(&mut fs, &temp.path().join("a/config")).unwrap();
        add_path(&mut fs, &temp.path().join("b/config")).unwrap();

        let iso = finish(fs);
        assert_eq!(names(&iso, "/"), ["config"]);
        assert_eq!(iso.read_file("config").unwrap(), b"second");
    }

    #[test]
    fn test_error_names_failing_path() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("D");
        fs::create_dir_all(src.join("taken")).unwrap();
        fs::write(temp.path().join("taken"), "file").unwrap();

        let mut fs = new_fs(&temp);
        add_path(&mut fs, &src).unwrap();

        let err = add_path(&mut fs, &temp.path().join("taken")).unwrap_err();
        match err {
            CdError::AddPath { path, source } => {
                assert_eq!(path, temp.path().join("taken"));
                assert!(matches!(source, IsoError::IsADirectory(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        let missing = temp.path().join("missing");
        assert!(matches!(
            add_path(&mut fs, &missing),
            Err(CdError::AddPath { .. })
        ));
    }

    #[test]
    fn test_image_path() {
        let base = Path::new("/src/D");
        assert_eq!(image_path(base, Path::new("/src/D/a/b.txt")).unwrap(), "a/b.txt");
        assert!(image_path(base, Path::new("/elsewhere")).is_err());
    }

    #[test]
    fn test_move_image_keeps_image_readable() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("user-data"), "#cloud-config\n").unwrap();
        let mut fs = new_fs(&temp);
        add_path(&mut fs, &temp.path().join("user-data")).unwrap();
        let built = fs.finalize(FinalizeOptions::default()).unwrap();

        let dst = temp.path().join("seed.iso");
        fs::write(&dst, "stale image").unwrap();
        move_image(&built.path, &dst).unwrap();

        assert!(!built.path.exists());
        let iso = IsoReader::open(&dst).unwrap();
        assert_eq!(iso.read_file("user-data").unwrap(), b"#cloud-config\n");
    }

    #[test]
    fn test_copy_fallback_replaces_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("cdrom123.iso");
        let dst = temp.path().join("out/seed.iso");
        fs::create_dir_all(temp.path().join("out")).unwrap();
        fs::write(&src, "new image").unwrap();
        fs::write(&dst, "old").unwrap();

        copy_image_into_place(&src, &dst).unwrap();

        assert!(src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "new image");
        let leftovers: Vec<_> = fs::read_dir(temp.path().join("out"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, ["seed.iso"]);
    }

    #[test]
    fn test_move_image_missing_source_names_it() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("gone.iso");
        let err = move_image(&src, &temp.path().join("seed.iso")).unwrap_err();
        assert!(format!("{err:#}").contains("gone.iso"));
    }
}
