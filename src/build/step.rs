//! The CD creation build step.
//!
//! [`ImageBuilder`] turns a [`CdManifest`] into a finalized ISO-9660 image
//! at a temporary path. [`StepCreateCd`] wraps a builder for use in a
//! pipeline: it publishes the result into [`BuildState`] and reports
//! failures through the [`Ui`].
//!
//! Callers must always call `cleanup` once the image has been consumed (or
//! the build has failed). Cleanup removes the temporary image.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::build::state::{BuildState, StepAction};
use crate::build::CdManifest;
use crate::error::CdError;
use crate::ui::Ui;

/// Produces a CD image from a manifest.
pub trait ImageBuilder {
    /// Build the image. Returns `Ok(None)` when the manifest is empty.
    fn create_cd(&mut self, manifest: &CdManifest, ui: &dyn Ui) -> Result<Option<PathBuf>, CdError>;

    /// Remove the temporary image, if any. Safe to call repeatedly.
    fn cleanup(&mut self);

    /// Path of the temporary image, once allocated.
    fn cd_path(&self) -> Option<&Path>;
}

impl<B: ImageBuilder + ?Sized> ImageBuilder for Box<B> {
    fn create_cd(&mut self, manifest: &CdManifest, ui: &dyn Ui) -> Result<Option<PathBuf>, CdError> {
        (**self).create_cd(manifest, ui)
    }

    fn cleanup(&mut self) {
        (**self).cleanup()
    }

    fn cd_path(&self) -> Option<&Path> {
        (**self).cd_path()
    }
}

/// Builds ISO-9660 images on the host filesystem.
#[cfg(not(windows))]
#[derive(Debug, Default)]
pub struct IsoImageBuilder {
    cd_path: Option<PathBuf>,
}

#[cfg(not(windows))]
impl IsoImageBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(not(windows))]
impl ImageBuilder for IsoImageBuilder {
    fn create_cd(&mut self, manifest: &CdManifest, ui: &dyn Ui) -> Result<Option<PathBuf>, CdError> {
        use crate::artifact::disk::{Disk, FilesystemSpec};
        use crate::artifact::filesystem::add_path;
        use crate::artifact::iso::{BlockSize, FinalizeOptions};
        use crate::preflight::expand_manifest;

        if manifest.files.is_empty() {
            info!("No CD files specified. CD disk will not be made.");
            return Ok(None);
        }

        if !manifest.label.is_empty() {
            info!("CD label is set to {}", manifest.label);
        }
        let label = manifest.resolved_label();

        ui.say("Creating CD disk...");

        let sources = expand_manifest(&manifest.files)?;

        let path = allocate_temp_path(manifest.temp_dir.as_deref()).map_err(CdError::TempFile)?;
        self.cd_path = Some(path.clone());

        let mut disk = Disk::create(&path, manifest.capacity).map_err(|source| {
            CdError::CreateImage {
                path: path.clone(),
                source,
            }
        })?;
        disk.logical_block_size = BlockSize::B2048;

        let mut fs = disk
            .create_filesystem(FilesystemSpec::iso9660(label))
            .map_err(CdError::CreateFilesystem)?;

        for source in &sources {
            ui.message(&format!("Adding {} to CD", source.display()));
            add_path(&mut fs, source)?;
        }

        let image = fs
            .finalize(FinalizeOptions::default())
            .map_err(CdError::Finalize)?;
        info!(
            "Finalized CD {} ({} blocks, {} bytes)",
            image.path.display(),
            image.blocks,
            image.size
        );

        ui.message("Done copying paths for CD");
        Ok(Some(image.path))
    }

    fn cleanup(&mut self) {
        let Some(path) = self.cd_path.take() else {
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => info!("Removed temporary CD {}", path.display()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!("Failed to remove temporary CD {}: {}", path.display(), err),
        }
    }

    fn cd_path(&self) -> Option<&Path> {
        self.cd_path.as_deref()
    }
}

/// Reserve a unique `cdrom*.iso` path. The placeholder file is removed so
/// the image can be created exclusively at that path.
#[cfg(not(windows))]
fn allocate_temp_path(dir: Option<&Path>) -> io::Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("cdrom").suffix(".iso");
    let placeholder = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    let path = placeholder.path().to_path_buf();
    placeholder.close()?;
    Ok(path)
}

/// Stand-in for platforms where CD creation is not available.
#[derive(Debug, Default)]
pub struct UnsupportedImageBuilder;

impl ImageBuilder for UnsupportedImageBuilder {
    fn create_cd(&mut self, _manifest: &CdManifest, _ui: &dyn Ui) -> Result<Option<PathBuf>, CdError> {
        Err(CdError::UnsupportedPlatform(std::env::consts::OS))
    }

    fn cleanup(&mut self) {}

    fn cd_path(&self) -> Option<&Path> {
        None
    }
}

/// The image builder for the current platform.
pub fn platform_builder() -> Box<dyn ImageBuilder> {
    #[cfg(not(windows))]
    {
        Box::new(IsoImageBuilder::new())
    }
    #[cfg(windows)]
    {
        Box::new(UnsupportedImageBuilder)
    }
}

/// Pipeline step that creates a CD from a manifest.
///
/// # Example
///
/// ```rust,ignore
/// use cdrom_builder::build::step::StepCreateCd;
/// use cdrom_builder::build::state::{BuildState, StepAction};
///
/// let mut step = StepCreateCd::new(manifest);
/// let mut state = BuildState::default();
/// if step.run(&mut state, &ui) == StepAction::Continue {
///     attach_cd(state.cd_path.as_deref());
/// }
/// step.cleanup();
/// ```
pub struct StepCreateCd<B: ImageBuilder = Box<dyn ImageBuilder>> {
    manifest: CdManifest,
    builder: B,
}

impl StepCreateCd {
    /// A step using [`platform_builder`].
    pub fn new(manifest: CdManifest) -> Self {
        Self::with_builder(manifest, platform_builder())
    }
}

impl<B: ImageBuilder> StepCreateCd<B> {
    pub fn with_builder(manifest: CdManifest, builder: B) -> Self {
        Self { manifest, builder }
    }

    pub fn manifest(&self) -> &CdManifest {
        &self.manifest
    }

    /// Build the CD, publishing its path (or the error) into `state`.
    pub fn run(&mut self, state: &mut BuildState, ui: &dyn Ui) -> StepAction {
        match self.builder.create_cd(&self.manifest, ui) {
            Ok(path) => {
                state.cd_path = path;
                StepAction::Continue
            }
            Err(err) => {
                ui.error(&err.to_string());
                state.error = Some(err);
                StepAction::Halt
            }
        }
    }

    /// Remove the temporary image.
    pub fn cleanup(&mut self) {
        self.builder.cleanup();
    }
}
