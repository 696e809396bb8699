//! Builds ISO-9660 CD-ROM images from a list of host files.
//!
//! VM build pipelines use a small data CD to hand files to a guest before
//! it has networking: cloud-init seeds, answer files, scripts. This crate
//! turns a manifest of paths and glob patterns into such an image.
//!
//! - **Preflight checks** - Every manifest entry resolves before any work starts
//! - **Build step** - Allocates, formats, populates and finalizes the image
//! - **Artifact builders** - Raw disks, the ISO-9660 filesystem, host copies
//! - **Configuration** - TOML config for the `cdrom-builder` binary
//!
//! # Architecture
//!
//! ```text
//! CdConfig ──prepare()──> preflight::validate_manifest
//!     │
//!     └──manifest()──> StepCreateCd::run
//!                          │
//!                          ├── Disk::create            (sparse raw image)
//!                          ├── Disk::create_filesystem (ISO-9660, label)
//!                          ├── filesystem::add_path    (per entry, fail-fast)
//!                          └── IsoFileSystem::finalize (hadris-iso writer)
//!                                   │
//!                                   └──> BuildState::cd_path
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use cdrom_builder::{BuildState, CdManifest, ConsoleUi, StepAction, StepCreateCd};
//!
//! let manifest = CdManifest::new(vec!["seed/user-data".into(), "seed/meta-data".into()], "cidata");
//! let mut step = StepCreateCd::new(manifest);
//! let mut state = BuildState::default();
//!
//! if step.run(&mut state, &ConsoleUi::new("cdrom")) == StepAction::Continue {
//!     boot_vm_with_cd(state.cd_path.as_deref());
//! }
//! step.cleanup();
//! ```

pub mod artifact;
pub mod build;
pub mod config;
pub mod error;
pub mod preflight;
pub mod ui;

pub use build::state::{BuildState, StepAction};
pub use build::step::{ImageBuilder, StepCreateCd};
pub use build::{CdManifest, DEFAULT_VOLUME_LABEL};
pub use error::{CdError, ErrorKind};
pub use ui::{ConsoleUi, Ui};
