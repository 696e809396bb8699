//! Artifact builders for CD images.
//!
//! This module provides:
//! - [`disk`] - Raw disk image allocation and filesystem formatting
//! - [`iso`] - ISO-9660 writer and reader
//! - [`filesystem`] - Copying host paths into an image, moving finished images
//!
//! # Usage
//!
//! A [`disk::Disk`] is created at a fixed capacity, formatted into an
//! [`iso::IsoFileSystem`], populated with [`filesystem::add_path`] and then
//! finalized. The build step in [`crate::build::step`] strings these together.

pub mod disk;
pub mod filesystem;
pub mod iso;
