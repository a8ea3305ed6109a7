//! Image types.
//!
//! This module provides the VolumetricImage value type shared by every
//! conversion and adapter in the workspace.

pub mod image;

pub use image::{Intent, VolumetricImage};
