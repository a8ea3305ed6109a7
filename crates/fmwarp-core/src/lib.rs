//! Core value types and geometry for field map and warp post-processing.
//!
//! Provides the [`VolumetricImage`] value, affine decomposition into
//! translation/rotation/zoom, and RAS orientation canonicalization.

pub mod error;
pub mod geometry;
pub mod image;
pub mod orientation;
pub mod spatial;

pub use error::{KernelError, Result, WarpError};
pub use geometry::{decompose, AffineComponents, DecompositionConfig};
pub use image::{Intent, VolumetricImage};
pub use orientation::{canonicalize, OrientationTransform};
pub use spatial::{Affine, Axis};
