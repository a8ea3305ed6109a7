//! Field map and displacement conversions for distortion correction.
//!
//! This crate converts between field maps (Hz), displacement maps (mm along
//! the phase-encoding axis) and 3-component displacement fields, translates
//! fields between the itk, fsl, ants and afni conventions, and adapts
//! inversion and resampling to a [`kernel::WarpKernel`].

pub mod convention;
pub mod direction;
pub mod embed;
pub mod field;
pub mod field_map;
pub mod inversion;
pub mod kernel;
pub mod metadata;
pub mod phase;
pub mod resample;

pub use convention::{convert, WarpConvention};
pub use direction::{DirectionCode, PhaseEncodingDirection, Polarity};
pub use embed::{displacement_map_to_field, embed};
pub use field::DisplacementField;
pub use field_map::{displacement_to_field, field_to_displacement};
pub use inversion::{invert_displacement_field, invert_displacement_map};
pub use kernel::{ReferenceKernel, ResampleRequest, WarpKernel};
pub use metadata::{AcquisitionMetadata, EchoSeries};
pub use phase::{normalize, rescale_phase, trim_frames};
pub use resample::resample;
