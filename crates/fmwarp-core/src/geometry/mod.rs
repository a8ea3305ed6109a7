//! Affine geometry helpers.

pub mod decompose;

pub use decompose::{
    decompose, decompose_with, AffineComponents, DecompositionConfig, DEFAULT_SHEAR_TOLERANCE,
};
