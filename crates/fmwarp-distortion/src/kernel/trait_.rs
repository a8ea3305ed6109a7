//! Kernel trait for the geometric operations on displacement data.
//!
//! Callers always hand kernels RAS-canonical arrays together with the
//! decomposed geometry of their grid. Displacement vectors are in itk (LPS)
//! convention, in millimetres.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use fmwarp_core::{AffineComponents, Axis, KernelError};

/// Everything a kernel needs to resample one volume through a displacement field.
#[derive(Debug, Clone)]
pub struct ResampleRequest<B: Backend> {
    /// Volume to be resampled `[i, j, k]`.
    pub input: Tensor<B, 3>,
    pub input_geometry: AffineComponents,
    /// Shape of the output grid.
    pub reference_shape: [usize; 3],
    pub reference_geometry: AffineComponents,
    /// Displacement field `[i, j, k, 3]`.
    pub transform: Tensor<B, 4>,
    pub transform_geometry: AffineComponents,
}

/// Native geometric kernel.
///
/// # Type Parameters
/// * `B` - The backend the tensors live on
pub trait WarpKernel<B: Backend>: Send + Sync {
    /// Invert a scalar displacement map that displaces along `axis`.
    fn invert_displacement_map(
        &self,
        data: Tensor<B, 3>,
        geometry: &AffineComponents,
        axis: Axis,
        verbose: bool,
    ) -> Result<Tensor<B, 3>, KernelError>;

    /// Invert a displacement field `[i, j, k, 3]`.
    fn invert_displacement_field(
        &self,
        data: Tensor<B, 4>,
        geometry: &AffineComponents,
        verbose: bool,
    ) -> Result<Tensor<B, 4>, KernelError>;

    /// Resample `request.input` onto the reference grid.
    ///
    /// The returned tensor has shape `request.reference_shape`.
    fn resample(&self, request: ResampleRequest<B>) -> Result<Tensor<B, 3>, KernelError>;
}
