//! Resampling a volume through a displacement field via a [`WarpKernel`].

use burn::tensor::backend::Backend;
use fmwarp_core::orientation::{apply, canonicalize};
use fmwarp_core::{decompose, KernelError, Result, VolumetricImage, WarpError};

use crate::field::{require_components, require_nonempty, DisplacementField};
use crate::kernel::{ResampleRequest, WarpKernel};

/// Resample `input` onto the grid of `reference` through `transform`.
///
/// All three images are brought to RAS independently and their affines
/// decomposed before the kernel runs. A rank-5 transform must have a
/// singleton fourth axis. The result has the reference's shape and original
/// orientation.
pub fn resample<B, K>(
    reference: &VolumetricImage<B, 3>,
    input: &VolumetricImage<B, 3>,
    transform: &DisplacementField<B>,
    kernel: &K,
) -> Result<VolumetricImage<B, 3>>
where
    B: Backend,
    K: WarpKernel<B> + ?Sized,
{
    let squeezed = transform.squeezed()?;
    require_nonempty(&reference.shape())?;
    require_nonempty(&input.shape())?;
    require_nonempty(&squeezed.shape())?;
    require_components(&squeezed.shape())?;

    let (reference_ras, reference_inverse) = canonicalize(reference)?;
    let (input_ras, _) = canonicalize(input)?;
    let (transform_ras, _) = canonicalize(&squeezed)?;

    let request = ResampleRequest {
        input: input_ras.data().clone(),
        input_geometry: decompose(input_ras.affine())?,
        reference_shape: reference_ras.shape(),
        reference_geometry: decompose(reference_ras.affine())?,
        transform: transform_ras.data().clone(),
        transform_geometry: decompose(transform_ras.affine())?,
    };
    tracing::info!(
        "resampling {:?} input onto {:?} reference grid",
        input_ras.shape(),
        request.reference_shape
    );

    let output = kernel.resample(request)?;
    let expected = reference_ras.shape();
    if output.dims() != expected {
        return Err(WarpError::from(KernelError::new(format!(
            "kernel returned shape {:?}, expected {expected:?}",
            output.dims()
        ))));
    }
    apply(&reference_ras.with_data(output), &reference_inverse)
}
