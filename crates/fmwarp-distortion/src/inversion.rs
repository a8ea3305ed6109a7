//! Inversion of displacement maps and fields through a [`WarpKernel`].
//!
//! Inputs are brought to RAS, their geometry is decomposed once, and every
//! frame is handed to the kernel on the rayon pool. Results are reassembled
//! by frame index and returned in the input's original orientation.

use std::ops::Range;

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use fmwarp_core::orientation::{apply, canonicalize};
use fmwarp_core::{decompose, Axis, Intent, KernelError, Result, VolumetricImage, WarpError};
use rayon::prelude::*;

use crate::field::{
    fixed_dims, require_components, require_nonempty, DisplacementField, COMPONENTS,
};
use crate::kernel::WarpKernel;

/// Invert a displacement map along `axis`.
///
/// A 3D map is a single frame; a 4D map carries frames on its last axis.
/// Any other rank is a shape error. A failure in any frame fails the call.
pub fn invert_displacement_map<B, K, const D: usize>(
    map: &VolumetricImage<B, D>,
    axis: Axis,
    kernel: &K,
    verbose: bool,
) -> Result<VolumetricImage<B, D>>
where
    B: Backend,
    K: WarpKernel<B> + ?Sized,
{
    if D != 3 && D != 4 {
        return Err(WarpError::shape(format!(
            "displacement map must have rank 3 or 4, got shape {:?}",
            map.shape()
        )));
    }
    require_nonempty(&map.shape())?;
    let (ras, inverse) = canonicalize(map)?;
    let geometry = decompose(ras.affine())?;
    let shape = ras.shape();
    let [i, j, k] = ras.spatial_shape();
    let device = ras.data().device();

    let frames = split_frames(ras.data(), 3, [i, j, k]);
    tracing::info!(
        "inverting displacement map along {} ({} frame(s))",
        axis,
        frames.len()
    );
    let inverted = run_frames(frames, verbose, |frame| {
        kernel
            .invert_displacement_map(Tensor::from_data(frame, &device), &geometry, axis, verbose)
            .map(Tensor::into_data)
    })?;
    let data = merge_frames::<B, 3, 4, D>(inverted, [i, j, k], [i, j, k, 1], shape, &device)?;

    apply(&ras.with_data(data), &inverse)
}

/// Invert a displacement field.
///
/// A rank-4 field is a single frame; a rank-5 field carries frames on its
/// fourth axis. The result keeps the input's rank and carries the vector
/// intent.
pub fn invert_displacement_field<B, K>(
    field: &DisplacementField<B>,
    kernel: &K,
    verbose: bool,
) -> Result<DisplacementField<B>>
where
    B: Backend,
    K: WarpKernel<B> + ?Sized,
{
    match field {
        DisplacementField::Rank4(image) => {
            Ok(DisplacementField::Rank4(invert_field_frames(image, kernel, verbose)?))
        }
        DisplacementField::Rank5(image) => {
            Ok(DisplacementField::Rank5(invert_field_frames(image, kernel, verbose)?))
        }
    }
}

fn invert_field_frames<B, K, const D: usize>(
    image: &VolumetricImage<B, D>,
    kernel: &K,
    verbose: bool,
) -> Result<VolumetricImage<B, D>>
where
    B: Backend,
    K: WarpKernel<B> + ?Sized,
{
    require_nonempty(&image.shape())?;
    require_components(&image.shape())?;
    let (ras, inverse) = canonicalize(image)?;
    let shape = ras.shape();
    let geometry = decompose(ras.affine())?;
    let [i, j, k] = ras.spatial_shape();
    let device = ras.data().device();

    // rank 4 has no frame axis; index 3 there is the component axis
    let frame_axis = if D == 5 { 3 } else { D };
    let frames = split_frames(ras.data(), frame_axis, [i, j, k, COMPONENTS]);
    tracing::info!("inverting displacement field ({} frame(s))", frames.len());
    let inverted = run_frames(frames, verbose, |frame| {
        kernel
            .invert_displacement_field(Tensor::from_data(frame, &device), &geometry, verbose)
            .map(Tensor::into_data)
    })?;
    let data = merge_frames::<B, 4, 5, D>(
        inverted,
        [i, j, k, COMPONENTS],
        [i, j, k, 1, COMPONENTS],
        shape,
        &device,
    )?;

    Ok(apply(&ras.with_data(data), &inverse)?.with_intent(Intent::Vector))
}

/// Cut `data` into frames along `frame_axis`, each reshaped to `frame_shape`.
///
/// A `frame_axis` past the last axis yields the whole tensor as one frame.
fn split_frames<B: Backend, const D: usize, const F: usize>(
    data: &Tensor<B, D>,
    frame_axis: usize,
    frame_shape: [usize; F],
) -> Vec<TensorData> {
    let dims = data.dims();
    let count = dims.get(frame_axis).copied().unwrap_or(1);
    (0..count)
        .map(|frame| {
            let ranges: [Range<usize>; D] = std::array::from_fn(|axis| {
                if axis == frame_axis {
                    frame..frame + 1
                } else {
                    0..dims[axis]
                }
            });
            data.clone().slice(ranges).reshape(frame_shape).into_data()
        })
        .collect()
}

/// Run `invert` on every frame in parallel, keeping input order.
fn run_frames<F>(frames: Vec<TensorData>, verbose: bool, invert: F) -> Result<Vec<TensorData>>
where
    F: Fn(TensorData) -> std::result::Result<TensorData, KernelError> + Send + Sync,
{
    let total = frames.len();
    let inverted = frames
        .into_par_iter()
        .enumerate()
        .map(|(index, frame)| {
            if verbose {
                tracing::debug!("inverting frame {}/{}", index + 1, total);
            }
            invert(frame)
        })
        .collect::<std::result::Result<Vec<_>, KernelError>>()?;
    Ok(inverted)
}

/// Stack kernel outputs along axis 3 and reshape to `target`.
fn merge_frames<B: Backend, const F: usize, const S: usize, const D: usize>(
    frames: Vec<TensorData>,
    frame_shape: [usize; F],
    slot_shape: [usize; S],
    target: [usize; D],
    device: &B::Device,
) -> Result<Tensor<B, D>> {
    let slots = frames
        .into_iter()
        .map(|frame| {
            let dims: [usize; F] = fixed_dims(&frame.shape).map_err(|_| {
                KernelError::new(format!("kernel returned rank {}", frame.shape.len()))
            })?;
            if dims != frame_shape {
                return Err(WarpError::from(KernelError::new(format!(
                    "kernel returned shape {dims:?}, expected {frame_shape:?}"
                ))));
            }
            Ok(Tensor::<B, F>::from_data(frame, device).reshape(slot_shape))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Tensor::cat(slots, 3).reshape(target))
}
