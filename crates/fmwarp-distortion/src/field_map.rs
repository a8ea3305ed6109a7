//! Conversion between field maps (Hz) and displacement maps (mm).

use burn::tensor::backend::Backend;
use fmwarp_core::{Result, VolumetricImage, WarpError};

use crate::direction::PhaseEncodingDirection;

/// Field map in Hz to displacement map in mm along the phase-encoding axis.
///
/// `displacement = field × readout × voxel_size × polarity × lps_correction`.
pub fn field_to_displacement<B: Backend, const D: usize>(
    field_map: &VolumetricImage<B, D>,
    total_readout_time: f64,
    direction: PhaseEncodingDirection,
) -> Result<VolumetricImage<B, D>> {
    let scale = displacement_scale(field_map, total_readout_time, direction)?;
    Ok(field_map.with_data(field_map.data().clone().mul_scalar(scale)))
}

/// Displacement map in mm back to a field map in Hz.
///
/// Divides by the same scale [`field_to_displacement`] multiplies by, then
/// negates the result when `flip_sign` is set.
pub fn displacement_to_field<B: Backend, const D: usize>(
    displacement_map: &VolumetricImage<B, D>,
    total_readout_time: f64,
    direction: PhaseEncodingDirection,
    flip_sign: bool,
) -> Result<VolumetricImage<B, D>> {
    let scale = displacement_scale(displacement_map, total_readout_time, direction)?;
    let scale = if flip_sign { -scale } else { scale };
    Ok(displacement_map.with_data(displacement_map.data().clone().div_scalar(scale)))
}

fn displacement_scale<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
    total_readout_time: f64,
    direction: PhaseEncodingDirection,
) -> Result<f64> {
    if total_readout_time == 0.0 || !total_readout_time.is_finite() {
        return Err(WarpError::arithmetic(format!(
            "total readout time must be finite and nonzero, got {total_readout_time}"
        )));
    }
    let axis = direction.axis();
    let voxel_size = image.voxel_size(axis);
    if voxel_size == 0.0 || !voxel_size.is_finite() {
        return Err(WarpError::arithmetic(format!(
            "voxel size along {axis} must be finite and nonzero, got {voxel_size}"
        )));
    }
    Ok(direction.displacement_scale(total_readout_time, voxel_size))
}
