//! Preparation of magnitude and phase inputs: noise-frame trimming and
//! intensity rescaling.

use std::f64::consts::PI;

use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;
use fmwarp_core::{Result, VolumetricImage, WarpError};

use crate::field::require_nonempty;

/// Raw value scanners store for phase `-π`.
pub const DEFAULT_PHASE_MIN: f64 = -4096.0;
/// Raw value scanners store for phase `+π`.
pub const DEFAULT_PHASE_MAX: f64 = 4096.0;

/// Scale values linearly onto `[0, 1]`.
pub fn normalize<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
) -> Result<VolumetricImage<B, D>> {
    require_nonempty(&image.shape())?;
    let data = image.data().clone();
    let min = data.clone().min().into_scalar().elem::<f64>();
    let max = data.clone().max().into_scalar().elem::<f64>();
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return Err(WarpError::arithmetic(format!(
            "cannot normalize values spanning [{min}, {max}]"
        )));
    }
    Ok(image.with_data(data.sub_scalar(min).div_scalar(range)))
}

/// Map raw phase values from `[min, max]` onto `[-π, π]`.
///
/// Pass [`DEFAULT_PHASE_MIN`] and [`DEFAULT_PHASE_MAX`] for the usual 12-bit
/// scanner range.
pub fn rescale_phase<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
    min: f64,
    max: f64,
) -> Result<VolumetricImage<B, D>> {
    let range = max - min;
    if range == 0.0 || !range.is_finite() {
        return Err(WarpError::arithmetic(format!(
            "phase range [{min}, {max}] is empty"
        )));
    }
    let data = image
        .data()
        .clone()
        .sub_scalar(min)
        .mul_scalar(2.0 * PI / range)
        .sub_scalar(PI);
    Ok(image.with_data(data))
}

/// Drop the last `noise_frames` frames of a `[i, j, k, t]` run.
///
/// Trimming every frame is a shape error.
pub fn trim_frames<B: Backend>(
    image: &VolumetricImage<B, 4>,
    noise_frames: usize,
) -> Result<VolumetricImage<B, 4>> {
    require_nonempty(&image.shape())?;
    if noise_frames == 0 {
        return Ok(image.clone());
    }
    let [i, j, k, t] = image.shape();
    if noise_frames >= t {
        return Err(WarpError::shape(format!(
            "cannot drop {noise_frames} noise frame(s) from a run of {t}"
        )));
    }
    tracing::info!("removing {} noise frame(s) from the end of the run", noise_frames);
    let kept = image.data().clone().slice([0..i, 0..j, 0..k, 0..t - noise_frames]);
    Ok(image.with_data(kept))
}
