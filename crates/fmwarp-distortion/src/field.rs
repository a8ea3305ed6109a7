//! Displacement fields in the two admissible array ranks.
//!
//! itk and fsl store a field as `[i, j, k, 3]`; ants and afni insert a
//! singleton axis and store `[i, j, k, 1, 3]`. Time series of fields use that
//! fourth axis for frames.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use fmwarp_core::{Affine, Intent, Result, VolumetricImage, WarpError};

/// Number of vector components of a displacement field.
pub const COMPONENTS: usize = 3;

/// Displacement field of rank 4 or rank 5.
#[derive(Debug, Clone)]
pub enum DisplacementField<B: Backend> {
    /// `[i, j, k, 3]`
    Rank4(VolumetricImage<B, 4>),
    /// `[i, j, k, t, 3]`, with `t == 1` for a single singleton-padded field.
    Rank5(VolumetricImage<B, 5>),
}

impl<B: Backend> DisplacementField<B> {
    /// Wrap an image of any rank; only ranks 4 and 5 are accepted.
    pub fn from_image<const D: usize>(image: VolumetricImage<B, D>) -> Result<Self> {
        let shape = image.shape();
        require_nonempty(&shape)?;
        match D {
            4 => Ok(Self::Rank4(reshape_image(
                &image,
                fixed_dims(&shape)?,
                image.voxel_sizes().to_vec(),
            )?)),
            5 => Ok(Self::Rank5(reshape_image(
                &image,
                fixed_dims(&shape)?,
                image.voxel_sizes().to_vec(),
            )?)),
            _ => Err(WarpError::shape(format!(
                "displacement field must have rank 4 or 5, got rank {D} with shape {shape:?}"
            ))),
        }
    }

    /// Array rank (4 or 5).
    pub fn rank(&self) -> usize {
        match self {
            Self::Rank4(_) => 4,
            Self::Rank5(_) => 5,
        }
    }

    /// Array shape.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Rank4(image) => image.shape().to_vec(),
            Self::Rank5(image) => image.shape().to_vec(),
        }
    }

    pub fn affine(&self) -> &Affine {
        match self {
            Self::Rank4(image) => image.affine(),
            Self::Rank5(image) => image.affine(),
        }
    }

    pub fn voxel_sizes(&self) -> &[f64] {
        match self {
            Self::Rank4(image) => image.voxel_sizes(),
            Self::Rank5(image) => image.voxel_sizes(),
        }
    }

    pub fn intent(&self) -> Intent {
        match self {
            Self::Rank4(image) => image.intent(),
            Self::Rank5(image) => image.intent(),
        }
    }

    /// Copy the samples out in row-major order.
    pub fn to_values(&self) -> Vec<f32> {
        match self {
            Self::Rank4(image) => image.to_values(),
            Self::Rank5(image) => image.to_values(),
        }
    }

    pub fn as_rank4(&self) -> Option<&VolumetricImage<B, 4>> {
        match self {
            Self::Rank4(image) => Some(image),
            Self::Rank5(_) => None,
        }
    }

    pub fn as_rank5(&self) -> Option<&VolumetricImage<B, 5>> {
        match self {
            Self::Rank4(_) => None,
            Self::Rank5(image) => Some(image),
        }
    }

    /// Collapse to `[i, j, k, 3]`.
    ///
    /// A rank-5 field must have a singleton fourth axis; the trailing axis is
    /// not checked here.
    pub fn squeezed(&self) -> Result<VolumetricImage<B, 4>> {
        match self {
            Self::Rank4(image) => Ok(image.clone()),
            Self::Rank5(image) => {
                let [i, j, k, t, c] = image.shape();
                if t != 1 {
                    return Err(WarpError::shape(format!(
                        "cannot squeeze field of shape {:?}: fourth axis has {t} entries",
                        image.shape()
                    )));
                }
                let sizes = image.voxel_sizes();
                reshape_image(
                    image,
                    [i, j, k, c],
                    vec![sizes[0], sizes[1], sizes[2], sizes[4]],
                )
            }
        }
    }
}

/// Insert a singleton fourth axis: `[i, j, k, 3]` → `[i, j, k, 1, 3]`.
pub(crate) fn pad_singleton<B: Backend>(
    image: &VolumetricImage<B, 4>,
) -> Result<VolumetricImage<B, 5>> {
    let [i, j, k, c] = image.shape();
    let sizes = image.voxel_sizes();
    reshape_image(
        image,
        [i, j, k, 1, c],
        vec![sizes[0], sizes[1], sizes[2], 1.0, sizes[3]],
    )
}

/// Require the trailing axis of a field to hold three components.
pub(crate) fn require_components(shape: &[usize]) -> Result<()> {
    match shape.last() {
        Some(&COMPONENTS) => Ok(()),
        _ => Err(WarpError::shape(format!(
            "last axis of a displacement field must have size {COMPONENTS}, got shape {shape:?}"
        ))),
    }
}

/// Reject arrays with a zero-length axis.
pub(crate) fn require_nonempty(shape: &[usize]) -> Result<()> {
    if shape.contains(&0) {
        return Err(WarpError::shape(format!(
            "array has a zero-length axis: shape {shape:?}"
        )));
    }
    Ok(())
}

/// Multiply each vector component (trailing axis) by its own factor.
pub(crate) fn scale_components<B: Backend, const D: usize>(
    data: Tensor<B, D>,
    factors: [f32; COMPONENTS],
) -> Tensor<B, D> {
    if factors.iter().all(|f| *f == 1.0) {
        return data;
    }
    let dims = data.dims();
    let parts = factors
        .iter()
        .enumerate()
        .map(|(c, factor)| {
            let ranges: [std::ops::Range<usize>; D] = std::array::from_fn(|axis| {
                if axis == D - 1 {
                    c..c + 1
                } else {
                    0..dims[axis]
                }
            });
            data.clone().slice(ranges).mul_scalar(*factor)
        })
        .collect();
    Tensor::cat(parts, D - 1)
}

pub(crate) fn reshape_image<B: Backend, const D: usize, const D2: usize>(
    image: &VolumetricImage<B, D>,
    dims: [usize; D2],
    voxel_sizes: Vec<f64>,
) -> Result<VolumetricImage<B, D2>> {
    image
        .with_data(image.data().clone().reshape(dims))
        .with_voxel_sizes(voxel_sizes)
}

pub(crate) fn fixed_dims<const N: usize>(dims: &[usize]) -> Result<[usize; N]> {
    dims.try_into()
        .map_err(|_| WarpError::shape(format!("expected {N} axes, got shape {dims:?}")))
}
