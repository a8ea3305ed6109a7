//! Volumetric image value with an affine and an intent tag.
//!
//! Unlike a registration image, the sample array here is laid out the way
//! scanner files store it: the first three axes are the voxel axes `i, j, k`
//! (row-major, `i` slowest), followed by optional time and vector-component
//! axes.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpError};
use crate::spatial::{column_norms, Affine, Axis};

/// What the samples of an image represent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// One value per voxel (field maps, displacement maps, magnitudes).
    #[default]
    Scalar,
    /// A 3-vector per voxel on the trailing axis (displacement fields).
    Vector,
}

/// Volumetric image with physical metadata.
///
/// Every operation in this workspace consumes images by reference and
/// returns new values; nothing is mutated in place.
///
/// # Type Parameters
/// * `B` - The backend for tensor storage
/// * `D` - The array rank (3 for volumes, 4 for time series or fields, 5 for
///   singleton-padded fields)
#[derive(Debug, Clone)]
pub struct VolumetricImage<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    affine: Affine,
    voxel_sizes: Vec<f64>,
    intent: Intent,
}

impl<B: Backend, const D: usize> VolumetricImage<B, D> {
    /// Create a scalar image whose voxel sizes are derived from the affine.
    ///
    /// Spatial voxel sizes are the affine column norms; any axis past the
    /// third gets a size of 1.
    ///
    /// # Examples
    /// ```rust
    /// use fmwarp_core::image::VolumetricImage;
    /// use fmwarp_core::spatial::Affine;
    /// use burn::tensor::Tensor;
    /// use burn_ndarray::NdArray;
    ///
    /// type Backend = NdArray<f32>;
    ///
    /// let device = Default::default();
    /// let data = Tensor::<Backend, 3>::zeros([4, 5, 6], &device);
    /// let image = VolumetricImage::new(data, Affine::identity());
    /// assert_eq!(image.shape(), [4, 5, 6]);
    /// assert_eq!(image.voxel_sizes(), &[1.0, 1.0, 1.0]);
    /// ```
    pub fn new(data: Tensor<B, D>, affine: Affine) -> Self {
        let norms = column_norms(&affine);
        let voxel_sizes = (0..D)
            .map(|i| if i < 3 { norms[i] } else { 1.0 })
            .collect();
        Self {
            data,
            affine,
            voxel_sizes,
            intent: Intent::Scalar,
        }
    }

    /// Replace the voxel sizes, e.g. with the header zooms of a loaded file.
    pub fn with_voxel_sizes(mut self, voxel_sizes: Vec<f64>) -> Result<Self> {
        if voxel_sizes.len() != D {
            return Err(WarpError::shape(format!(
                "expected {D} voxel sizes, got {}",
                voxel_sizes.len()
            )));
        }
        self.voxel_sizes = voxel_sizes;
        Ok(self)
    }

    /// Tag the image with an intent.
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }

    pub(crate) fn from_parts(
        data: Tensor<B, D>,
        affine: Affine,
        voxel_sizes: Vec<f64>,
        intent: Intent,
    ) -> Self {
        Self {
            data,
            affine,
            voxel_sizes,
            intent,
        }
    }

    /// Get the sample tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Consume the image and return its sample tensor.
    pub fn into_data(self) -> Tensor<B, D> {
        self.data
    }

    /// Get the voxel-to-physical affine.
    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// Get the per-axis voxel sizes (one entry per array axis).
    pub fn voxel_sizes(&self) -> &[f64] {
        &self.voxel_sizes
    }

    /// Voxel size along a spatial axis.
    pub fn voxel_size(&self, axis: Axis) -> f64 {
        self.voxel_sizes.get(axis.index()).copied().unwrap_or(1.0)
    }

    /// Get the intent tag.
    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Get the array shape.
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Shape of the three voxel axes; missing axes count as 1.
    pub fn spatial_shape(&self) -> [usize; 3] {
        let dims = self.data.dims();
        let mut shape = [1; 3];
        for (i, extent) in shape.iter_mut().enumerate().take(D.min(3)) {
            *extent = dims[i];
        }
        shape
    }

    /// Build an image of possibly different rank that shares this geometry.
    ///
    /// Voxel sizes are carried over axis by axis; new axes get a size of 1.
    pub fn with_data<const D2: usize>(&self, data: Tensor<B, D2>) -> VolumetricImage<B, D2> {
        let voxel_sizes = (0..D2)
            .map(|i| self.voxel_sizes.get(i).copied().unwrap_or(1.0))
            .collect();
        VolumetricImage {
            data,
            affine: self.affine,
            voxel_sizes,
            intent: self.intent,
        }
    }

    /// Copy the samples out in row-major order.
    pub fn to_values(&self) -> Vec<f32> {
        self.data.to_data().iter::<f32>().collect()
    }
}
