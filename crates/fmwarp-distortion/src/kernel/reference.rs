//! Pure-Rust reference kernel.
//!
//! Inversion is a fixed-point iteration in voxel space,
//! `v(y) = -d(y + v(y))`, with edge-clamped trilinear sampling of the forward
//! displacement `d`. Resampling pulls each reference voxel through the
//! displacement field and samples the input trilinearly, with zero outside
//! the input grid.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use fmwarp_core::spatial::{Direction3, Vector3};
use fmwarp_core::{AffineComponents, Axis, KernelError};
use serde::{Deserialize, Serialize};

use super::sampling::{Boundary, Grid};
use super::trait_::{ResampleRequest, WarpKernel};

/// Default iteration cap of the inversion.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
/// Default convergence threshold of the inversion, in voxels.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// LPS ↔ RAS sign flip.
fn lps_flip() -> Direction3 {
    Direction3::from_diagonal(&Vector3::new(-1.0, -1.0, 1.0))
}

/// Reference implementation of [`WarpKernel`] on the CPU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceKernel {
    /// Maximum number of fixed-point iterations per inversion.
    pub max_iterations: usize,
    /// Largest per-voxel update (in voxels) accepted as converged.
    pub tolerance: f64,
}

impl Default for ReferenceKernel {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ReferenceKernel {
    /// Create a new kernel with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Invert `[voxels × 3]` LPS displacements on a grid.
    fn invert_vectors(
        &self,
        displacement: &[f64],
        shape: [usize; 3],
        geometry: &AffineComponents,
        verbose: bool,
    ) -> Result<Vec<f64>, KernelError> {
        let grid = Grid::new(displacement, shape, 3)
            .ok_or_else(|| KernelError::new("displacement buffer does not match its shape"))?;
        if displacement.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::new("displacement field contains non-finite values"));
        }

        // physical LPS mm → voxel units on this grid
        let to_voxel = inverse_zoom(geometry)? * geometry.rotation.transpose() * lps_flip();
        let to_physical =
            lps_flip() * geometry.rotation * Direction3::from_diagonal(&geometry.zoom);

        let count = grid.voxel_count();
        let mut forward = vec![0.0; count * 3];
        for voxel in 0..count {
            let u = Vector3::new(grid.at(voxel, 0), grid.at(voxel, 1), grid.at(voxel, 2));
            let d = to_voxel * u;
            forward[voxel * 3..voxel * 3 + 3].copy_from_slice(d.as_slice());
        }
        let forward_grid = Grid::new(&forward, shape, 3)
            .ok_or_else(|| KernelError::new("voxel displacement buffer does not match its shape"))?;

        let mut inverse: Vec<Vector3> = (0..count)
            .map(|voxel| {
                let v = &forward[voxel * 3..voxel * 3 + 3];
                -Vector3::new(v[0], v[1], v[2])
            })
            .collect();

        let mut converged = false;
        for iteration in 0..self.max_iterations {
            let mut largest = 0.0f64;
            for (voxel, v) in inverse.iter_mut().enumerate() {
                let target = forward_grid.index_of(voxel) + *v;
                let next = -Vector3::new(
                    forward_grid.sample(&target, 0, Boundary::Clamp),
                    forward_grid.sample(&target, 1, Boundary::Clamp),
                    forward_grid.sample(&target, 2, Boundary::Clamp),
                );
                largest = largest.max((next - *v).amax());
                *v = next;
            }
            if verbose {
                tracing::debug!(
                    "inversion iteration {}: max update {:.3e} voxels",
                    iteration + 1,
                    largest
                );
            }
            if largest < self.tolerance {
                converged = true;
                break;
            }
        }
        if !converged && self.max_iterations > 0 {
            tracing::warn!(
                "displacement inversion did not converge within {} iterations",
                self.max_iterations
            );
        }

        let mut result = Vec::with_capacity(count * 3);
        for v in &inverse {
            result.extend_from_slice((to_physical * *v).as_slice());
        }
        Ok(result)
    }
}

impl<B: Backend> WarpKernel<B> for ReferenceKernel {
    fn invert_displacement_map(
        &self,
        data: Tensor<B, 3>,
        geometry: &AffineComponents,
        axis: Axis,
        verbose: bool,
    ) -> Result<Tensor<B, 3>, KernelError> {
        let shape = data.dims();
        let device = data.device();
        let values = read_values(data.into_data());

        let component = axis.index();
        let mut vectors = vec![0.0; values.len() * 3];
        for (voxel, value) in values.iter().enumerate() {
            vectors[voxel * 3 + component] = *value;
        }
        let inverted = self.invert_vectors(&vectors, shape, geometry, verbose)?;

        let extracted: Vec<f32> = inverted
            .chunks_exact(3)
            .map(|v| v[component] as f32)
            .collect();
        Ok(Tensor::from_data(TensorData::new(extracted, shape), &device))
    }

    fn invert_displacement_field(
        &self,
        data: Tensor<B, 4>,
        geometry: &AffineComponents,
        verbose: bool,
    ) -> Result<Tensor<B, 4>, KernelError> {
        let [i, j, k, c] = data.dims();
        if c != 3 {
            return Err(KernelError::new(format!(
                "displacement field needs 3 components, got {c}"
            )));
        }
        let device = data.device();
        let values = read_values(data.into_data());

        let inverted = self.invert_vectors(&values, [i, j, k], geometry, verbose)?;
        let inverted: Vec<f32> = inverted.into_iter().map(|v| v as f32).collect();
        Ok(Tensor::from_data(TensorData::new(inverted, [i, j, k, c]), &device))
    }

    fn resample(&self, request: ResampleRequest<B>) -> Result<Tensor<B, 3>, KernelError> {
        let device = request.input.device();
        let input_shape = request.input.dims();
        let [ti, tj, tk, tc] = request.transform.dims();
        if tc != 3 {
            return Err(KernelError::new(format!(
                "transform needs 3 components, got {tc}"
            )));
        }

        let input_values = read_values(request.input.into_data());
        let transform_values = read_values(request.transform.into_data());
        let input = Grid::new(&input_values, input_shape, 1)
            .ok_or_else(|| KernelError::new("input buffer does not match its shape"))?;
        let transform = Grid::new(&transform_values, [ti, tj, tk], 3)
            .ok_or_else(|| KernelError::new("transform buffer does not match its shape"))?;

        let reference_shape = request.reference_shape;
        let count = reference_shape.iter().product::<usize>();
        let flip = lps_flip();
        let mut output = Vec::with_capacity(count);
        for voxel in 0..count {
            let index = voxel_index(voxel, reference_shape);
            let point = request.reference_geometry.index_to_physical(&index);

            let at = request.transform_geometry.physical_to_index(&point);
            let u = Vector3::new(
                transform.sample(&at, 0, Boundary::Zero),
                transform.sample(&at, 1, Boundary::Zero),
                transform.sample(&at, 2, Boundary::Zero),
            );
            let source = point + flip * u;

            let source_index = request.input_geometry.physical_to_index(&source);
            output.push(input.sample(&source_index, 0, Boundary::Zero) as f32);
        }
        Ok(Tensor::from_data(TensorData::new(output, reference_shape), &device))
    }
}

fn read_values(data: TensorData) -> Vec<f64> {
    data.iter::<f32>().map(f64::from).collect()
}

fn voxel_index(voxel: usize, shape: [usize; 3]) -> Vector3 {
    let [_, nj, nk] = shape;
    Vector3::new(
        (voxel / (nj * nk)) as f64,
        ((voxel / nk) % nj) as f64,
        (voxel % nk) as f64,
    )
}

fn inverse_zoom(geometry: &AffineComponents) -> Result<Direction3, KernelError> {
    if geometry.zoom.iter().any(|z| *z == 0.0 || !z.is_finite()) {
        return Err(KernelError::new(format!(
            "grid zoom must be finite and nonzero, got {:?}",
            geometry.zoom.as_slice()
        )));
    }
    Ok(Direction3::from_diagonal(&geometry.zoom.map(|z| 1.0 / z)))
}
