//! Decomposition of a 4×4 affine into translation, rotation and zoom.
//!
//! Kernels take geometry as separate origin/rotation/zoom parameters rather
//! than a composed matrix. Shear has no slot in that contract, so it is
//! measured and checked against a tolerance instead of being dropped silently.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WarpError};
use crate::spatial::{linear_part, Affine, Direction3, Point3, Spacing3, Vector3};

/// Default upper bound on the shear an affine may carry.
pub const DEFAULT_SHEAR_TOLERANCE: f64 = 1e-4;

/// Decomposition configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompositionConfig {
    /// Largest absolute shear coefficient accepted before failing.
    pub shear_tolerance: f64,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            shear_tolerance: DEFAULT_SHEAR_TOLERANCE,
        }
    }
}

impl DecompositionConfig {
    /// Create a new decomposition config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shear tolerance.
    pub fn with_shear_tolerance(mut self, tolerance: f64) -> Self {
        self.shear_tolerance = tolerance;
        self
    }

    /// Accept any amount of shear; it is still reported in the components.
    pub fn allow_any_shear(mut self) -> Self {
        self.shear_tolerance = f64::INFINITY;
        self
    }
}

/// Geometry of a voxel grid as separate parameters.
///
/// `point = rotation * (zoom ⊙ index) + translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineComponents {
    /// Physical position of voxel (0, 0, 0).
    pub translation: Point3,
    /// Orthonormal rotation with determinant +1.
    pub rotation: Direction3,
    /// Signed per-axis zoom; a reflection shows up as a negative first zoom.
    pub zoom: Spacing3,
    /// Shear coefficients (xy, xz, yz) left out of the other components.
    pub shear: Vector3,
}

impl AffineComponents {
    /// Recompose the affine from translation, rotation and zoom (shear excluded).
    pub fn to_affine(&self) -> Affine {
        let linear = self.rotation * Direction3::from_diagonal(&self.zoom);
        let mut affine = Affine::identity();
        affine.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        for r in 0..3 {
            affine[(r, 3)] = self.translation[r];
        }
        affine
    }

    /// Map a continuous voxel index to a physical point.
    pub fn index_to_physical(&self, index: &Vector3) -> Point3 {
        self.translation + self.rotation * index.component_mul(&self.zoom)
    }

    /// Map a physical point to a continuous voxel index.
    pub fn physical_to_index(&self, point: &Point3) -> Vector3 {
        let local = self.rotation.transpose() * (point - self.translation);
        local.component_div(&self.zoom)
    }
}

/// Decompose an affine with the default configuration.
pub fn decompose(affine: &Affine) -> Result<AffineComponents> {
    decompose_with(affine, &DecompositionConfig::default())
}

/// Decompose an affine into translation, rotation, zoom and shear.
///
/// The upper-triangular factor `ZS` comes from the Cholesky factorization of
/// `RZSᵀ·RZS`; its diagonal is the zoom and its normalized off-diagonal
/// entries are the shear. A negative determinant is folded into the first
/// zoom so the rotation stays proper.
pub fn decompose_with(affine: &Affine, config: &DecompositionConfig) -> Result<AffineComponents> {
    let translation = Point3::new(affine[(0, 3)], affine[(1, 3)], affine[(2, 3)]);
    let rzs = linear_part(affine);

    let cholesky = (rzs.transpose() * rzs)
        .cholesky()
        .ok_or_else(|| WarpError::arithmetic("affine linear part is singular"))?;
    let mut zs = cholesky.l().transpose();

    let mut zoom = Spacing3::new(zs[(0, 0)], zs[(1, 1)], zs[(2, 2)]);
    if zoom.iter().any(|z| *z <= f64::EPSILON) {
        return Err(WarpError::arithmetic(format!(
            "affine has a degenerate zoom: {:?}",
            zoom.as_slice()
        )));
    }
    let shear = Vector3::new(
        zs[(0, 1)] / zoom[0],
        zs[(0, 2)] / zoom[0],
        zs[(1, 2)] / zoom[1],
    );

    let magnitude = shear.amax();
    if magnitude > config.shear_tolerance {
        return Err(WarpError::ShearExceedsTolerance {
            shear: magnitude,
            tolerance: config.shear_tolerance,
        });
    }
    if magnitude > 0.0 {
        tracing::debug!("discarding affine shear of magnitude {:.3e}", magnitude);
    }

    if rzs.determinant() < 0.0 {
        zoom[0] = -zoom[0];
        for c in 0..3 {
            zs[(0, c)] = -zs[(0, c)];
        }
    }

    let zs_inv = zs
        .try_inverse()
        .ok_or_else(|| WarpError::arithmetic("zoom/shear factor is not invertible"))?;
    let rotation = rzs * zs_inv;

    Ok(AffineComponents {
        translation,
        rotation,
        zoom,
        shear,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::affine_from_rows;

    fn rotation_z(angle: f64) -> Direction3 {
        let (s, c) = angle.sin_cos();
        Direction3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0)
    }

    fn assert_close(a: &Affine, b: &Affine) {
        for r in 0..4 {
            for c in 0..4 {
                assert!(
                    (a[(r, c)] - b[(r, c)]).abs() < 1e-9,
                    "entry ({r}, {c}): {} vs {}",
                    a[(r, c)],
                    b[(r, c)]
                );
            }
        }
    }

    #[test]
    fn test_identity() {
        let parts = decompose(&Affine::identity()).unwrap();
        assert_eq!(parts.translation, Point3::origin());
        assert_eq!(parts.zoom, Spacing3::new(1.0, 1.0, 1.0));
        assert_eq!(parts.rotation, Direction3::identity());
        assert_eq!(parts.shear, Vector3::zeros());
    }

    #[test]
    fn test_rotated_scaled_translated() {
        let components = AffineComponents {
            translation: Point3::new(-90.0, 126.0, -72.0),
            rotation: rotation_z(0.3),
            zoom: Spacing3::new(2.0, 2.5, 3.0),
            shear: Vector3::zeros(),
        };
        let affine = components.to_affine();
        let parts = decompose(&affine).unwrap();

        assert_eq!(parts.translation, components.translation);
        assert!((parts.zoom - components.zoom).amax() < 1e-12);
        assert!((parts.rotation - components.rotation).amax() < 1e-12);
        assert!((parts.rotation.determinant() - 1.0).abs() < 1e-12);
        assert_close(&parts.to_affine(), &affine);
    }

    #[test]
    fn test_reflection_folds_into_first_zoom() {
        let affine = affine_from_rows([
            [-2.0, 0.0, 0.0, 10.0],
            [0.0, 2.0, 0.0, 0.0],
            [0.0, 0.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let parts = decompose(&affine).unwrap();
        assert_eq!(parts.zoom, Spacing3::new(-2.0, 2.0, 2.0));
        assert!((parts.rotation - Direction3::identity()).amax() < 1e-12);
        assert_close(&parts.to_affine(), &affine);
    }

    #[test]
    fn test_shear_rejected() {
        let affine = affine_from_rows([
            [1.0, 0.3, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let err = decompose(&affine).unwrap_err();
        assert!(matches!(err, WarpError::ShearExceedsTolerance { .. }));

        let parts = decompose_with(&affine, &DecompositionConfig::new().allow_any_shear()).unwrap();
        assert!((parts.shear[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_singular_affine() {
        let affine = affine_from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let err = decompose(&affine).unwrap_err();
        assert!(matches!(err, WarpError::Arithmetic(_)));
    }

    #[test]
    fn test_index_physical_roundtrip() {
        let components = AffineComponents {
            translation: Point3::new(5.0, -3.0, 1.0),
            rotation: rotation_z(1.1),
            zoom: Spacing3::new(1.5, 2.0, 2.5),
            shear: Vector3::zeros(),
        };
        let index = Vector3::new(3.0, 4.5, 7.0);
        let point = components.index_to_physical(&index);
        let recovered = components.physical_to_index(&point);
        assert!((recovered - index).amax() < 1e-12);
    }
}
