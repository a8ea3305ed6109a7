//! Spatial types for points, vectors, spacing, direction matrices and axes.
//!
//! All matrix types are nalgebra aliases; the voxel-to-physical affine is a
//! plain homogeneous `Matrix4<f64>`.

pub mod axis;

use nalgebra::{Matrix4, Point3 as NaPoint3, SMatrix, SVector};

pub use axis::Axis;

pub type Point3 = NaPoint3<f64>;
pub type Vector3 = SVector<f64, 3>;
pub type Spacing3 = SVector<f64, 3>;
pub type Direction3 = SMatrix<f64, 3, 3>;

/// Homogeneous voxel-to-physical transform.
pub type Affine = Matrix4<f64>;

/// Build an affine from row-major entries, the way NIfTI srow fields are laid out.
pub fn affine_from_rows(rows: [[f64; 4]; 4]) -> Affine {
    Affine::from_fn(|r, c| rows[r][c])
}

/// Linear (rotation, zoom and shear) part of an affine.
pub fn linear_part(affine: &Affine) -> Direction3 {
    affine.fixed_view::<3, 3>(0, 0).into_owned()
}

/// Voxel size of each spatial axis: the norm of the corresponding affine column.
pub fn column_norms(affine: &Affine) -> Spacing3 {
    let linear = linear_part(affine);
    Spacing3::new(
        linear.column(0).norm(),
        linear.column(1).norm(),
        linear.column(2).norm(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_from_rows() {
        let affine = affine_from_rows([
            [2.0, 0.0, 0.0, -10.0],
            [0.0, 3.0, 0.0, 20.0],
            [0.0, 0.0, 4.0, 30.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(affine[(0, 3)], -10.0);
        assert_eq!(affine[(1, 1)], 3.0);
        assert_eq!(column_norms(&affine), Spacing3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn test_column_norms_ignore_sign() {
        let affine = affine_from_rows([
            [-2.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.5, 0.0],
            [0.0, -3.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(column_norms(&affine), Spacing3::new(2.0, 3.0, 1.5));
    }
}
