//! Orientation canonicalization.
//!
//! Kernels expect voxel grids in RAS ordering so that no voxel size is
//! negative. This module works out which physical axis each voxel axis points
//! along, derives the axis permutation and flips that bring an image to RAS
//! (and back), and applies them by relocating samples. Nothing is resampled:
//! every output sample is an input sample at a new array position.

use burn::tensor::backend::Backend;

use crate::error::{Result, WarpError};
use crate::image::VolumetricImage;
use crate::spatial::{linear_part, Affine, Axis};

/// Direction of one voxel axis in physical space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOrientation {
    /// Physical axis the voxel axis is closest to.
    pub axis: Axis,
    /// Whether increasing the index moves against the RAS direction of `axis`.
    pub reversed: bool,
}

/// Per-voxel-axis orientation of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation(pub [AxisOrientation; 3]);

impl Orientation {
    /// The canonical RAS orientation.
    pub const RAS: Orientation = Orientation([
        AxisOrientation { axis: Axis::X, reversed: false },
        AxisOrientation { axis: Axis::Y, reversed: false },
        AxisOrientation { axis: Axis::Z, reversed: false },
    ]);

    /// Three-letter axis codes, e.g. `"LPS"` or `"RAS"`.
    pub fn codes(&self) -> String {
        self.0
            .iter()
            .map(|o| match (o.axis, o.reversed) {
                (Axis::X, false) => 'R',
                (Axis::X, true) => 'L',
                (Axis::Y, false) => 'A',
                (Axis::Y, true) => 'P',
                (Axis::Z, false) => 'S',
                (Axis::Z, true) => 'I',
            })
            .collect()
    }
}

/// Relocation of the three voxel axes: source axis `i` moves to array
/// position `targets[i]`, reversed first if `flips[i]` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationTransform {
    targets: [usize; 3],
    flips: [bool; 3],
    restore_affine: Option<Affine>,
}

impl OrientationTransform {
    /// Transform that leaves an image unchanged.
    pub fn identity() -> Self {
        Self {
            targets: [0, 1, 2],
            flips: [false; 3],
            restore_affine: None,
        }
    }

    /// Whether applying this transform is a no-op.
    pub fn is_identity(&self) -> bool {
        self.targets == [0, 1, 2] && self.flips == [false; 3]
    }

    /// Target array position of each source voxel axis.
    pub fn targets(&self) -> [usize; 3] {
        self.targets
    }

    /// Whether each source voxel axis is reversed.
    pub fn flips(&self) -> [bool; 3] {
        self.flips
    }

    /// The transform that undoes this one.
    pub fn inverse(&self) -> Self {
        let mut targets = [0; 3];
        let mut flips = [false; 3];
        for i in 0..3 {
            targets[self.targets[i]] = i;
            flips[self.targets[i]] = self.flips[i];
        }
        Self {
            targets,
            flips,
            restore_affine: None,
        }
    }
}

/// Orientation of the voxel axes of an affine.
///
/// The direction cosines are replaced by their nearest orthonormal matrix
/// (polar factor from the SVD); voxel axes then claim the physical axis with
/// the largest absolute cosine in turn, each physical axis at most once.
pub fn io_orientation(affine: &Affine) -> Result<Orientation> {
    let mut cosines = linear_part(affine);
    for i in 0..3 {
        let norm = cosines.column(i).norm();
        if norm <= f64::EPSILON {
            return Err(WarpError::arithmetic(format!(
                "voxel axis {i} has zero length in the affine"
            )));
        }
        cosines.column_mut(i).unscale_mut(norm);
    }

    let svd = cosines.svd(true, true);
    let largest = svd.singular_values.max();
    if svd.singular_values.min() <= largest * 3.0 * f64::EPSILON {
        return Err(WarpError::arithmetic(
            "affine direction cosines are linearly dependent",
        ));
    }
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Err(WarpError::arithmetic("SVD of direction cosines failed")),
    };
    let mut polar = u * v_t;

    let mut axes = [AxisOrientation {
        axis: Axis::X,
        reversed: false,
    }; 3];
    for (in_axis, orientation) in axes.iter_mut().enumerate() {
        let column = polar.column(in_axis);
        let out_axis = column.iamax();
        let cosine = column[out_axis];
        if cosine == 0.0 {
            return Err(WarpError::arithmetic(format!(
                "cannot assign a physical axis to voxel axis {in_axis}"
            )));
        }
        *orientation = AxisOrientation {
            axis: Axis::ALL[out_axis],
            reversed: cosine < 0.0,
        };
        polar.row_mut(out_axis).fill(0.0);
    }
    Ok(Orientation(axes))
}

/// Transforms from an image's orientation to RAS and back.
///
/// The inverse transform remembers the image's affine so that a forward then
/// inverse round trip restores it bit for bit.
pub fn to_ras<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
) -> Result<(OrientationTransform, OrientationTransform)> {
    require_spatial_rank::<D>()?;
    let orientation = io_orientation(image.affine())?;

    let mut forward = OrientationTransform::identity();
    for (i, axis) in orientation.0.iter().enumerate() {
        forward.targets[i] = axis.axis.index();
        forward.flips[i] = axis.reversed;
    }
    let mut inverse = forward.inverse();
    inverse.restore_affine = Some(*image.affine());

    if !forward.is_identity() {
        tracing::debug!("reorienting {} image to RAS", orientation.codes());
    }
    Ok((forward, inverse))
}

/// Relocate an image's samples and update its geometry.
///
/// Only the first three array axes move. Time and vector-component axes, and
/// the vector component values themselves, are left as they are.
pub fn apply<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
    transform: &OrientationTransform,
) -> Result<VolumetricImage<B, D>> {
    require_spatial_rank::<D>()?;
    if transform.is_identity() {
        return Ok(image.clone());
    }

    let shape = image.shape();
    let source = image.affine();

    let mut data = image.data().clone();
    for i in 0..3 {
        if transform.flips[i] {
            data = data.flip([i as isize]);
        }
    }
    let mut order = [0isize; D];
    for (k, slot) in order.iter_mut().enumerate() {
        *slot = k as isize;
    }
    for i in 0..3 {
        order[transform.targets[i]] = i as isize;
    }
    let data = data.permute(order);

    let mut affine = Affine::identity();
    for r in 0..3 {
        affine[(r, 3)] = source[(r, 3)];
    }
    for i in 0..3 {
        let sign = if transform.flips[i] { -1.0 } else { 1.0 };
        for r in 0..3 {
            affine[(r, transform.targets[i])] = sign * source[(r, i)];
        }
        if transform.flips[i] {
            let extent = shape[i].saturating_sub(1) as f64;
            for r in 0..3 {
                affine[(r, 3)] += source[(r, i)] * extent;
            }
        }
    }
    if let Some(original) = &transform.restore_affine {
        let scale = original.amax().max(1.0);
        if (affine - original).amax() <= 1e-9 * scale {
            affine = *original;
        }
    }

    let mut voxel_sizes = image.voxel_sizes().to_vec();
    for i in 0..3 {
        voxel_sizes[transform.targets[i]] = image.voxel_sizes()[i];
    }

    Ok(VolumetricImage::from_parts(
        data,
        affine,
        voxel_sizes,
        image.intent(),
    ))
}

/// Bring an image to RAS, returning it with the transform that undoes it.
pub fn canonicalize<B: Backend, const D: usize>(
    image: &VolumetricImage<B, D>,
) -> Result<(VolumetricImage<B, D>, OrientationTransform)> {
    let (forward, inverse) = to_ras(image)?;
    Ok((apply(image, &forward)?, inverse))
}

fn require_spatial_rank<const D: usize>() -> Result<()> {
    if D < 3 {
        return Err(WarpError::shape(format!(
            "orientation needs at least 3 array axes, got {D}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::affine_from_rows;
    use burn::tensor::{Tensor, TensorData};
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn lps_affine() -> Affine {
        affine_from_rows([
            [-2.0, 0.0, 0.0, 30.0],
            [0.0, -3.0, 0.0, 40.0],
            [0.0, 0.0, 4.0, -50.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    fn ramp_image(shape: [usize; 3], affine: Affine) -> VolumetricImage<Backend, 3> {
        let device = Default::default();
        let n = shape.iter().product::<usize>();
        let values: Vec<f32> = (0..n).map(|v| v as f32).collect();
        let data = Tensor::<Backend, 3>::from_data(TensorData::new(values, shape), &device);
        VolumetricImage::new(data, affine)
    }

    fn value_at(image: &VolumetricImage<Backend, 3>, index: [usize; 3]) -> f32 {
        let shape = image.shape();
        let values = image.to_values();
        values[(index[0] * shape[1] + index[1]) * shape[2] + index[2]]
    }

    #[test]
    fn test_io_orientation_codes() {
        assert_eq!(io_orientation(&Affine::identity()).unwrap().codes(), "RAS");
        assert_eq!(io_orientation(&lps_affine()).unwrap().codes(), "LPS");

        // Sagittal acquisition: i runs anterior-posterior, j inferior-superior, k left-right.
        let sagittal = affine_from_rows([
            [0.0, 0.0, -1.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(io_orientation(&sagittal).unwrap().codes(), "PSL");
    }

    #[test]
    fn test_io_orientation_oblique_picks_nearest_axis() {
        let (s, c) = 0.3f64.sin_cos();
        let oblique = affine_from_rows([
            [c, -s, 0.0, 0.0],
            [s, c, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(io_orientation(&oblique).unwrap(), Orientation::RAS);
    }

    #[test]
    fn test_io_orientation_zero_column() {
        let affine = affine_from_rows([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert!(matches!(
            io_orientation(&affine),
            Err(WarpError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_apply_flips_lps() {
        let image = ramp_image([2, 3, 4], lps_affine());
        let (forward, _) = to_ras(&image).unwrap();
        assert_eq!(forward.targets(), [0, 1, 2]);
        assert_eq!(forward.flips(), [true, true, false]);

        let ras = apply(&image, &forward).unwrap();
        assert_eq!(ras.shape(), [2, 3, 4]);
        assert_eq!(value_at(&ras, [0, 0, 0]), value_at(&image, [1, 2, 0]));
        assert_eq!(value_at(&ras, [1, 2, 3]), value_at(&image, [0, 0, 3]));

        let expected = affine_from_rows([
            [2.0, 0.0, 0.0, 28.0],
            [0.0, 3.0, 0.0, 34.0],
            [0.0, 0.0, 4.0, -50.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        assert_eq!(ras.affine(), &expected);
        assert_eq!(io_orientation(ras.affine()).unwrap(), Orientation::RAS);
    }

    #[test]
    fn test_apply_permutes_axes() {
        let affine = affine_from_rows([
            [0.0, 0.0, 1.5, 0.0],
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let image = ramp_image([2, 3, 4], affine);
        let (forward, inverse) = to_ras(&image).unwrap();
        assert_eq!(forward.targets(), [1, 2, 0]);

        let ras = apply(&image, &forward).unwrap();
        assert_eq!(ras.shape(), [4, 2, 3]);
        assert_eq!(ras.voxel_sizes(), &[1.5, 2.0, 3.0]);
        assert_eq!(value_at(&ras, [3, 1, 2]), value_at(&image, [1, 2, 3]));

        let back = apply(&ras, &inverse).unwrap();
        assert_eq!(back.shape(), [2, 3, 4]);
        assert_eq!(back.to_values(), image.to_values());
        assert_eq!(back.affine(), image.affine());
        assert_eq!(back.voxel_sizes(), image.voxel_sizes());
    }

    #[test]
    fn test_trailing_axes_untouched() {
        let device = Default::default();
        let values: Vec<f32> = (0..2 * 2 * 2 * 3).map(|v| v as f32).collect();
        let data = Tensor::<Backend, 4>::from_data(TensorData::new(values, [2, 2, 2, 3]), &device);
        let field = VolumetricImage::new(data, lps_affine());

        let (forward, inverse) = to_ras(&field).unwrap();
        let ras = apply(&field, &forward).unwrap();
        let ras_values = ras.to_values();
        let values = field.to_values();
        // ras[0, 0, 0, c] == field[1, 1, 0, c]: components keep their order and sign.
        for c in 0..3 {
            assert_eq!(ras_values[c], values[((1 * 2 + 1) * 2) * 3 + c]);
        }

        let back = apply(&ras, &inverse).unwrap();
        assert_eq!(back.to_values(), field.to_values());
        assert_eq!(back.affine(), field.affine());
    }

    #[test]
    fn test_identity_is_noop() {
        let image = ramp_image([2, 2, 2], Affine::identity());
        let (forward, inverse) = to_ras(&image).unwrap();
        assert!(forward.is_identity());
        assert!(inverse.is_identity());
        let same = apply(&image, &forward).unwrap();
        assert_eq!(same.to_values(), image.to_values());
        assert_eq!(same.affine(), image.affine());
    }

    #[test]
    fn test_inverse_of_inverse() {
        let transform = OrientationTransform {
            targets: [2, 0, 1],
            flips: [true, false, true],
            restore_affine: None,
        };
        assert_eq!(transform.inverse().inverse(), transform);
    }
}
