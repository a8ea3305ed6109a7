//! Trilinear sampling of row-major voxel grids.

use fmwarp_core::spatial::Vector3;

/// Distance (in voxels) past the outer voxel centres still treated as on the grid.
const EDGE_TOLERANCE: f64 = 1e-6;

/// What a sample outside the grid evaluates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    /// Coordinates are clamped to the nearest edge voxel.
    Clamp,
    /// Corners outside the grid contribute zero.
    Zero,
}

/// Borrowed view of `[i, j, k, channels]` samples.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grid<'a> {
    values: &'a [f64],
    shape: [usize; 3],
    channels: usize,
}

impl<'a> Grid<'a> {
    pub(crate) fn new(values: &'a [f64], shape: [usize; 3], channels: usize) -> Option<Self> {
        let expected = shape.iter().product::<usize>() * channels;
        (values.len() == expected).then_some(Self {
            values,
            shape,
            channels,
        })
    }

    pub(crate) fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Value at an integer voxel.
    pub(crate) fn at(&self, voxel: usize, channel: usize) -> f64 {
        self.values[voxel * self.channels + channel]
    }

    /// Continuous index of a flat voxel number.
    pub(crate) fn index_of(&self, voxel: usize) -> Vector3 {
        let [_, nj, nk] = self.shape;
        let k = voxel % nk;
        let j = (voxel / nk) % nj;
        let i = voxel / (nj * nk);
        Vector3::new(i as f64, j as f64, k as f64)
    }

    /// Trilinear interpolation of one channel at a continuous index.
    pub(crate) fn sample(&self, index: &Vector3, channel: usize, boundary: Boundary) -> f64 {
        let mut lower = [0isize; 3];
        let mut weight = [0.0f64; 3];
        for axis in 0..3 {
            let extent = self.shape[axis];
            if extent == 0 {
                return 0.0;
            }
            let mut x = index[axis];
            if !x.is_finite() {
                return 0.0;
            }
            let last = (extent - 1) as f64;
            if boundary == Boundary::Clamp
                || (x > -EDGE_TOLERANCE && x < 0.0)
                || (x > last && x < last + EDGE_TOLERANCE)
            {
                x = x.clamp(0.0, last);
            }
            let floor = x.floor();
            lower[axis] = floor as isize;
            weight[axis] = x - floor;
        }

        let mut total = 0.0;
        for corner in 0..8 {
            let mut coefficient = 1.0;
            let mut offset = 0usize;
            let mut inside = true;
            for axis in 0..3 {
                let upper = (corner >> (2 - axis)) & 1 == 1;
                let w = if upper { weight[axis] } else { 1.0 - weight[axis] };
                if w == 0.0 {
                    coefficient = 0.0;
                    break;
                }
                let mut position = lower[axis] + isize::from(upper);
                let extent = self.shape[axis] as isize;
                if boundary == Boundary::Clamp {
                    position = position.clamp(0, extent - 1);
                } else if position < 0 || position >= extent {
                    inside = false;
                }
                coefficient *= w;
                offset = offset * self.shape[axis] + position.max(0) as usize;
            }
            if coefficient != 0.0 && inside {
                total += coefficient * self.at(offset, channel);
            }
        }
        total
    }
}
