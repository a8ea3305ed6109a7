//! Embedding scalar displacement maps into vector displacement fields.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use fmwarp_core::{Axis, Intent, Result, VolumetricImage, WarpError};

use crate::convention::{convert, WarpConvention};
use crate::field::{fixed_dims, require_nonempty, DisplacementField, COMPONENTS};

/// Place a displacement map in the `axis` component of a vector field.
///
/// A 3D map `[i, j, k]` becomes `[i, j, k, 3]`; a 4D map of frames
/// `[i, j, k, t]` becomes `[i, j, k, t, 3]`. Other components are zero. The
/// field is in itk convention.
pub fn embed<B: Backend, const D: usize>(
    map: &VolumetricImage<B, D>,
    axis: Axis,
) -> Result<DisplacementField<B>> {
    let shape = map.shape();
    require_nonempty(&shape)?;
    let field = match D {
        3 => {
            let dims: [usize; 3] = fixed_dims(&shape)?;
            let column = map.data().clone().reshape([dims[0], dims[1], dims[2], 1]);
            DisplacementField::Rank4(
                map.with_data(stack_component(column, axis))
                    .with_intent(Intent::Vector),
            )
        }
        4 => {
            let dims: [usize; 4] = fixed_dims(&shape)?;
            let column = map
                .data()
                .clone()
                .reshape([dims[0], dims[1], dims[2], dims[3], 1]);
            DisplacementField::Rank5(
                map.with_data(stack_component(column, axis))
                    .with_intent(Intent::Vector),
            )
        }
        _ => {
            return Err(WarpError::shape(format!(
                "displacement map must have rank 3 or 4, got shape {shape:?}"
            )))
        }
    };
    Ok(field)
}

/// Embed a displacement map and express it in the given convention.
pub fn displacement_map_to_field<B: Backend, const D: usize>(
    map: &VolumetricImage<B, D>,
    axis: Axis,
    convention: WarpConvention,
) -> Result<DisplacementField<B>> {
    let field = embed(map, axis)?;
    convert(&field, WarpConvention::Itk, convention)
}

fn stack_component<B: Backend, const D: usize>(column: Tensor<B, D>, axis: Axis) -> Tensor<B, D> {
    let zeros = column.zeros_like();
    let parts = (0..COMPONENTS)
        .map(|c| {
            if c == axis.index() {
                column.clone()
            } else {
                zeros.clone()
            }
        })
        .collect();
    Tensor::cat(parts, D - 1)
}
