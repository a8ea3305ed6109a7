//! Axis-sign and shape conventions of displacement fields.

use std::fmt;
use std::str::FromStr;

use burn::tensor::backend::Backend;
use fmwarp_core::orientation::{apply, canonicalize};
use fmwarp_core::{Intent, Result, WarpError};
use serde::{Deserialize, Serialize};

use crate::field::{
    pad_singleton, require_components, require_nonempty, scale_components, DisplacementField,
};

/// Registration toolchain whose displacement-field layout is targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpConvention {
    Itk,
    Fsl,
    Ants,
    Afni,
}

impl WarpConvention {
    pub const ALL: [WarpConvention; 4] = [
        WarpConvention::Itk,
        WarpConvention::Fsl,
        WarpConvention::Ants,
        WarpConvention::Afni,
    ];

    /// Per-component signs relative to itk.
    pub const fn signs(self) -> [f32; 3] {
        match self {
            WarpConvention::Itk => [1.0, 1.0, 1.0],
            WarpConvention::Fsl => [-1.0, 1.0, 1.0],
            WarpConvention::Ants | WarpConvention::Afni => [-1.0, -1.0, 1.0],
        }
    }

    /// Whether fields are stored as `[i, j, k, 1, 3]` rather than `[i, j, k, 3]`.
    pub const fn requires_singleton_axis(self) -> bool {
        matches!(self, WarpConvention::Ants | WarpConvention::Afni)
    }

    pub const fn name(self) -> &'static str {
        match self {
            WarpConvention::Itk => "itk",
            WarpConvention::Fsl => "fsl",
            WarpConvention::Ants => "ants",
            WarpConvention::Afni => "afni",
        }
    }

    /// Factors taking components from `self` to `target`.
    fn factors_to(self, target: WarpConvention) -> [f32; 3] {
        let from = self.signs();
        let to = target.signs();
        [from[0] * to[0], from[1] * to[1], from[2] * to[2]]
    }
}

impl fmt::Display for WarpConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WarpConvention {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "itk" => Ok(WarpConvention::Itk),
            "fsl" => Ok(WarpConvention::Fsl),
            "ants" => Ok(WarpConvention::Ants),
            "afni" => Ok(WarpConvention::Afni),
            _ => Err(WarpError::configuration(format!(
                "unknown warp convention '{s}', expected one of itk, fsl, ants, afni"
            ))),
        }
    }
}

/// Convert a displacement field between conventions.
///
/// The field is brought to RAS, a singleton fourth axis is squeezed, each
/// component is multiplied by the product of the two conventions' signs, the
/// singleton axis is re-inserted when the target needs it and the original
/// orientation is restored. The result carries the vector intent.
pub fn convert<B: Backend>(
    field: &DisplacementField<B>,
    from: WarpConvention,
    to: WarpConvention,
) -> Result<DisplacementField<B>> {
    let squeezed = field.squeezed()?;
    let shape = squeezed.shape();
    require_nonempty(&shape)?;
    require_components(&shape)?;
    let (ras, inverse) = canonicalize(&squeezed)?;

    tracing::debug!("converting displacement field from {} to {}", from, to);
    let data = scale_components(ras.data().clone(), from.factors_to(to));
    let converted = apply(&ras.with_data(data), &inverse)?.with_intent(Intent::Vector);

    if to.requires_singleton_axis() {
        Ok(DisplacementField::Rank5(pad_singleton(&converted)?))
    } else {
        Ok(DisplacementField::Rank4(converted))
    }
}
