//! Physical axis enumeration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WarpError;

/// One of the three spatial axes of a canonical (RAS) voxel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in array order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Array axis index (and vector component index) of this axis.
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for an array index, if it is spatial.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }

    /// Sign that maps a displacement along this axis between RAS and LPS.
    ///
    /// LPS differs from RAS in the direction of x and y only.
    pub const fn lps_correction(self) -> f64 {
        match self {
            Axis::X | Axis::Y => -1.0,
            Axis::Z => 1.0,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Parses axis codes as they appear in acquisition metadata.
///
/// World (`x`, `y`, `z`) and voxel (`i`, `j`, `k`) codes name the same axis
/// once an image is in canonical orientation; a trailing `-` is accepted and
/// ignored since polarity does not change the axis.
impl FromStr for Axis {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        let code = code.strip_suffix('-').unwrap_or(code);
        match code {
            "x" | "i" => Ok(Axis::X),
            "y" | "j" => Ok(Axis::Y),
            "z" | "k" => Ok(Axis::Z),
            _ => Err(WarpError::configuration(format!(
                "unrecognized axis '{s}', expected one of x, y, z, i, j, k"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_parse_all_codes() {
        let cases = [
            ("x", Axis::X),
            ("y", Axis::Y),
            ("z", Axis::Z),
            ("i", Axis::X),
            ("j", Axis::Y),
            ("k", Axis::Z),
            ("x-", Axis::X),
            ("j-", Axis::Y),
            ("k-", Axis::Z),
        ];
        for (code, expected) in cases {
            assert_eq!(code.parse::<Axis>().unwrap(), expected, "code {code}");
        }
    }

    #[test]
    fn test_axis_parse_rejects_unknown() {
        let err = "q".parse::<Axis>().unwrap_err();
        assert!(matches!(err, WarpError::Configuration(_)));
        assert!("".parse::<Axis>().is_err());
        assert!("y+".parse::<Axis>().is_err());
    }

    #[test]
    fn test_lps_correction() {
        assert_eq!(Axis::X.lps_correction(), -1.0);
        assert_eq!(Axis::Y.lps_correction(), -1.0);
        assert_eq!(Axis::Z.lps_correction(), 1.0);
    }

    #[test]
    fn test_index_roundtrip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(3), None);
    }
}
