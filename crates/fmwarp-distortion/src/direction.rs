//! Phase-encoding direction codes.

use std::fmt;
use std::str::FromStr;

use fmwarp_core::{Axis, WarpError};
use serde::{Deserialize, Serialize};

/// Axis letter of a phase-encoding direction as written in sidecar metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectionCode {
    X,
    Y,
    Z,
    I,
    J,
    K,
}

impl DirectionCode {
    /// Spatial axis this code refers to.
    pub const fn axis(self) -> Axis {
        match self {
            DirectionCode::X | DirectionCode::I => Axis::X,
            DirectionCode::Y | DirectionCode::J => Axis::Y,
            DirectionCode::Z | DirectionCode::K => Axis::Z,
        }
    }

    const fn letter(self) -> char {
        match self {
            DirectionCode::X => 'x',
            DirectionCode::Y => 'y',
            DirectionCode::Z => 'z',
            DirectionCode::I => 'i',
            DirectionCode::J => 'j',
            DirectionCode::K => 'k',
        }
    }
}

/// Sign of a phase-encoding direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Positive,
    Negative,
}

impl Polarity {
    /// `+1` or `-1`.
    pub const fn sign(self) -> f64 {
        match self {
            Polarity::Positive => 1.0,
            Polarity::Negative => -1.0,
        }
    }
}

/// Phase-encoding direction, e.g. `j-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhaseEncodingDirection {
    pub code: DirectionCode,
    pub polarity: Polarity,
}

impl PhaseEncodingDirection {
    pub const fn new(code: DirectionCode, polarity: Polarity) -> Self {
        Self { code, polarity }
    }

    /// Spatial axis the distortion runs along.
    pub const fn axis(&self) -> Axis {
        self.code.axis()
    }

    /// Scale relating a field map (Hz) to a displacement map (mm).
    ///
    /// `readout × voxel_size × polarity × lps_correction(axis)`; the LPS term
    /// puts the displacement in the sign convention the kernels use
    /// internally.
    pub fn displacement_scale(&self, total_readout_time: f64, voxel_size: f64) -> f64 {
        total_readout_time * voxel_size * self.polarity.sign() * self.axis().lps_correction()
    }
}

impl fmt::Display for PhaseEncodingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code.letter())?;
        if self.polarity == Polarity::Negative {
            f.write_str("-")?;
        }
        Ok(())
    }
}

impl FromStr for PhaseEncodingDirection {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (letter, polarity) = match trimmed.strip_suffix('-') {
            Some(rest) => (rest, Polarity::Negative),
            None => (trimmed, Polarity::Positive),
        };
        let code = match letter {
            "x" => DirectionCode::X,
            "y" => DirectionCode::Y,
            "z" => DirectionCode::Z,
            "i" => DirectionCode::I,
            "j" => DirectionCode::J,
            "k" => DirectionCode::K,
            _ => {
                return Err(WarpError::configuration(format!(
                    "unrecognized phase-encoding direction '{s}'"
                )))
            }
        };
        Ok(Self { code, polarity })
    }
}

impl TryFrom<String> for PhaseEncodingDirection {
    type Error = WarpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhaseEncodingDirection> for String {
    fn from(value: PhaseEncodingDirection) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_codes() {
        for text in ["x", "y", "z", "i", "j", "k", "x-", "y-", "z-", "i-", "j-", "k-"] {
            let direction: PhaseEncodingDirection = text.parse().unwrap();
            assert_eq!(direction.to_string(), text);
        }
    }

    #[test]
    fn test_parse_resolves_axis_and_polarity() {
        let direction: PhaseEncodingDirection = "j-".parse().unwrap();
        assert_eq!(direction.axis(), Axis::Y);
        assert_eq!(direction.polarity, Polarity::Negative);

        let direction: PhaseEncodingDirection = "k".parse().unwrap();
        assert_eq!(direction.axis(), Axis::Z);
        assert_eq!(direction.polarity, Polarity::Positive);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        for text in ["q", "", "-", "j+", "jj", "xy-"] {
            let err = text.parse::<PhaseEncodingDirection>().unwrap_err();
            assert!(matches!(err, WarpError::Configuration(_)), "{text}");
        }
    }

    #[test]
    fn test_displacement_scale() {
        let direction: PhaseEncodingDirection = "j-".parse().unwrap();
        assert!((direction.displacement_scale(0.05, 2.0) - 0.1).abs() < 1e-12);

        let direction: PhaseEncodingDirection = "j".parse().unwrap();
        assert!((direction.displacement_scale(0.05, 2.0) + 0.1).abs() < 1e-12);

        let direction: PhaseEncodingDirection = "k-".parse().unwrap();
        assert!((direction.displacement_scale(0.05, 2.0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_serde_uses_string_form() {
        let direction: PhaseEncodingDirection = serde_json::from_str("\"i-\"").unwrap();
        assert_eq!(direction.code, DirectionCode::I);
        assert_eq!(serde_json::to_string(&direction).unwrap(), "\"i-\"");
        assert!(serde_json::from_str::<PhaseEncodingDirection>("\"w\"").is_err());
    }
}
