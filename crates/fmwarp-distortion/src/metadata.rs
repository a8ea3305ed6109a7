//! Acquisition parameters from BIDS JSON sidecars.

use std::path::Path;

use fmwarp_core::{Result, WarpError};
use serde::{Deserialize, Serialize};

use crate::direction::PhaseEncodingDirection;

/// Fields of one echo's sidecar that the conversions need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionMetadata {
    /// Echo time in seconds.
    #[serde(rename = "EchoTime")]
    pub echo_time: f64,
    /// Total readout time in seconds.
    #[serde(rename = "TotalReadoutTime", default, skip_serializing_if = "Option::is_none")]
    pub total_readout_time: Option<f64>,
    #[serde(rename = "PhaseEncodingDirection", default, skip_serializing_if = "Option::is_none")]
    pub phase_encoding_direction: Option<PhaseEncodingDirection>,
}

impl AcquisitionMetadata {
    /// Parse a sidecar document. Unknown fields are ignored.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WarpError::metadata(format!("invalid sidecar: {e}")))
    }

    /// Read and parse a sidecar file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        tracing::debug!("read sidecar {}", path.display());
        Self::from_json_str(&json).map_err(|e| match e {
            WarpError::Metadata(message) => {
                WarpError::metadata(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Echo time in milliseconds.
    pub fn echo_time_ms(&self) -> f64 {
        self.echo_time * 1000.0
    }

    /// Total readout time and phase-encoding direction, both required.
    pub fn readout_parameters(&self) -> Result<(f64, PhaseEncodingDirection)> {
        let readout = self
            .total_readout_time
            .ok_or_else(|| WarpError::metadata("could not find 'TotalReadoutTime' in sidecar"))?;
        let direction = self
            .phase_encoding_direction
            .ok_or_else(|| {
                WarpError::metadata("could not find 'PhaseEncodingDirection' in sidecar")
            })?;
        Ok((readout, direction))
    }
}

/// Echo times of a multi-echo run together with its shared readout parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoSeries {
    /// Echo times in milliseconds, ascending.
    pub echo_times_ms: Vec<f64>,
    /// `order[n]` is the index of the sidecar that holds the `n`-th echo.
    pub order: Vec<usize>,
    pub total_readout_time: f64,
    pub phase_encoding_direction: PhaseEncodingDirection,
}

impl EchoSeries {
    /// Gather per-echo sidecars in acquisition order.
    ///
    /// Readout time and direction come from the first sidecar; echoes are
    /// sorted by echo time.
    pub fn from_sidecars(sidecars: &[AcquisitionMetadata]) -> Result<Self> {
        let first = sidecars
            .first()
            .ok_or_else(|| WarpError::metadata("at least one sidecar is required"))?;
        let (total_readout_time, phase_encoding_direction) = first.readout_parameters()?;

        let mut order: Vec<usize> = (0..sidecars.len()).collect();
        order.sort_by(|&a, &b| sidecars[a].echo_time.total_cmp(&sidecars[b].echo_time));
        let echo_times_ms = order.iter().map(|&n| sidecars[n].echo_time_ms()).collect();

        Ok(Self {
            echo_times_ms,
            order,
            total_readout_time,
            phase_encoding_direction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Polarity;
    use fmwarp_core::Axis;

    #[test]
    fn test_parse_full_sidecar() {
        let metadata = AcquisitionMetadata::from_json_str(
            r#"{
                "EchoTime": 0.0142,
                "TotalReadoutTime": 0.0503,
                "PhaseEncodingDirection": "j-",
                "RepetitionTime": 1.761
            }"#,
        )
        .unwrap();
        assert!((metadata.echo_time_ms() - 14.2).abs() < 1e-9);
        let (readout, direction) = metadata.readout_parameters().unwrap();
        assert_eq!(readout, 0.0503);
        assert_eq!(direction.axis(), Axis::Y);
        assert_eq!(direction.polarity, Polarity::Negative);
    }

    #[test]
    fn test_missing_readout_fields() {
        let metadata = AcquisitionMetadata::from_json_str(r#"{"EchoTime": 0.03}"#).unwrap();
        let err = metadata.readout_parameters().unwrap_err();
        assert!(err.to_string().contains("TotalReadoutTime"));

        let metadata =
            AcquisitionMetadata::from_json_str(r#"{"EchoTime": 0.03, "TotalReadoutTime": 0.05}"#)
                .unwrap();
        let err = metadata.readout_parameters().unwrap_err();
        assert!(err.to_string().contains("PhaseEncodingDirection"));
    }

    #[test]
    fn test_missing_echo_time_is_metadata_error() {
        let err = AcquisitionMetadata::from_json_str(r#"{"TotalReadoutTime": 0.05}"#).unwrap_err();
        assert!(matches!(err, WarpError::Metadata(_)));
    }

    #[test]
    fn test_bad_direction_is_metadata_error() {
        let err = AcquisitionMetadata::from_json_str(
            r#"{"EchoTime": 0.03, "PhaseEncodingDirection": "q"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, WarpError::Metadata(_)));
    }

    #[test]
    fn test_echo_series_sorts_by_echo_time() {
        let sidecars = vec![
            AcquisitionMetadata::from_json_str(
                r#"{"EchoTime": 0.04, "TotalReadoutTime": 0.05, "PhaseEncodingDirection": "i"}"#,
            )
            .unwrap(),
            AcquisitionMetadata::from_json_str(r#"{"EchoTime": 0.01}"#).unwrap(),
            AcquisitionMetadata::from_json_str(r#"{"EchoTime": 0.025}"#).unwrap(),
        ];
        let series = EchoSeries::from_sidecars(&sidecars).unwrap();
        assert_eq!(series.order, vec![1, 2, 0]);
        assert!((series.echo_times_ms[0] - 10.0).abs() < 1e-9);
        assert!((series.echo_times_ms[2] - 40.0).abs() < 1e-9);
        assert_eq!(series.total_readout_time, 0.05);
        assert_eq!(series.phase_encoding_direction.axis(), Axis::X);
    }

    #[test]
    fn test_echo_series_needs_first_readout() {
        let sidecars = vec![AcquisitionMetadata::from_json_str(r#"{"EchoTime": 0.01}"#).unwrap()];
        assert!(matches!(
            EchoSeries::from_sidecars(&sidecars),
            Err(WarpError::Metadata(_))
        ));
        assert!(EchoSeries::from_sidecars(&[]).is_err());
    }
}
