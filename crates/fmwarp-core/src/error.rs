//! Error types for field map and warp operations.
//!
//! All validation in this workspace happens before any kernel is invoked, so
//! every variant except [`WarpError::Kernel`] identifies the offending
//! argument. Kernel failures are carried through untouched.

use thiserror::Error;

/// Opaque failure reported by a native geometric kernel.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("kernel failure: {message}")]
pub struct KernelError {
    message: String,
}

impl KernelError {
    /// Create a kernel error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message reported by the kernel.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for field map and warp operations.
#[derive(Error, Debug)]
pub enum WarpError {
    /// Unrecognized direction, axis or convention name.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Wrong array rank or wrong axis size.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Zero readout time, degenerate voxel size or singular geometry.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// The affine carries more shear than the decomposition may discard.
    #[error("Affine shear {shear:.3e} exceeds tolerance {tolerance:.3e}")]
    ShearExceedsTolerance { shear: f64, tolerance: f64 },

    /// Failure propagated unchanged from a kernel call.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Malformed acquisition metadata.
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// I/O failure while reading auxiliary inputs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for field map and warp operations.
pub type Result<T> = std::result::Result<T, WarpError>;

impl WarpError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a shape error.
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Create an arithmetic error.
    pub fn arithmetic(msg: impl Into<String>) -> Self {
        Self::Arithmetic(msg.into())
    }

    /// Create a metadata error.
    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = WarpError::shape("trailing axis must be 3");
        assert!(matches!(err, WarpError::Shape(_)));
    }

    #[test]
    fn test_error_display() {
        let err = WarpError::configuration("unknown convention 'elastix'");
        assert_eq!(
            err.to_string(),
            "Configuration error: unknown convention 'elastix'"
        );
    }

    #[test]
    fn test_kernel_error_is_transparent() {
        let err: WarpError = KernelError::new("non-invertible at voxel (1, 2, 3)").into();
        assert_eq!(
            err.to_string(),
            "kernel failure: non-invertible at voxel (1, 2, 3)"
        );
        match err {
            WarpError::Kernel(inner) => {
                assert_eq!(inner.message(), "non-invertible at voxel (1, 2, 3)")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_shear_display() {
        let err = WarpError::ShearExceedsTolerance {
            shear: 0.25,
            tolerance: 1e-4,
        };
        let msg = err.to_string();
        assert!(msg.contains("shear"));
        assert!(msg.contains("tolerance"));
    }
}
