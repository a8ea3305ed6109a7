//! Geometric kernels.
//!
//! This module provides the kernel trait the inversion and resampling
//! adapters call, and a pure-Rust reference implementation.

pub mod trait_;
pub mod reference;
mod sampling;

pub use trait_::{ResampleRequest, WarpKernel};
pub use reference::ReferenceKernel;
