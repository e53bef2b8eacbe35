//! The stage chain compiled into this build.

use crate::constants::MAX_SIMD_WIDTH;
use crate::layers::{AffineTransform, InputSlice};
use crate::util::ceil_to_multiple;

/// Length of the transformed feature vector fed to the chain.
pub const TRANSFORMED_FEATURE_DIMS: usize = 512;

/// Bytes the caller must provide for the feature vector, padding included.
pub const PADDED_FEATURE_DIMS: usize = ceil_to_multiple(TRANSFORMED_FEATURE_DIMS, MAX_SIMD_WIDTH);

/// Number of values produced per evaluation.
pub const OUTPUT_DIMS: usize = 32;

pub type InputLayer = InputSlice<TRANSFORMED_FEATURE_DIMS>;
pub type Architecture = AffineTransform<InputLayer, OUTPUT_DIMS>;
