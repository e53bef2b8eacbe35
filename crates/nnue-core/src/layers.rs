//! Network stages and the contract they share.
//!
//! Stages nest by value: each stage owns its upstream stage as a generic
//! parameter, so a whole chain is a single concrete type and every call through
//! it is statically dispatched.

mod affine_transform;
mod input_slice;

use std::io::{self, Read, Write};

pub use affine_transform::{AffineTransform, TrainingView};
pub use input_slice::InputSlice;

/// A stage of the network.
///
/// Scratch layout: a stage writes its output at the start of the buffer it is
/// given and passes the remainder, past its own `CACHE_LINE_SIZE`-aligned
/// region, to its upstream stage.
pub trait Layer {
    /// Element type of the stage output.
    type Output: bytemuck::Pod;

    /// Number of output values.
    const OUTPUT_DIMS: usize;

    /// Scratch bytes needed from the input up to and including this stage.
    const BUFFER_SIZE: usize;

    /// Structural fingerprint of the chain ending at this stage.
    const HASH_VALUE: u32;

    /// Returns [`Self::HASH_VALUE`].
    #[inline]
    fn hash_value() -> u32 {
        Self::HASH_VALUE
    }

    /// Human-readable rendering of the chain ending at this stage.
    fn structure_string() -> String;

    /// Reads the parameters of the chain, innermost stage first.
    fn read_parameters<R: Read>(&mut self, reader: &mut R) -> io::Result<()>;

    /// Writes the parameters of the chain in the layout read by [`Layer::read_parameters`].
    fn write_parameters<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Returns `true` if every weight padding column in the chain is zero.
    fn has_zero_padding(&self) -> bool {
        true
    }

    /// Runs the chain forward.
    ///
    /// `features` is the transformed feature vector fed to the chain root and
    /// `buffer` must hold at least [`Self::BUFFER_SIZE`] bytes, aligned to the
    /// output type. For `u8` outputs the returned slice covers the output padded
    /// to [`MAX_SIMD_WIDTH`](crate::constants::MAX_SIMD_WIDTH), padding zeroed.
    fn propagate<'a>(&self, features: &'a [u8], buffer: &'a mut [u8]) -> &'a [Self::Output];
}
