//! Scratch memory for forward propagation.

use std::fmt;
use std::marker::PhantomData;

use aligned_vec::{AVec, ConstAlign, avec};

use crate::constants::CACHE_LINE_SIZE;
use crate::layers::Layer;

/// Cache-line aligned scratch region sized for the whole chain `L`.
///
/// Allocate one per concurrent evaluation and reuse it across calls; the size
/// is `L::BUFFER_SIZE` and never changes.
pub struct ScratchBuffer<L> {
    bytes: AVec<u8, ConstAlign<CACHE_LINE_SIZE>>,
    _layer: PhantomData<fn() -> L>,
}

impl<L: Layer> ScratchBuffer<L> {
    /// Size in bytes of every buffer for `L`.
    pub const SIZE: usize = L::BUFFER_SIZE;

    pub fn new() -> Self {
        Self {
            bytes: avec![[CACHE_LINE_SIZE]|0u8; Self::SIZE],
            _layer: PhantomData,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Overwrites every byte with `value`.
    pub fn fill(&mut self, value: u8) {
        self.bytes.fill(value);
    }
}

impl<L: Layer> Default for ScratchBuffer<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> fmt::Debug for ScratchBuffer<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchBuffer")
            .field("len", &self.bytes.len())
            .finish()
    }
}
