use std::io::{self, Read, Write};

use super::Layer;
use crate::constants::MAX_SIMD_WIDTH;
use crate::util::ceil_to_multiple;

/// Root of a stage chain: a window onto the transformed feature vector.
///
/// Exposes `OUTPUT_DIMS` values starting at `OFFSET`. The feature vector must
/// extend to the padded end of the window with zeros.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputSlice<const OUTPUT_DIMS: usize, const OFFSET: usize = 0>;

impl<const OUTPUT_DIMS: usize, const OFFSET: usize> InputSlice<OUTPUT_DIMS, OFFSET> {
    const PADDED_OUTPUT_DIMS: usize = ceil_to_multiple(OUTPUT_DIMS, MAX_SIMD_WIDTH);
}

impl<const OUTPUT_DIMS: usize, const OFFSET: usize> Layer for InputSlice<OUTPUT_DIMS, OFFSET> {
    type Output = u8;

    const OUTPUT_DIMS: usize = OUTPUT_DIMS;
    const BUFFER_SIZE: usize = 0;
    const HASH_VALUE: u32 = 0xEC42_E90D ^ (OUTPUT_DIMS as u32 ^ ((OFFSET as u32) << 10));

    fn structure_string() -> String {
        format!("InputSlice[{}({}:{})]", OUTPUT_DIMS, OFFSET, OFFSET + OUTPUT_DIMS)
    }

    fn read_parameters<R: Read>(&mut self, _reader: &mut R) -> io::Result<()> {
        Ok(())
    }

    fn write_parameters<W: Write>(&self, _writer: &mut W) -> io::Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn propagate<'a>(&self, features: &'a [u8], _buffer: &'a mut [u8]) -> &'a [u8] {
        &features[OFFSET..OFFSET + Self::PADDED_OUTPUT_DIMS]
    }
}
