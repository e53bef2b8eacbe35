//! Fully connected stage: `output = biases + weights · input`.

use std::io::{self, Read, Write};

use aligned_vec::{AVec, ConstAlign, avec};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::Layer;
use crate::constants::{CACHE_LINE_SIZE, MAX_SIMD_WIDTH};
use crate::kernel;
use crate::util::ceil_to_multiple;

/// Affine transform over the `u8` output of `P`.
///
/// # Type Parameters
///
/// * `P` - The upstream stage, owned by value.
/// * `OUTPUT_DIMS` - Number of outputs.
///
/// Weights are stored row-major with each row padded to
/// [`Self::PADDED_INPUT_DIMS`]. The padding columns are expected to be zero, and
/// the upstream stage is expected to zero its output padding, so the padded dot
/// product equals the true one.
#[derive(Debug, Clone)]
pub struct AffineTransform<P, const OUTPUT_DIMS: usize> {
    previous: P,
    biases: AVec<i32, ConstAlign<CACHE_LINE_SIZE>>,
    weights: AVec<i8, ConstAlign<CACHE_LINE_SIZE>>,
}

impl<P: Layer<Output = u8>, const OUTPUT_DIMS: usize> AffineTransform<P, OUTPUT_DIMS> {
    /// Number of real inputs.
    pub const INPUT_DIMS: usize = P::OUTPUT_DIMS;

    /// Inputs rounded up to the padding width; the length of a weight row.
    pub const PADDED_INPUT_DIMS: usize = ceil_to_multiple(P::OUTPUT_DIMS, MAX_SIMD_WIDTH);

    /// Bytes of scratch owned by this stage alone.
    pub const SELF_BUFFER_SIZE: usize =
        ceil_to_multiple(OUTPUT_DIMS * size_of::<i32>(), CACHE_LINE_SIZE);

    /// Creates the stage with all parameters zero.
    pub fn new(previous: P) -> Self {
        Self {
            previous,
            biases: avec![[CACHE_LINE_SIZE]|0i32; OUTPUT_DIMS],
            weights: avec![[CACHE_LINE_SIZE]|0i8; OUTPUT_DIMS * Self::PADDED_INPUT_DIMS],
        }
    }

    /// Creates the stage from in-memory parameters.
    ///
    /// # Arguments
    ///
    /// * `previous` - The upstream stage.
    /// * `biases` - `OUTPUT_DIMS` biases.
    /// * `weights` - `OUTPUT_DIMS × PADDED_INPUT_DIMS` weights, row-major.
    ///
    /// # Panics
    ///
    /// Panics if either slice has the wrong length.
    pub fn from_parameters(previous: P, biases: &[i32], weights: &[i8]) -> Self {
        assert_eq!(biases.len(), OUTPUT_DIMS, "bias count");
        assert_eq!(
            weights.len(),
            OUTPUT_DIMS * Self::PADDED_INPUT_DIMS,
            "weight count"
        );

        Self {
            previous,
            biases: AVec::from_slice(CACHE_LINE_SIZE, biases),
            weights: AVec::from_slice(CACHE_LINE_SIZE, weights),
        }
    }

    /// The upstream stage.
    pub fn previous(&self) -> &P {
        &self.previous
    }

    pub fn biases(&self) -> &[i32] {
        &self.biases
    }

    /// All weights, row-major with padded rows.
    pub fn weights(&self) -> &[i8] {
        &self.weights
    }

    /// Weights feeding output `index`, padding included.
    pub fn row(&self, index: usize) -> &[i8] {
        let start = index * Self::PADDED_INPUT_DIMS;
        &self.weights[start..start + Self::PADDED_INPUT_DIMS]
    }

    /// Exclusive access to the parameters for training.
    ///
    /// The view holds the only borrow of the stage, so no evaluation can
    /// observe a partially updated row.
    pub fn training_view(&mut self) -> TrainingView<'_, P, OUTPUT_DIMS> {
        TrainingView { layer: self }
    }
}

impl<P: Layer<Output = u8> + Default, const OUTPUT_DIMS: usize> Default
    for AffineTransform<P, OUTPUT_DIMS>
{
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: Layer<Output = u8>, const OUTPUT_DIMS: usize> Layer for AffineTransform<P, OUTPUT_DIMS> {
    type Output = i32;

    const OUTPUT_DIMS: usize = OUTPUT_DIMS;
    const BUFFER_SIZE: usize = P::BUFFER_SIZE + Self::SELF_BUFFER_SIZE;
    const HASH_VALUE: u32 = {
        let mut hash_value = 0xCC03_DAE4u32;
        hash_value = hash_value.wrapping_add(OUTPUT_DIMS as u32);
        hash_value ^= P::HASH_VALUE >> 1;
        hash_value ^= P::HASH_VALUE << 31;
        hash_value
    };

    fn structure_string() -> String {
        format!(
            "AffineTransform[{}<-{}]({})",
            OUTPUT_DIMS,
            Self::INPUT_DIMS,
            P::structure_string()
        )
    }

    /// Reads the upstream parameters, then biases and weights.
    ///
    /// On error the biases and weights of this stage keep their previous values.
    fn read_parameters<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        self.previous.read_parameters(reader)?;

        let mut biases = avec![[CACHE_LINE_SIZE]|0i32; OUTPUT_DIMS];
        reader.read_i32_into::<LittleEndian>(&mut biases)?;

        let mut weights = avec![[CACHE_LINE_SIZE]|0i8; OUTPUT_DIMS * Self::PADDED_INPUT_DIMS];
        reader.read_i8_into(&mut weights)?;

        self.biases = biases;
        self.weights = weights;
        log::trace!("loaded {}", Self::structure_string());
        Ok(())
    }

    fn write_parameters<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.previous.write_parameters(writer)?;

        for &bias in self.biases.iter() {
            writer.write_i32::<LittleEndian>(bias)?;
        }
        writer.write_all(bytemuck::cast_slice(&self.weights[..]))
    }

    fn has_zero_padding(&self) -> bool {
        self.previous.has_zero_padding()
            && self
                .weights
                .chunks_exact(Self::PADDED_INPUT_DIMS.max(1))
                .all(|row| row[Self::INPUT_DIMS..].iter().all(|&w| w == 0))
    }

    #[inline]
    fn propagate<'a>(&self, features: &'a [u8], buffer: &'a mut [u8]) -> &'a [i32] {
        let (own, rest) = buffer.split_at_mut(Self::SELF_BUFFER_SIZE);
        let input = &self.previous.propagate(features, rest)[..Self::PADDED_INPUT_DIMS];
        debug_assert!(
            input[Self::INPUT_DIMS..].iter().all(|&x| x == 0),
            "input padding must be zero"
        );

        let output: &mut [i32] =
            bytemuck::cast_slice_mut(&mut own[..OUTPUT_DIMS * size_of::<i32>()]);
        kernel::affine_transform(&self.biases, &self.weights, input, output);
        output
    }
}

/// Mutable view over the parameters of an [`AffineTransform`].
///
/// Rows are exposed without their padding columns so updates cannot break the
/// zero-padding the kernels rely on.
pub struct TrainingView<'a, P, const OUTPUT_DIMS: usize> {
    layer: &'a mut AffineTransform<P, OUTPUT_DIMS>,
}

impl<P: Layer<Output = u8>, const OUTPUT_DIMS: usize> TrainingView<'_, P, OUTPUT_DIMS> {
    pub fn biases_mut(&mut self) -> &mut [i32] {
        &mut self.layer.biases
    }

    /// The real input columns of row `index`.
    pub fn row_mut(&mut self, index: usize) -> &mut [i8] {
        let start = index * AffineTransform::<P, OUTPUT_DIMS>::PADDED_INPUT_DIMS;
        let end = start + AffineTransform::<P, OUTPUT_DIMS>::INPUT_DIMS;
        &mut self.layer.weights[start..end]
    }

    /// The upstream stage, for training deeper in the chain.
    pub fn previous_mut(&mut self) -> &mut P {
        &mut self.layer.previous
    }
}
