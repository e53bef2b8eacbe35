#![allow(dead_code)]

use std::io::{self, Read, Write};

use nnue_core::Layer;
use nnue_core::constants::{CACHE_LINE_SIZE, MAX_SIMD_WIDTH};
use nnue_core::util::ceil_to_multiple;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minimal activation between two affine stages: `clamp(x >> 6, 0, 127)`.
#[derive(Debug, Default, Clone)]
pub struct Requantize<P> {
    previous: P,
}

impl<P: Layer<Output = i32>> Requantize<P> {
    pub const PADDED_OUTPUT_DIMS: usize = ceil_to_multiple(P::OUTPUT_DIMS, MAX_SIMD_WIDTH);
    pub const SELF_BUFFER_SIZE: usize =
        ceil_to_multiple(Self::PADDED_OUTPUT_DIMS * size_of::<u8>(), CACHE_LINE_SIZE);

    pub fn new(previous: P) -> Self {
        Self { previous }
    }

    pub fn previous(&self) -> &P {
        &self.previous
    }

    pub fn previous_mut(&mut self) -> &mut P {
        &mut self.previous
    }
}

impl<P: Layer<Output = i32>> Layer for Requantize<P> {
    type Output = u8;

    const OUTPUT_DIMS: usize = P::OUTPUT_DIMS;
    const BUFFER_SIZE: usize = P::BUFFER_SIZE + Self::SELF_BUFFER_SIZE;
    const HASH_VALUE: u32 = 0x538D_24C7u32.wrapping_add(P::HASH_VALUE);

    fn structure_string() -> String {
        format!("Requantize[{}]({})", P::OUTPUT_DIMS, P::structure_string())
    }

    fn read_parameters<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        self.previous.read_parameters(reader)
    }

    fn write_parameters<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.previous.write_parameters(writer)
    }

    fn has_zero_padding(&self) -> bool {
        self.previous.has_zero_padding()
    }

    fn propagate<'a>(&self, features: &'a [u8], buffer: &'a mut [u8]) -> &'a [u8] {
        let (own, rest) = buffer.split_at_mut(Self::SELF_BUFFER_SIZE);
        let input = self.previous.propagate(features, rest);
        let output = &mut own[..Self::PADDED_OUTPUT_DIMS];
        for (out, &x) in output.iter_mut().zip(input) {
            *out = (x >> 6).clamp(0, 127) as u8;
        }
        output[P::OUTPUT_DIMS..].fill(0);
        output
    }
}

/// Random zero-padded feature vector with `dims` live values.
pub fn random_features(rng: &mut StdRng, dims: usize, len: usize) -> Vec<u8> {
    let mut features = vec![0u8; len];
    for x in &mut features[..dims] {
        *x = rng.random();
    }
    features
}

/// Random biases and zero-padded weights for `outputs × padded` stages.
pub fn random_parameters(
    seed: u64,
    outputs: usize,
    input_dims: usize,
    padded: usize,
) -> (Vec<i32>, Vec<i8>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let biases = (0..outputs).map(|_| rng.random_range(-4096..4096)).collect();
    let mut weights = vec![0i8; outputs * padded];
    for row in weights.chunks_mut(padded) {
        for w in &mut row[..input_dims] {
            *w = rng.random();
        }
    }
    (biases, weights)
}

/// Encodes one affine stage in the documented byte layout.
pub fn encode_affine(biases: &[i32], weights: &[i8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(biases.len() * 4 + weights.len());
    for bias in biases {
        bytes.extend_from_slice(&bias.to_le_bytes());
    }
    bytes.extend(weights.iter().map(|&w| w as u8));
    bytes
}
