mod common;

use std::io;

use common::{Requantize, encode_affine, random_features, random_parameters};
use nnue_core::constants::CACHE_LINE_SIZE;
use nnue_core::{AffineTransform, InputSlice, Layer, ScratchBuffer};
use rand::SeedableRng;
use rand::rngs::StdRng;

type Inner = AffineTransform<InputSlice<40>, 24>;
type Outer = AffineTransform<Requantize<Inner>, 4>;

const POISON: u8 = 0xA5;

macro_rules! assert_biases_pass_through {
    ($($outputs:literal <- $inputs:literal),+ $(,)?) => {$({
        type Stage = AffineTransform<InputSlice<$inputs>, $outputs>;
        let biases: Vec<i32> = (0..$outputs).map(|i| i * 1000 - 7).collect();
        let weights = vec![0i8; $outputs * Stage::PADDED_INPUT_DIMS];
        let stage = Stage::from_parameters(InputSlice, &biases, &weights);
        let features = vec![0u8; Stage::PADDED_INPUT_DIMS];
        let mut scratch = ScratchBuffer::<Stage>::new();
        assert_eq!(
            stage.propagate(&features, scratch.as_mut_slice()),
            biases.as_slice(),
            "{} <- {}", $outputs, $inputs
        );
    })+};
}

#[test]
fn zero_weights_and_inputs_yield_biases() {
    assert_biases_pass_through!(
        1 <- 1,
        1 <- 32,
        3 <- 31,
        8 <- 33,
        16 <- 64,
        15 <- 65,
        32 <- 100,
        32 <- 512,
    );
}

#[test]
fn loaded_stage_matches_in_memory_stage() {
    let (biases, weights) = random_parameters(42, 24, 40, Inner::PADDED_INPUT_DIMS);
    let direct = Inner::from_parameters(InputSlice, &biases, &weights);

    let bytes = encode_affine(&biases, &weights);
    let mut loaded = Inner::default();
    loaded.read_parameters(&mut bytes.as_slice()).unwrap();

    let mut written = Vec::new();
    direct.write_parameters(&mut written).unwrap();
    assert_eq!(written, bytes);

    let mut rng = StdRng::seed_from_u64(1);
    let features = random_features(&mut rng, 40, Inner::PADDED_INPUT_DIMS);
    let mut scratch_a = ScratchBuffer::<Inner>::new();
    let mut scratch_b = ScratchBuffer::<Inner>::new();
    assert_eq!(
        loaded.propagate(&features, scratch_a.as_mut_slice()),
        direct.propagate(&features, scratch_b.as_mut_slice())
    );
}

#[test]
fn truncated_streams_fail_to_load() {
    let (biases, weights) = random_parameters(7, 24, 40, Inner::PADDED_INPUT_DIMS);
    let bytes = encode_affine(&biases, &weights);
    let biases_len = biases.len() * 4;

    for len in [0, 1, biases_len - 1, biases_len, biases_len + 1, bytes.len() - 1] {
        let mut stage = Inner::default();
        let err = stage.read_parameters(&mut &bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof, "length {len}");
        assert!(stage.biases().iter().all(|&b| b == 0), "length {len}");
        assert!(stage.weights().iter().all(|&w| w == 0), "length {len}");
    }
}

#[test]
fn upstream_failure_stops_the_chain() {
    let (inner_biases, inner_weights) = random_parameters(3, 24, 24, 64);
    let bytes = encode_affine(&inner_biases, &inner_weights[..10]);

    let (outer_biases, outer_weights) = random_parameters(4, 4, 24, Outer::PADDED_INPUT_DIMS);
    let mut outer = Outer::from_parameters(Requantize::default(), &outer_biases, &outer_weights);

    assert!(outer.read_parameters(&mut bytes.as_slice()).is_err());
    assert_eq!(outer.biases(), outer_biases.as_slice());
    assert_eq!(outer.weights(), outer_weights.as_slice());
}

#[test]
fn chain_reads_innermost_first() {
    let (inner_biases, inner_weights) = random_parameters(5, 24, 40, Inner::PADDED_INPUT_DIMS);
    let (outer_biases, outer_weights) = random_parameters(6, 4, 24, Outer::PADDED_INPUT_DIMS);
    let mut bytes = encode_affine(&inner_biases, &inner_weights);
    bytes.extend(encode_affine(&outer_biases, &outer_weights));

    let mut outer = Outer::default();
    outer.read_parameters(&mut bytes.as_slice()).unwrap();
    assert_eq!(outer.biases(), outer_biases.as_slice());
    assert_eq!(outer.previous().previous().biases(), inner_biases.as_slice());

    let mut written = Vec::new();
    outer.write_parameters(&mut written).unwrap();
    assert_eq!(written, bytes);
}

#[test]
fn structural_hash_tracks_shape() {
    assert_eq!(Inner::HASH_VALUE, Inner::hash_value());
    assert_eq!(Inner::hash_value(), Inner::hash_value());

    assert_ne!(
        AffineTransform::<InputSlice<40>, 24>::HASH_VALUE,
        AffineTransform::<InputSlice<40>, 25>::HASH_VALUE
    );
    assert_ne!(
        AffineTransform::<InputSlice<40>, 24>::HASH_VALUE,
        AffineTransform::<InputSlice<41>, 24>::HASH_VALUE
    );
    assert_ne!(
        AffineTransform::<InputSlice<40, 0>, 24>::HASH_VALUE,
        AffineTransform::<InputSlice<40, 8>, 24>::HASH_VALUE
    );
    assert_ne!(Outer::HASH_VALUE, AffineTransform::<Requantize<Inner>, 5>::HASH_VALUE);

    // Bit 0 of the upstream hash moves to bit 31.
    let upstream = Requantize::<Inner>::HASH_VALUE;
    let expected = 0xCC03_DAE4u32.wrapping_add(4) ^ (upstream >> 1) ^ (upstream << 31);
    assert_eq!(Outer::HASH_VALUE, expected);
}

#[test]
fn structure_string_renders_chain() {
    assert_eq!(
        Outer::structure_string(),
        "AffineTransform[4<-24](Requantize[24](AffineTransform[24<-40](InputSlice[40(0:40)])))"
    );
}

#[test]
fn buffer_size_sums_cache_aligned_regions() {
    assert_eq!(Inner::SELF_BUFFER_SIZE, 128);
    assert_eq!(Requantize::<Inner>::SELF_BUFFER_SIZE, 64);
    assert_eq!(Outer::SELF_BUFFER_SIZE, 64);
    assert_eq!(Outer::BUFFER_SIZE, 64 + 64 + 128);
    assert_eq!(ScratchBuffer::<Outer>::SIZE % CACHE_LINE_SIZE, 0);
}

#[test]
fn stages_write_only_their_own_region() {
    let (inner_biases, inner_weights) = random_parameters(8, 24, 40, Inner::PADDED_INPUT_DIMS);
    let (outer_biases, outer_weights) = random_parameters(9, 4, 24, Outer::PADDED_INPUT_DIMS);
    let inner = Inner::from_parameters(InputSlice, &inner_biases, &inner_weights);
    let outer = Outer::from_parameters(Requantize::new(inner), &outer_biases, &outer_weights);

    let mut rng = StdRng::seed_from_u64(10);
    let features = random_features(&mut rng, 40, Inner::PADDED_INPUT_DIMS);

    let outer_end = Outer::SELF_BUFFER_SIZE;
    let requantize_end = outer_end + Requantize::<Inner>::SELF_BUFFER_SIZE;
    let inner_used = requantize_end + 24 * 4;

    let mut scratch = ScratchBuffer::<Outer>::new();
    scratch.fill(POISON);

    // Innermost stage alone.
    let inner_output = outer
        .previous()
        .previous()
        .propagate(&features, &mut scratch.as_mut_slice()[requantize_end..])
        .to_vec();
    let bytes = scratch.as_slice();
    assert!(bytes[..requantize_end].iter().all(|&b| b == POISON));
    assert!(bytes[inner_used..].iter().all(|&b| b == POISON));
    let stored: &[i32] = bytemuck::cast_slice(&bytes[requantize_end..inner_used]);
    assert_eq!(stored, inner_output.as_slice());

    // Whole chain.
    scratch.fill(POISON);
    let output = outer.propagate(&features, scratch.as_mut_slice()).to_vec();
    let bytes = scratch.as_slice();
    let stored: &[i32] = bytemuck::cast_slice(&bytes[..4 * 4]);
    assert_eq!(stored, output.as_slice());
    assert!(bytes[4 * 4..outer_end].iter().all(|&b| b == POISON));
    assert!(bytes[inner_used..].iter().all(|&b| b == POISON));

    // Requantized activations land in their own region, padding zeroed.
    let activations = &bytes[outer_end..outer_end + 32];
    assert!(activations[24..].iter().all(|&b| b == 0));
    for (i, &a) in activations[..24].iter().enumerate() {
        assert_eq!(a, (inner_output[i] >> 6).clamp(0, 127) as u8);
    }
}

#[test]
fn chain_output_matches_manual_composition() {
    let (inner_biases, inner_weights) = random_parameters(11, 24, 40, Inner::PADDED_INPUT_DIMS);
    let (outer_biases, outer_weights) = random_parameters(12, 4, 24, Outer::PADDED_INPUT_DIMS);
    let inner = Inner::from_parameters(InputSlice, &inner_biases, &inner_weights);
    let outer = Outer::from_parameters(Requantize::new(inner), &outer_biases, &outer_weights);

    let mut rng = StdRng::seed_from_u64(13);
    let features = random_features(&mut rng, 40, Inner::PADDED_INPUT_DIMS);

    let hidden: Vec<u8> = (0..24)
        .map(|i| {
            let row = &inner_weights[i * 64..i * 64 + 40];
            let sum = inner_biases[i]
                + row
                    .iter()
                    .zip(&features)
                    .map(|(&w, &x)| w as i32 * x as i32)
                    .sum::<i32>();
            (sum >> 6).clamp(0, 127) as u8
        })
        .collect();
    let expected: Vec<i32> = (0..4)
        .map(|i| {
            let row = &outer_weights[i * 32..i * 32 + 24];
            outer_biases[i]
                + row
                    .iter()
                    .zip(&hidden)
                    .map(|(&w, &x)| w as i32 * x as i32)
                    .sum::<i32>()
        })
        .collect();

    let mut scratch = ScratchBuffer::<Outer>::new();
    assert_eq!(outer.propagate(&features, scratch.as_mut_slice()), expected.as_slice());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "input padding must be zero")]
fn nonzero_input_padding_is_caught() {
    let stage = Inner::default();
    let features = vec![1u8; Inner::PADDED_INPUT_DIMS];
    let mut scratch = ScratchBuffer::<Inner>::new();
    stage.propagate(&features, scratch.as_mut_slice());
}
