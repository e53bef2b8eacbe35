//! 128-bit kernel built on `pmaddubsw`.

use std::arch::x86_64::*;

use super::check_shapes;

const CHUNK: usize = 16;

/// Multiply unsigned 8-bit lanes by signed 8-bit lanes and accumulate into 32-bit results.
///
/// `pmaddubsw` saturates when both products of a pair are large, so the high bit
/// of each activation is multiplied separately and the two partial sums are added
/// in 32 bits. Neither half can reach the 16-bit limit.
#[target_feature(enable = "ssse3")]
#[inline]
fn mm_dpbusd_epi32(acc: __m128i, a: __m128i, b: __m128i) -> __m128i {
    let highest_bit = _mm_set1_epi8(0x80u8 as i8);
    let ones16 = _mm_set1_epi16(1);
    let a_low7 = _mm_andnot_si128(highest_bit, a);
    let a_msb = _mm_and_si128(a, highest_bit);
    let low7_i32 = _mm_madd_epi16(_mm_maddubs_epi16(a_low7, b), ones16);
    let msb_i32 = _mm_madd_epi16(_mm_maddubs_epi16(a_msb, b), ones16);
    _mm_add_epi32(acc, _mm_add_epi32(low7_i32, msb_i32))
}

#[target_feature(enable = "ssse3")]
#[inline]
fn mm_hadd(sum: __m128i) -> i32 {
    let sum = _mm_add_epi32(sum, _mm_shuffle_epi32(sum, 0b01_00_11_10));
    let sum = _mm_add_epi32(sum, _mm_shuffle_epi32(sum, 0b10_11_00_01));
    _mm_cvtsi128_si32(sum)
}

#[target_feature(enable = "ssse3")]
pub fn affine_transform(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
    check_shapes(biases, weights, input, output);

    let padded = input.len();
    let num_chunks = padded / CHUNK;
    let input_ptr = input.as_ptr() as *const __m128i;

    for (i, (out, &bias)) in output.iter_mut().zip(biases).enumerate() {
        let mut sum = _mm_setzero_si128();
        // SAFETY: check_shapes guarantees the row and the input both span `padded` bytes.
        unsafe {
            let row_ptr = weights.as_ptr().add(i * padded) as *const __m128i;
            for j in 0..num_chunks {
                let x = _mm_loadu_si128(input_ptr.add(j));
                let w = _mm_loadu_si128(row_ptr.add(j));
                sum = mm_dpbusd_epi32(sum, x, w);
            }
        }
        *out = mm_hadd(sum).wrapping_add(bias);
    }
}
