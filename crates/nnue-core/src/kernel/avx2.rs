//! 256-bit kernel.

use std::arch::x86_64::*;

use super::check_shapes;

const CHUNK: usize = 32;

/// Multiply unsigned 8-bit lanes by signed 8-bit lanes and accumulate into 32-bit results.
/// Emulates `VPDPBUSD` without the 16-bit saturation of a bare `vpmaddubsw`.
#[target_feature(enable = "avx2")]
#[inline]
pub(super) fn mm256_dpbusd_epi32(acc: __m256i, a: __m256i, b: __m256i) -> __m256i {
    let highest_bit = _mm256_set1_epi8(0x80u8 as i8);
    let ones16 = _mm256_set1_epi16(1);
    let a_low7 = _mm256_andnot_si256(highest_bit, a);
    let a_msb = _mm256_and_si256(a, highest_bit);
    let low7_i16 = _mm256_maddubs_epi16(a_low7, b);
    let msb_i16 = _mm256_maddubs_epi16(a_msb, b);
    let low7_i32 = _mm256_madd_epi16(low7_i16, ones16);
    let msb_i32 = _mm256_madd_epi16(msb_i16, ones16);
    _mm256_add_epi32(acc, _mm256_add_epi32(low7_i32, msb_i32))
}

#[target_feature(enable = "avx2")]
#[inline]
pub(super) fn m256_hadd(sum_vec: __m256i) -> i32 {
    let mut sum128 = _mm_add_epi32(
        _mm256_castsi256_si128(sum_vec),
        _mm256_extracti128_si256(sum_vec, 1),
    );
    sum128 = _mm_add_epi32(sum128, _mm_shuffle_epi32(sum128, 0b01_00_11_10));
    sum128 = _mm_add_epi32(sum128, _mm_shuffle_epi32(sum128, 0b10_11_00_01));
    _mm_cvtsi128_si32(sum128)
}

#[target_feature(enable = "avx2")]
pub fn affine_transform(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
    check_shapes(biases, weights, input, output);

    let padded = input.len();
    let num_chunks = padded / CHUNK;
    let input_ptr = input.as_ptr() as *const __m256i;

    // Two accumulators per row to hide the add latency.
    for (i, (out, &bias)) in output.iter_mut().zip(biases).enumerate() {
        let mut acc0 = _mm256_setzero_si256();
        let mut acc1 = _mm256_setzero_si256();

        // SAFETY: check_shapes guarantees the row and the input both span `padded` bytes.
        unsafe {
            let row_ptr = weights.as_ptr().add(i * padded) as *const __m256i;
            let mut j = 0;
            while j + 2 <= num_chunks {
                acc0 = mm256_dpbusd_epi32(
                    acc0,
                    _mm256_loadu_si256(input_ptr.add(j)),
                    _mm256_loadu_si256(row_ptr.add(j)),
                );
                acc1 = mm256_dpbusd_epi32(
                    acc1,
                    _mm256_loadu_si256(input_ptr.add(j + 1)),
                    _mm256_loadu_si256(row_ptr.add(j + 1)),
                );
                j += 2;
            }
            if j < num_chunks {
                acc0 = mm256_dpbusd_epi32(
                    acc0,
                    _mm256_loadu_si256(input_ptr.add(j)),
                    _mm256_loadu_si256(row_ptr.add(j)),
                );
            }
        }

        *out = m256_hadd(_mm256_add_epi32(acc0, acc1)).wrapping_add(bias);
    }
}
