//! 512-bit kernels, with and without AVX-512 VNNI.

use std::arch::x86_64::*;

use super::avx2::{m256_hadd, mm256_dpbusd_epi32};
use super::check_shapes;

const CHUNK: usize = 64;

/// Emulates `VPDPBUSD` with the split high-bit sequence, so no lane saturates.
#[target_feature(enable = "avx512bw")]
#[inline]
fn mm512_dpbusd_epi32(acc: __m512i, a: __m512i, b: __m512i) -> __m512i {
    let highest_bit = _mm512_set1_epi8(0x80u8 as i8);
    let ones16 = _mm512_set1_epi16(1);
    let a_low7 = _mm512_andnot_si512(highest_bit, a);
    let a_msb = _mm512_and_si512(a, highest_bit);
    let low7_i16 = _mm512_maddubs_epi16(a_low7, b);
    let msb_i16 = _mm512_maddubs_epi16(a_msb, b);
    let low7_i32 = _mm512_madd_epi16(low7_i16, ones16);
    let msb_i32 = _mm512_madd_epi16(msb_i16, ones16);
    _mm512_add_epi32(acc, _mm512_add_epi32(low7_i32, msb_i32))
}

#[target_feature(enable = "avx512bw,avx512vnni")]
#[inline]
fn mm512_dpbusd_vnni(acc: __m512i, a: __m512i, b: __m512i) -> __m512i {
    _mm512_dpbusd_epi32(acc, a, b)
}

macro_rules! avx512_kernel {
    ($fn_name:ident, $target_feature:literal, $dpbusd:ident) => {
        #[target_feature(enable = $target_feature)]
        pub fn $fn_name(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
            check_shapes(biases, weights, input, output);

            let padded = input.len();
            let num_chunks = padded / CHUNK;
            // The padded width is only guaranteed to be a multiple of 32.
            let has_tail = padded % CHUNK != 0;
            let input_ptr = input.as_ptr() as *const i8;

            for (i, (out, &bias)) in output.iter_mut().zip(biases).enumerate() {
                let mut acc = _mm512_setzero_si512();
                let mut tail = _mm256_setzero_si256();

                // SAFETY: check_shapes guarantees the row and the input both span `padded` bytes.
                unsafe {
                    let row_ptr = weights.as_ptr().add(i * padded);
                    for j in 0..num_chunks {
                        let x = _mm512_loadu_epi8(input_ptr.add(j * CHUNK));
                        let w = _mm512_loadu_epi8(row_ptr.add(j * CHUNK));
                        acc = $dpbusd(acc, x, w);
                    }
                    if has_tail {
                        let offset = num_chunks * CHUNK;
                        let x = _mm256_loadu_si256(input_ptr.add(offset) as *const __m256i);
                        let w = _mm256_loadu_si256(row_ptr.add(offset) as *const __m256i);
                        tail = mm256_dpbusd_epi32(tail, x, w);
                    }
                }

                *out = _mm512_reduce_add_epi32(acc)
                    .wrapping_add(m256_hadd(tail))
                    .wrapping_add(bias);
            }
        }
    };
}

avx512_kernel!(affine_transform, "avx512bw,avx2", mm512_dpbusd_epi32);
avx512_kernel!(
    affine_transform_vnni,
    "avx512bw,avx512vnni,avx2",
    mm512_dpbusd_vnni
);
