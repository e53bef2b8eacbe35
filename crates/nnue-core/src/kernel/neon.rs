//! 128-bit NEON kernel.
//!
//! Activations are widened to 16 bits as unsigned values before the multiply,
//! so the full `0..=255` range is handled exactly.

use std::arch::aarch64::*;

use super::check_shapes;

const CHUNK: usize = 16;

pub fn affine_transform(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
    check_shapes(biases, weights, input, output);

    let padded = input.len();
    let num_chunks = padded / CHUNK;

    for (i, (out, &bias)) in output.iter_mut().zip(biases).enumerate() {
        // SAFETY: check_shapes guarantees the row and the input both span `padded` bytes.
        unsafe {
            let row_ptr = weights.as_ptr().add(i * padded);
            let mut acc = vdupq_n_s32(0);
            for j in 0..num_chunks {
                let x = vld1q_u8(input.as_ptr().add(j * CHUNK));
                let w = vld1q_s8(row_ptr.add(j * CHUNK));

                let x_lo = vreinterpretq_s16_u16(vmovl_u8(vget_low_u8(x)));
                let x_hi = vreinterpretq_s16_u16(vmovl_high_u8(x));
                let w_lo = vmovl_s8(vget_low_s8(w));
                let w_hi = vmovl_high_s8(w);

                acc = vmlal_s16(acc, vget_low_s16(x_lo), vget_low_s16(w_lo));
                acc = vmlal_high_s16(acc, x_lo, w_lo);
                acc = vmlal_s16(acc, vget_low_s16(x_hi), vget_low_s16(w_hi));
                acc = vmlal_high_s16(acc, x_hi, w_hi);
            }
            *out = vaddvq_s32(acc).wrapping_add(bias);
        }
    }
}
