//! Portable kernel. This is the reference every vector kernel is tested against.

use super::check_shapes;

/// Row-by-row dot product in plain integer arithmetic.
pub fn affine_transform(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
    check_shapes(biases, weights, input, output);

    let padded = input.len();
    if padded == 0 {
        output.copy_from_slice(biases);
        return;
    }

    for ((out, &bias), row) in output.iter_mut().zip(biases).zip(weights.chunks_exact(padded)) {
        *out = row
            .iter()
            .zip(input)
            .fold(bias, |acc, (&w, &x)| acc.wrapping_add(w as i32 * x as i32));
    }
}
