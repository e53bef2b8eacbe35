//! Matrix-vector kernels for the affine transform.
//!
//! Every kernel computes, for each output row `i`,
//! `output[i] = biases[i] + Σ_j weights[i * P + j] * input[j]` with `P = input.len()`,
//! multiplying unsigned 8-bit activations by signed 8-bit weights and accumulating
//! in wrapping 32-bit arithmetic. All kernels return identical results for every input.
//!
//! The kernel used by [`affine_transform`] is fixed when the crate is compiled:
//! the widest instruction set enabled through `target_feature` wins, and the
//! `scalar` cargo feature forces the portable loop. The x86_64 kernels are always
//! compiled, so [`compiled_kernels`] can offer every kernel the running CPU
//! supports for benchmarks and differential tests.

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod ssse3;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "x86_64")]
pub mod avx512;

#[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
pub mod neon;

use cfg_if::cfg_if;

use crate::constants::MAX_SIMD_WIDTH;

/// Signature shared by every kernel. Vector kernels are only sound on CPUs
/// with their instruction set.
pub type KernelFn = unsafe fn(&[i32], &[i8], &[u8], &mut [i32]);

/// A kernel the running CPU can execute.
#[derive(Clone, Copy)]
pub struct Kernel {
    name: &'static str,
    run: KernelFn,
}

impl Kernel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the kernel. See [`affine_transform`] for the arguments.
    ///
    /// # Panics
    ///
    /// Panics if the slice lengths disagree.
    #[inline]
    pub fn run(&self, biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
        // SAFETY: a Kernel is only built by compiled_kernels after the CPU
        // reported the instruction set it needs.
        unsafe { (self.run)(biases, weights, input, output) }
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Kernel").field(&self.name).finish()
    }
}

cfg_if! {
    if #[cfg(feature = "scalar")] {
        use self::scalar::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "scalar";
    } else if #[cfg(all(
        target_arch = "x86_64",
        target_feature = "avx512bw",
        target_feature = "avx512vnni"
    ))] {
        use self::avx512::affine_transform_vnni as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "avx512-vnni";
    } else if #[cfg(all(target_arch = "x86_64", target_feature = "avx512bw"))] {
        use self::avx512::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "avx512";
    } else if #[cfg(all(target_arch = "x86_64", target_feature = "avx2"))] {
        use self::avx2::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "avx2";
    } else if #[cfg(all(target_arch = "x86_64", target_feature = "ssse3"))] {
        use self::ssse3::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "ssse3";
    } else if #[cfg(all(target_arch = "aarch64", target_feature = "neon"))] {
        use self::neon::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "neon";
    } else {
        use self::scalar::affine_transform as active;
        /// Name of the kernel selected for this build.
        pub const ACTIVE_KERNEL: &str = "scalar";
    }
}

/// Runs the kernel selected for this build.
///
/// # Arguments
///
/// * `biases` - One bias per output.
/// * `weights` - Row-major `output.len() × input.len()` matrix.
/// * `input` - Padded activations; `input.len()` must be a multiple of [`MAX_SIMD_WIDTH`].
/// * `output` - Destination, one value per row.
///
/// # Panics
///
/// Panics if the slice lengths disagree.
#[inline(always)]
#[allow(unused_unsafe)]
pub fn affine_transform(biases: &[i32], weights: &[i8], input: &[u8], output: &mut [i32]) {
    // SAFETY: the selected kernel needs no instruction set beyond what this
    // build already targets.
    unsafe { active(biases, weights, input, output) }
}

/// Lists every kernel the running CPU can execute, the portable one first.
pub fn compiled_kernels() -> Vec<Kernel> {
    #[allow(unused_mut)]
    let mut kernels = vec![Kernel {
        name: "scalar",
        run: scalar::affine_transform,
    }];

    #[cfg(target_arch = "x86_64")]
    {
        use std::arch::is_x86_feature_detected;

        if is_x86_feature_detected!("ssse3") {
            kernels.push(Kernel {
                name: "ssse3",
                run: ssse3::affine_transform,
            });
        }
        if is_x86_feature_detected!("avx2") {
            kernels.push(Kernel {
                name: "avx2",
                run: avx2::affine_transform,
            });
        }
        if is_x86_feature_detected!("avx512bw") && is_x86_feature_detected!("avx2") {
            kernels.push(Kernel {
                name: "avx512",
                run: avx512::affine_transform,
            });
            if is_x86_feature_detected!("avx512vnni") {
                kernels.push(Kernel {
                    name: "avx512-vnni",
                    run: avx512::affine_transform_vnni,
                });
            }
        }
    }

    #[cfg(all(target_arch = "aarch64", target_feature = "neon"))]
    kernels.push(Kernel {
        name: "neon",
        run: neon::affine_transform,
    });

    kernels
}

/// Validates the shapes handed to a kernel.
///
/// The vector kernels read `input.len()` bytes per row through raw pointers, so
/// these checks are what keeps them in bounds.
#[inline(always)]
fn check_shapes(biases: &[i32], weights: &[i8], input: &[u8], output: &[i32]) {
    assert_eq!(biases.len(), output.len(), "one bias per output");
    assert_eq!(
        weights.len(),
        output.len() * input.len(),
        "weight matrix must be outputs × padded inputs"
    );
    assert_eq!(
        input.len() % MAX_SIMD_WIDTH,
        0,
        "padded input must be a multiple of {MAX_SIMD_WIDTH}"
    );
}
