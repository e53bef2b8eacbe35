//! Global constants

/// Size of a CPU cache line in bytes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Width in bytes that every padded input dimension is rounded up to.
///
/// This is part of the parameter file layout: weight rows are stored with
/// this padding, so changing it breaks compatibility with existing files.
pub const MAX_SIMD_WIDTH: usize = 32;

/// Version tag written at the start of every network file.
pub const FILE_VERSION: u32 = 0x7AF3_2F16;

/// Upper bound on the description embedded in a network file header.
pub const MAX_DESCRIPTION_LEN: usize = 1 << 20;
