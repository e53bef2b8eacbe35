//! Quantized neural-network evaluator built from statically composed stages.
//!
//! A network is a chain of [`Layer`](layers::Layer) implementations nested by
//! value, e.g. `AffineTransform<InputSlice<512>, 32>`. Every shape-derived
//! quantity (scratch size, structural hash) is an associated constant, so the
//! whole chain is resolved at compile time.

pub mod architecture;
pub mod buffer;
pub mod constants;
pub mod kernel;
pub mod layers;
pub mod network;
pub mod util;

pub use buffer::ScratchBuffer;
pub use layers::{AffineTransform, InputSlice, Layer};
pub use network::{Error, Network};
