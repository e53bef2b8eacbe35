use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;
use nnue_core::architecture::{
    Architecture, InputLayer, OUTPUT_DIMS, PADDED_FEATURE_DIMS, TRANSFORMED_FEATURE_DIMS,
};
use nnue_core::constants::FILE_VERSION;
use nnue_core::network::read_header;
use nnue_core::{Layer, Network, ScratchBuffer, kernel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn info() {
    println!("structure:   {}", Architecture::structure_string());
    println!("hash:        {:#010x}", Architecture::HASH_VALUE);
    println!("scratch:     {} bytes", ScratchBuffer::<Architecture>::SIZE);
    println!("file version {:#010x}", FILE_VERSION);

    let compiled: Vec<&str> = kernel::compiled_kernels().iter().map(|k| k.name()).collect();
    println!("kernel:      {} (compiled: {})", kernel::ACTIVE_KERNEL, compiled.join(", "));
}

pub fn check(path: &Path) -> Result<()> {
    let network = load(path)?;
    println!("{}: ok", path.display());
    println!("description: {}", network.description());
    println!("structure:   {}", Architecture::structure_string());
    Ok(())
}

pub fn eval(path: &Path, seed: u64, count: usize) -> Result<()> {
    let network = load(path)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scratch = ScratchBuffer::new();
    let mut features = vec![0u8; PADDED_FEATURE_DIMS];

    for i in 0..count {
        for x in &mut features[..TRANSFORMED_FEATURE_DIMS] {
            *x = rng.random_range(0..128);
        }
        let output = network.evaluate(&features, &mut scratch);
        let rendered: Vec<String> = output.iter().map(|v| v.to_string()).collect();
        println!("{i}: {}", rendered.join(" "));
    }
    Ok(())
}

pub fn generate(path: &Path, seed: u64, description: &str, compress: Option<i32>) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut layers = Architecture::new(InputLayer::default());
    {
        let mut view = layers.training_view();
        for bias in view.biases_mut() {
            *bias = rng.random_range(-4096..4096);
        }
        for i in 0..OUTPUT_DIMS {
            for w in view.row_mut(i) {
                *w = rng.random_range(-64..64);
            }
        }
    }

    let network = Network::new(layers, description);
    network
        .save(path, compress)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(
        "wrote {} ({})",
        path.display(),
        if compress.is_some() { "zstd" } else { "raw" }
    );
    Ok(())
}

fn load(path: &Path) -> Result<Network<Architecture>> {
    match Network::<Architecture>::load(path) {
        Ok(network) => Ok(network),
        Err(nnue_core::Error::Hash { expected, found }) => {
            let detail = describe_header(path).unwrap_or_default();
            bail!(
                "{} was built for a different topology \
                 (hash {found:#010x}, expected {expected:#010x}){detail}",
                path.display()
            )
        }
        Err(err) => Err(err).with_context(|| format!("failed to load {}", path.display())),
    }
}

/// Best-effort description of a rejected file, read from an uncompressed header.
fn describe_header(path: &Path) -> Option<String> {
    let mut reader = BufReader::new(File::open(path).ok()?);
    let header = read_header(&mut reader).ok()?;
    (!header.description.is_empty()).then(|| format!(": \"{}\"", header.description))
}
