mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect, verify and run quantized network files")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: SubCommands,
}

#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Print the compiled topology, its hash and the selected kernel
    Info,
    /// Verify that a network file matches the compiled topology
    Check {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Evaluate random feature vectors with a network file
    Eval {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        #[arg(long, default_value = "0")]
        seed: u64,

        /// Number of feature vectors to evaluate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },
    /// Write a network file with random parameters
    Generate {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        output: PathBuf,

        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long, default_value = "random network")]
        description: String,

        /// zstd compression level; omit to write an uncompressed file
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=22))]
        compress: Option<i32>,
    },
}

fn main() {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match args.command {
        SubCommands::Info => {
            commands::info();
            Ok(())
        }
        SubCommands::Check { file } => commands::check(&file),
        SubCommands::Eval { file, seed, count } => commands::eval(&file, seed, count),
        SubCommands::Generate {
            output,
            seed,
            description,
            compress,
        } => commands::generate(&output, seed, &description, compress),
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
