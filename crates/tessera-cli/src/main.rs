mod commands;

use clap::{Parser, Subcommand};
use commands::EXIT_FAILURE;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "tessera",
    version,
    about = "Reproducible build plans and multi-platform package exposure"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse the manifest and verify the lock file against it.
    Verify {
        /// Path to the manifest TOML file.
        #[arg(long, default_value = "tessera.toml")]
        manifest: PathBuf,
        /// Path to the lock file.
        #[arg(long, default_value = "tessera.lock")]
        lock: PathBuf,
    },
    /// Derive and print the build plan for one platform.
    Plan {
        /// Target platform identifier.
        #[arg(long)]
        platform: String,
        /// Path to the manifest TOML file.
        #[arg(long, default_value = "tessera.toml")]
        manifest: PathBuf,
        /// Path to the lock file.
        #[arg(long, default_value = "tessera.lock")]
        lock: PathBuf,
        /// Source directory to hash (defaults to the manifest's directory).
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
    /// List the registered target platforms.
    Platforms,
    /// Materialize the package set's outputs for one platform (dry run).
    Expose {
        /// Target platform identifier.
        #[arg(long)]
        platform: String,
        /// Path to the manifest TOML file.
        #[arg(long, default_value = "tessera.toml")]
        manifest: PathBuf,
        /// Path to the lock file.
        #[arg(long, default_value = "tessera.lock")]
        lock: PathBuf,
        /// Source directory to hash (defaults to the manifest's directory).
        #[arg(long)]
        source_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TESSERA_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Verify { manifest, lock } => commands::verify::run(&manifest, &lock, json),
        Commands::Plan {
            platform,
            manifest,
            lock,
            source_dir,
        } => commands::plan::run(&platform, &manifest, &lock, source_dir.as_deref(), json),
        Commands::Platforms => commands::platforms::run(json),
        Commands::Expose {
            platform,
            manifest,
            lock,
            source_dir,
        } => commands::expose::run(&platform, &manifest, &lock, source_dir.as_deref(), json),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
