use std::process;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use basset::cli::Cli;
use basset::tracer::{self, TracerConfig};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = TracerConfig {
        output: cli.output,
        command: cli.command,
    };

    match tracer::trace_build(&config) {
        Ok(status) => tracer::propagate(status),
        Err(err) => {
            eprintln!("basset: {err:#}");
            process::exit(1);
        }
    }
}
