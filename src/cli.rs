//! CLI argument parsing for basset.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "basset")]
#[command(version)]
#[command(
    about = "Record a compilation database by tracing a build command",
    long_about = None
)]
pub struct Cli {
    /// Emit per-event diagnostics on stderr
    #[arg(long, overrides_with = "no_verbose")]
    pub verbose: bool,

    /// Suppress diagnostics (the default); the last of
    /// --verbose/--no-verbose wins
    #[arg(long, overrides_with = "verbose")]
    pub no_verbose: bool,

    /// Compilation database to merge into and write
    #[arg(
        long,
        value_name = "PATH",
        default_value = "compile_commands.json"
    )]
    pub output: PathBuf,

    /// Build command to trace (everything after --)
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
