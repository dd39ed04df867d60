mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stabkit", about = "Motion tracking and warp-field stabilization")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print or save the default tracker config
    Config(commands::config::ConfigArgs),
    /// Track motion through an image sequence and report per-frame quality
    Track(commands::track::TrackArgs),
    /// Stabilize an image sequence by warping out its high-frequency motion
    Align(commands::align::AlignArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Track(args) => commands::track::run(args),
        Commands::Align(args) => commands::align::run(args),
    }
}
