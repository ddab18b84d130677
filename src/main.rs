//! Pushbridge CLI - inspect configuration and replay delivery scenarios.
//!
//! This is the main binary entry point. See the `pushbridge` library
//! for the core functionality.

mod simulate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pushbridge::Config;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI
#[derive(Parser)]
#[command(name = "pushbridge")]
#[command(version = VERSION)]
#[command(about = "Push notification delivery bridge")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration
    Config {
        /// Read this file instead of the config directory (no env overrides)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Replay a JSON scenario and print what the application receives
    Simulate {
        /// Path to the scenario file
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { file } => {
            let config = match file {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Simulate { scenario } => {
            let scenario = simulate::Scenario::load(&scenario)?;
            let config = Config::load()?;
            let runtime = tokio::runtime::Runtime::new()?;
            let mut stdout = std::io::stdout().lock();
            runtime.block_on(simulate::run(scenario, config, &mut stdout))?;
        }
    }

    Ok(())
}
