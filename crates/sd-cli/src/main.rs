use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sd_cli::commands::{batch, convert, detect, formats, merge};
use sd_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init so a subscriber installed by a test harness is not an error
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let registry = sd_formats::default_registry().context("failed to register formats")?;
    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    match &cli.command {
        Some(Commands::Formats) => formats::run(&mut writer, &registry)?,
        Some(Commands::Detect { file }) => detect::run(&mut writer, &registry, &config, file)?,
        Some(Commands::Convert { file, to, output }) => {
            convert::run(&mut writer, &registry, &config, file, to.as_deref(), *output)?;
        }
        Some(Commands::Merge { files, output }) => {
            merge::run(&mut writer, &registry, &config, files, *output)?;
        }
        Some(Commands::Batch { files, to, out_dir }) => {
            batch::run(&mut writer, &registry, &config, files, to, out_dir.as_deref())?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
