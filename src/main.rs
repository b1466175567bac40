//! Diagnosis pipeline - Main Entry Point

use clap::Parser;
use diagnosis_pipeline::cli::{cmd_explore, cmd_predict, cmd_run, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "diagnosis_pipeline=debug"
    } else {
        "diagnosis_pipeline=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, data, output, synthetic, format } => {
            cmd_run(config.as_deref(), data.as_deref(), output.as_deref(), synthetic, format.as_deref())?;
        }
        Commands::Explore { config, data, synthetic } => {
            cmd_explore(config.as_deref(), data.as_deref(), synthetic)?;
        }
        Commands::Predict { model, data, output } => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
    }

    Ok(())
}
