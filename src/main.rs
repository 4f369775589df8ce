mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{BuildOverrides, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pyseal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            path,
            config,
            build_dir,
            suicide,
            respect_gitignore,
            python,
            dry_run,
        } => {
            let overrides = BuildOverrides {
                build_dir,
                suicide,
                respect_gitignore,
                python,
            };
            cli::build(&path, config.as_deref(), overrides, dry_run)?;
        }
        Commands::Plan {
            path,
            config,
            format,
        } => {
            cli::plan(&path, config.as_deref(), &format)?;
        }
        Commands::Check { path, python } => {
            cli::check(&path, python)?;
        }
    }

    Ok(())
}
