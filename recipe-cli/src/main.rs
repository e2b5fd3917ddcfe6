mod cli;
mod commands;
mod config;
mod error;
mod output;

use crate::{
    cli::{Args, Commands},
    commands::{CommandExecutor, ListOptions},
    config::AppConfig,
    error::Result,
};
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use std::process;
use tracing::{Level, debug, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose, args.quiet, args.json_logs);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        #[cfg(feature = "colored-output")]
        {
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
        #[cfg(not(feature = "colored-output"))]
        {
            eprintln!("Error: {}", e);
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    debug!(?config, "Loaded configuration");

    match args.command {
        Commands::Config { show, reset } => {
            if reset {
                let path = AppConfig::reset(args.config.as_deref())?;
                println!("✓ Configuration reset to defaults ({})", path.display());
            } else if show {
                println!("{}", config.show()?);
            } else {
                println!(
                    "Use --show to display current configuration or --reset to reset to defaults"
                );
            }
            Ok(())
        }
        Commands::Login { username, password } => {
            CommandExecutor::new(config, args.base_url)?
                .login(&username, &password)
                .await
        }
        Commands::Logout => CommandExecutor::new(config, args.base_url)?.logout(),
        Commands::List {
            list,
            query,
            user_id,
            pages,
            page_size,
            sort,
            output,
        } => {
            CommandExecutor::new(config, args.base_url)?
                .list(ListOptions {
                    kind: list,
                    query,
                    user_id,
                    pages,
                    page_size,
                    sort,
                    output,
                })
                .await
        }
    }
}

fn init_logging(verbose: bool, quiet: bool, json: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("recipe_feed=debug,recipe_cli=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("recipe_feed=info,recipe_cli=info"))
            .add_directive(Level::WARN.into())
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(verbose)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
