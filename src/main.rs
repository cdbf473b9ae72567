use std::{fs::OpenOptions, path::Path, sync::Mutex};

use clap::Parser;
use colored::*;
use tabled::{Table, Tabled, settings::Style};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cli::{Cli, Command, ConfigActions},
    config::{config_path, load_config, load_file_config, save_config},
    error::CliError,
};

mod cli;
mod client;
mod config;
mod error;
mod tui;

#[derive(Tabled)]
struct ConfigRow {
    key: String,
    value: String,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    run().await?;
    Ok(())
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    init_tracing(cli.log_file.as_deref())?;

    let config_path = config_path()?;

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigActions::Set { key, value } => {
                let mut cfg = load_file_config(&config_path)?;
                cfg.set(key, &value)?;
                save_config(&config_path, &cfg)?;
                println!("{}", format!("✓ {key} set successfully").green().bold());
            }
            ConfigActions::Get { key } => {
                let cfg = load_file_config(&config_path)?;
                match cfg.get(key) {
                    Some(value) => println!("{value}"),
                    None => eprintln!("{}", format!("{key} is not set").yellow()),
                }
            }
            ConfigActions::Unset { key } => {
                let mut cfg = load_file_config(&config_path)?;
                cfg.unset(key);
                save_config(&config_path, &cfg)?;
                println!("{}", format!("✓ {key} unset successfully").green().bold());
            }
            ConfigActions::List => {
                let cfg = load_file_config(&config_path)?;
                let rows = cfg.entries().into_iter().map(|(key, value)| ConfigRow {
                    key: key.to_string(),
                    value: value.unwrap_or_else(|| "-".to_string()),
                });
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
            ConfigActions::Path => {
                println!("{}", config_path.display());
            }
        },
        None => {
            let (client_settings, browse_settings) =
                load_config(&config_path)?.resolve(cli.browse);
            tracing::info!(
                region = ?client_settings.region,
                endpoint = ?client_settings.endpoint_url,
                pages = browse_settings.ingest.page_budget,
                "starting dashboard"
            );
            tui::run(client_settings, browse_settings).await?;
        }
    }

    Ok(())
}

/// Tracing goes to a file when one is given; the dashboard owns the terminal.
fn init_tracing(log_file: Option<&Path>) -> Result<(), CliError> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CliError::LogFile {
            path: path.display().to_string(),
            source,
        })?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    Ok(())
}
