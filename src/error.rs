use std::sync::OnceLock;

use colored::*;
use miette::Diagnostic;
use thiserror::Error;

use crate::{client::ClientError, config::ConfigError};

static HELP: OnceLock<String> = OnceLock::new();

fn get_help() -> &'static str {
    HELP.get_or_init(|| {
        format!(
            "\n{}\n\n ► {}\n{}\n\n ► {}\n{}",
            "Could not reach Kinesis?".cyan().bold(),
            "Check your credentials:".green(),
            "aws sts get-caller-identity".bold(),
            "Point at a local emulator:".green(),
            "ktui config set endpoint_url http://localhost:4566".bold(),
        )
    })
}

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(help("Run `ktui config path` to locate the configuration file."))]
    Config(#[from] ConfigError),

    #[error("Failed to create Kinesis client: {0}")]
    #[diagnostic(help("{}", get_help()))]
    ClientInit(ClientError),

    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        source: std::io::Error,
    },
}
