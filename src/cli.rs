use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::styling};

use crate::{client::StartPosition, config::ConfigKey, tui::ingest::RecordKey};

const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::Green.on_default().bold())
    .usage(styling::AnsiColor::Green.on_default().bold())
    .literal(styling::AnsiColor::Blue.on_default().bold())
    .placeholder(styling::AnsiColor::Cyan.on_default());

const USAGE: &str = color_print::cstr!(
    r#"
    <dim>$</dim> <bold>ktui --region eu-west-1</bold>
    <dim>$</dim> <bold>ktui --pages 20 --start-position latest --record-key sequence-number</bold>
    <dim>$</dim> <bold>ktui config set endpoint_url http://localhost:4566</bold>
    "#
);

#[derive(Parser, Debug)]
#[command(version, about, override_usage = USAGE, styles = STYLES)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub browse: BrowseArgs,

    /// Append tracing output to this file.
    #[arg(long, global = true, env = "KTUI_LOG_FILE", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage ktui configuration
    Config {
        #[command(subcommand)]
        action: ConfigActions,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigActions {
    /// Set a configuration value
    Set {
        key: ConfigKey,
        value: String,
    },

    /// Print a configuration value
    Get { key: ConfigKey },

    /// Remove a configuration value
    Unset { key: ConfigKey },

    /// Print every configuration value
    List,

    /// Print the configuration file path
    Path,
}

/// Flags overriding configuration for a single run.
#[derive(Args, Debug, Clone, Default)]
pub struct BrowseArgs {
    /// AWS region of the streams.
    #[arg(long)]
    pub region: Option<String>,

    /// Named AWS profile to load credentials from.
    #[arg(long)]
    pub profile: Option<String>,

    /// Custom Kinesis endpoint, e.g. a local emulator.
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Maximum number of record pages fetched when a stream is opened.
    #[arg(short, long = "pages", value_name = "N")]
    pub page_budget: Option<u32>,

    /// Where reading a shard starts.
    #[arg(long)]
    pub start_position: Option<StartPosition>,

    /// Field identifying records in the record list.
    #[arg(long)]
    pub record_key: Option<RecordKey>,

    /// Partition key used for inserted records.
    #[arg(long)]
    pub partition_key: Option<String>,

    /// Directory exported records are written to.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}
