mod app;
mod cache;
mod detail;
mod event;
pub mod ingest;
mod ui;
mod view;

use std::{io, path::PathBuf, sync::Arc};

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, prelude::CrosstermBackend};

use crate::client::{ClientSettings, KinesisClient};
use crate::error::CliError;
use app::App;
use ingest::IngestOptions;

/// Behaviour of the browsing session that is not about reaching the service.
#[derive(Debug, Clone)]
pub struct BrowseSettings {
    pub ingest: IngestOptions,
    pub export_dir: PathBuf,
}

pub async fn run(client_settings: ClientSettings, settings: BrowseSettings) -> Result<(), CliError> {
    let client = KinesisClient::connect(&client_settings)
        .await
        .map_err(CliError::ClientInit)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        disable_raw_mode().ok();
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create and run app
    let app = App::new(Arc::new(client), settings);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    result
}
