pub mod capture;
pub mod cli;
pub mod codec;
mod commands;
pub mod db;
pub mod inference;
pub mod logs;
pub mod parser;
pub mod settings;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use cli::{Cli, Command, ConfigCommand};
use db::Database;
use settings::SettingsStore;

pub(crate) struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
    pub(crate) data_dir: PathBuf,
}

impl AppState {
    fn open(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("cardscan.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        Ok(Self {
            db: database,
            settings,
            data_dir,
        })
    }

    pub(crate) fn gallery_dir(&self) -> PathBuf {
        self.data_dir.join("gallery")
    }
}

fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("cardscan"))
        .ok_or_else(|| anyhow!("no platform data directory; pass --data-dir"))
}

pub fn run() -> Result<()> {
    // RUST_LOG overrides the default level.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    log::debug!("cardscan starting with data dir {}", data_dir.display());

    let state = AppState::open(data_dir)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    let output = runtime.block_on(async {
        match cli.command {
            Command::Capture {
                image,
                save_to_gallery,
            } => commands::capture(&state, &image, save_to_gallery).await,
            Command::Logs { limit } => commands::list_logs(&state, limit).await,
            Command::Show { id, image_out } => {
                commands::show_capture(&state, id, image_out.as_deref()).await
            }
            Command::Export { output } => commands::export(&state, output.as_deref()).await,
            Command::Config(ConfigCommand::Show) => Ok(commands::show_config(&state)),
            Command::Config(ConfigCommand::SetEndpoint { url }) => state
                .settings
                .update_inference(|s| s.endpoint = url)
                .map(|_| commands::show_config(&state)),
            Command::Config(ConfigCommand::SetApiKey { key }) => state
                .settings
                .update_inference(|s| s.api_key = key)
                .map(|_| commands::show_config(&state)),
            Command::Config(ConfigCommand::SetModel { model }) => state
                .settings
                .update_inference(|s| s.model = model)
                .map(|_| commands::show_config(&state)),
        }
    })?;

    println!("{output}");
    Ok(())
}
