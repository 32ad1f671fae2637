use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cardscan", version, about = "Read business cards with a vision model")]
pub struct Cli {
    /// Where the capture log, settings and gallery live
    #[arg(long, env = "CARDSCAN_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a card photo for extraction and record the reply
    Capture {
        image: PathBuf,
        /// Keep a copy of the encoded photo in the gallery directory
        #[arg(long)]
        save_to_gallery: bool,
    },
    /// List recorded captures, newest first
    Logs {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show a single capture
    Show {
        id: i64,
        /// Write the stored photo to this path
        #[arg(long)]
        image_out: Option<PathBuf>,
    },
    /// Write every parsed contact as a JSON array
    Export {
        /// Defaults to stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective settings
    Show,
    SetEndpoint { url: String },
    SetApiKey { key: String },
    SetModel { model: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_capture_with_global_data_dir() {
        let cli = Cli::try_parse_from([
            "cardscan",
            "capture",
            "card.jpg",
            "--save-to-gallery",
            "--data-dir",
            "/tmp/cards",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/cards")));
        match cli.command {
            Command::Capture {
                image,
                save_to_gallery,
            } => {
                assert_eq!(image, PathBuf::from("card.jpg"));
                assert!(save_to_gallery);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_config_subcommand() {
        let cli = Cli::try_parse_from(["cardscan", "config", "set-endpoint", "http://h:1/api/chat"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::SetEndpoint { ref url }) if url == "http://h:1/api/chat"
        ));
    }
}
