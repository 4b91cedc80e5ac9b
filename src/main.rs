use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use natebot::app;
use natebot::config::Settings;
use natebot::domain::{Difficulty, PieceColor};

#[derive(Parser, Debug)]
#[command(name = "natebot", version, about = "Casual chess against a bot that sometimes plays its worst")]
struct Cli {
    /// TOML settings file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// UCI engine binary (overrides the settings file)
    #[arg(long, value_name = "PATH", global = true)]
    engine: Option<PathBuf>,
    /// Directory holding the opening books (overrides the settings file)
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a game in the terminal
    Play {
        /// Your colour: white or black
        #[arg(long, default_value = "white")]
        color: PieceColor,
        /// trivial, weak or strong
        #[arg(long, default_value = "weak")]
        difficulty: Difficulty,
        /// Opening key from the bot's book
        #[arg(long, value_name = "KEY")]
        opening: Option<String>,
    },
    /// List the opening books
    Openings,
    /// Step through a stored game record
    Replay {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Standings table built from game records
    Standings {
        /// Records to score; defaults to every .pgn in the records directory
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Show unlocked achievements
    Achievements,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("natebot=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load_optional(cli.config.as_deref()).context("loading settings")?;
    if let Some(engine) = cli.engine {
        settings.engine_path = engine;
    }
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }

    match cli.cmd {
        Command::Play {
            color,
            difficulty,
            opening,
        } => app::play(&settings, color, difficulty, opening.as_deref()),
        Command::Openings => app::openings(&settings),
        Command::Replay { file } => app::replay(&file),
        Command::Standings { files } => app::standings_table(&settings, &files),
        Command::Achievements => app::achievements(&settings),
    }
}
