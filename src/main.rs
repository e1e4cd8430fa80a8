use anyhow::{Context, Result};
use clap::Parser;
use snake_arcade::audio::AudioSettings;
use snake_arcade::game::{Difficulty, GameConfig};
use snake_arcade::modes::PlayMode;
use snake_arcade::persistence::FileHighScoreStore;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake_arcade")]
#[command(version, about = "Toroidal snake with power-up food")]
struct Cli {
    /// Grid width (overrides the config file)
    #[arg(long)]
    width: Option<usize>,

    /// Grid height (overrides the config file)
    #[arg(long)]
    height: Option<usize>,

    /// Starting difficulty (overrides the config file)
    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,

    /// JSON file with game settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the high score is kept
    #[arg(long, default_value = ".snake_high_score.json")]
    high_score_file: PathBuf,

    /// Start with sound effects off
    #[arg(long)]
    no_sound: bool,

    /// Start with background music on
    #[arg(long)]
    music: bool,

    /// Log file; the terminal itself is taken by the game
    #[arg(long, default_value = "snake_arcade.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let config = resolve_config(&cli)?;
    tracing::info!(?config, "configuration loaded");

    let audio = AudioSettings {
        sound: !cli.no_sound,
        music: cli.music,
    };
    let store = FileHighScoreStore::new(&cli.high_score_file);

    let mut play_mode = PlayMode::new(config, Box::new(store), audio)?;
    play_mode.run().await
}

/// Config file first, then command-line overrides
fn resolve_config(cli: &Cli) -> Result<GameConfig> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    if let Some(width) = cli.width {
        config.grid_width = width;
    }
    if let Some(height) = cli.height {
        config.grid_height = height;
    }
    if let Some(difficulty) = cli.difficulty {
        config.difficulty = difficulty;
    }

    config.validate().context("Invalid game configuration")?;
    Ok(config)
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
