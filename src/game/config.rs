use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Difficulty level, selecting the base tick period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Tick period at speed multiplier 1
    pub fn base_period(&self) -> Duration {
        match self {
            Difficulty::Easy => Duration::from_millis(200),
            Difficulty::Medium => Duration::from_millis(150),
            Difficulty::Hard => Duration::from_millis(100),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        };
        f.write_str(name)
    }
}

/// Configuration for the game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width of the game grid
    pub grid_width: usize,
    /// Height of the game grid
    pub grid_height: usize,
    /// Difficulty selected at start-up
    pub difficulty: Difficulty,
    /// Cell the snake starts on after every restart
    pub start_x: i32,
    pub start_y: i32,
    /// How long golden and lightning effects last, in milliseconds
    pub effect_duration_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: 30,
            grid_height: 30,
            difficulty: Difficulty::Easy,
            start_x: 5,
            start_y: 5,
            effect_duration_ms: 5000,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid_width: width,
            grid_height: height,
            ..Default::default()
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn effect_duration(&self) -> Duration {
        Duration::from_millis(self.effect_duration_ms)
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig =
            serde_json::from_str(&json).context("Failed to deserialize config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject grids the snake cannot live on
    pub fn validate(&self) -> Result<()> {
        if self.grid_width == 0 || self.grid_height == 0 {
            anyhow::bail!(
                "grid must be at least 1x1, got {}x{}",
                self.grid_width,
                self.grid_height
            );
        }
        if self.start_x < 0
            || self.start_y < 0
            || self.start_x >= self.grid_width as i32
            || self.start_y >= self.grid_height as i32
        {
            anyhow::bail!(
                "start cell ({}, {}) lies outside the {}x{} grid",
                self.start_x,
                self.start_y,
                self.grid_width,
                self.grid_height
            );
        }
        Ok(())
    }
}
