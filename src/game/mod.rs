//! Core game logic module for Snake
//!
//! This module contains all the game logic without any terminal or rendering
//! dependencies. Time only enters through the `Instant`s passed to ticks, so
//! every rule can be driven directly from tests.

pub mod action;
pub mod config;
pub mod engine;
pub mod events;
pub mod machine;
pub mod state;

// Re-export commonly used types
pub use action::{Command, Direction};
pub use config::{Difficulty, GameConfig};
pub use engine::{GameEngine, TickOutcome};
pub use events::GameEvent;
pub use machine::{GameMachine, Phase};
pub use state::{Effect, EffectKind, Food, FoodKind, GameState, Position, Snake};
