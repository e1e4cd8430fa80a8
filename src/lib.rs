//! Snake Arcade - a toroidal snake game for the terminal
//!
//! This library provides:
//! - Core game logic and the round state machine (game module)
//! - Cancellable tick and effect timers (schedule module)
//! - High-score storage (persistence module)
//! - Audio cues driven by game events (audio module)
//! - TUI rendering, keyboard input and session stats
//! - The interactive play loop (modes module)

pub mod audio;
pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod persistence;
pub mod render;
pub mod schedule;
