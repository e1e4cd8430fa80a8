//! Cancellable timers driving the game loop

pub mod timers;

pub use timers::{EffectTimer, TickTimer};
