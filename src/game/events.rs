use super::{
    config::Difficulty,
    state::{EffectKind, FoodKind},
};

/// Something observable happened in the game. Published on a broadcast
/// channel so collaborators like audio can react without touching the state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    Started,
    Paused,
    Resumed,
    Restarted,
    FoodEaten(FoodKind),
    EffectStarted(EffectKind),
    EffectExpired,
    LifeLost { remaining: u32 },
    NewHighScore(u32),
    GameOver { score: u32 },
    DifficultyChanged(Difficulty),
}
