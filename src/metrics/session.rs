use std::time::{Duration, Instant};

use crate::game::{GameState, Phase};

/// Stats for the current sitting, shown next to the board
pub struct SessionMetrics {
    /// Time spent actually running the current round, pauses excluded
    pub round_time: Duration,
    pub games_played: u32,
    pub best_length: usize,
    last_update: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            round_time: Duration::ZERO,
            games_played: 0,
            best_length: 0,
            last_update: Instant::now(),
        }
    }

    pub fn update(&mut self, state: &GameState, phase: Phase) {
        self.update_at(state, phase, Instant::now());
    }

    pub fn update_at(&mut self, state: &GameState, phase: Phase, now: Instant) {
        if phase == Phase::Running {
            self.round_time += now.saturating_duration_since(self.last_update);
        }
        self.last_update = now;
        self.best_length = self.best_length.max(state.snake.len());
    }

    pub fn on_game_start(&mut self) {
        self.round_time = Duration::ZERO;
        self.last_update = Instant::now();
    }

    pub fn on_game_over(&mut self) {
        self.games_played += 1;
    }

    pub fn format_time(&self) -> String {
        let total_secs = self.round_time.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
