use super::{
    action::Direction,
    config::GameConfig,
    state::{Effect, EffectKind, Food, FoodKind, GameState, Position, Snake},
};
use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

/// What a single tick did to the game
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Snake advanced one cell without eating
    Moved,
    /// Snake advanced onto the food and grew
    Ate {
        kind: FoodKind,
        effect: Option<EffectKind>,
        new_high_score: bool,
    },
    /// Snake ran into itself but had a spare life; the move was discarded
    LifeLost { remaining: u32 },
    /// Snake ran into itself on its last life
    GameOver,
    /// Nothing happened because the round is already over
    Ignored,
}

/// The game engine that handles all game logic
pub struct GameEngine<R: Rng = StdRng> {
    config: GameConfig,
    rng: R,
    effect_generation: u64,
}

impl GameEngine<StdRng> {
    /// Create a new game engine with the given configuration
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Engine with a reproducible food sequence
    pub fn seeded(config: GameConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GameEngine<R> {
    /// Fails when the grid is empty or the start cell lies off the grid
    pub fn with_rng(config: GameConfig, rng: R) -> Result<Self> {
        config.validate().context("Invalid game configuration")?;
        Ok(Self {
            config,
            rng,
            effect_generation: 0,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Fresh round: one-cell snake on the start cell heading right
    pub fn reset(&mut self) -> GameState {
        let snake = Snake::new(
            Position::new(self.config.start_x, self.config.start_y),
            Direction::Right,
        );
        let food = self.spawn_food();

        GameState::new(snake, food, self.config.grid_width, self.config.grid_height)
    }

    /// Execute one tick of the game
    pub fn tick(&mut self, state: &mut GameState, now: Instant) -> TickOutcome {
        if state.is_game_over {
            return TickOutcome::Ignored;
        }

        let new_head = state
            .snake
            .head()
            .moved_in_direction(state.snake.direction)
            .wrapped(state.grid_width, state.grid_height);
        let eats = new_head == state.food.position;

        // The tail cell is vacated this tick unless the snake grows, so it
        // does not count as an obstacle.
        let obstacles = if eats {
            &state.snake.body[..]
        } else {
            &state.snake.body[..state.snake.len() - 1]
        };

        if obstacles.contains(&new_head) {
            if state.lives > 1 {
                state.lives -= 1;
                return TickOutcome::LifeLost {
                    remaining: state.lives,
                };
            }
            state.is_game_over = true;
            return TickOutcome::GameOver;
        }

        state.snake.body.insert(0, new_head);

        if !eats {
            state.snake.body.pop();
            return TickOutcome::Moved;
        }

        let kind = state.food.kind;
        let effect = self.apply_food(state, kind, now);
        let new_high_score = state.score > state.high_score;
        if new_high_score {
            state.high_score = state.score;
        }
        state.food = self.spawn_food();

        TickOutcome::Ate {
            kind,
            effect,
            new_high_score,
        }
    }

    /// Score the food and start its effect. A new effect replaces whatever
    /// effect was active and restarts the full duration from `now`.
    fn apply_food(
        &mut self,
        state: &mut GameState,
        kind: FoodKind,
        now: Instant,
    ) -> Option<EffectKind> {
        state.score += kind.score();

        if kind == FoodKind::Heart {
            state.lives += 1;
        }

        let effect_kind = kind.effect()?;
        self.effect_generation += 1;
        state.speed_multiplier = effect_kind.multiplier();
        state.effect = Some(Effect {
            kind: effect_kind,
            expires_at: now + self.config.effect_duration(),
            generation: self.effect_generation,
        });
        Some(effect_kind)
    }

    /// Spawn food at a uniformly random cell. The snake's own cells are not
    /// excluded, so food can land underneath it.
    pub fn spawn_food(&mut self) -> Food {
        let x = self.rng.gen_range(0..self.config.grid_width) as i32;
        let y = self.rng.gen_range(0..self.config.grid_height) as i32;
        let kind = FoodKind::from_roll(self.rng.gen::<f64>());

        Food::new(Position::new(x, y), kind)
    }
}
