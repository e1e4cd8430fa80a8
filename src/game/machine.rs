//! The game state machine
//!
//! `GameMachine` owns the [`GameState`] and is the only thing that mutates it.
//! It knows nothing about clocks beyond the `Instant` handed to [`GameMachine::tick`];
//! the runtime decides when ticks and effect expiries happen by reading
//! [`GameMachine::tick_period`] and [`GameMachine::effect_deadline`].

use anyhow::Result;
use rand::{rngs::StdRng, Rng};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use super::{
    action::{Command, Direction},
    config::{Difficulty, GameConfig},
    engine::{GameEngine, TickOutcome},
    events::GameEvent,
    state::GameState,
};
use crate::persistence::HighScoreStore;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Paused,
    GameOver,
}

pub struct GameMachine<R: Rng = StdRng> {
    engine: GameEngine<R>,
    state: GameState,
    phase: Phase,
    difficulty: Difficulty,
    store: Box<dyn HighScoreStore>,
    events: broadcast::Sender<GameEvent>,
}

impl GameMachine<StdRng> {
    /// Fails when `config` describes an unplayable grid
    pub fn new(config: GameConfig, store: Box<dyn HighScoreStore>) -> Result<Self> {
        Ok(Self::with_engine(GameEngine::new(config)?, store))
    }
}

impl<R: Rng> GameMachine<R> {
    pub fn with_engine(mut engine: GameEngine<R>, store: Box<dyn HighScoreStore>) -> Self {
        let difficulty = engine.config().difficulty;
        let mut state = engine.reset();
        state.high_score = store.load_high_score();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            engine,
            state,
            phase: Phase::Idle,
            difficulty,
            store,
            events,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for setting up scenarios
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Whether the tick timer should be running
    pub fn is_ticking(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Effective tick period: base period for the difficulty divided by the
    /// active speed multiplier
    pub fn tick_period(&self) -> Duration {
        self.difficulty
            .base_period()
            .div_f64(self.state.speed_multiplier)
    }

    /// When the active effect runs out, with the generation to pass back to
    /// [`GameMachine::expire_effect`]
    pub fn effect_deadline(&self) -> Option<(Instant, u64)> {
        self.state
            .effect
            .map(|effect| (effect.expires_at, effect.generation))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub fn handle(&mut self, command: Command) {
        match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::TogglePause => self.toggle_pause(),
            Command::Restart => self.restart(),
            Command::Turn(direction) => self.set_direction(direction),
            Command::SetDifficulty(level) => self.set_difficulty(level),
        }
    }

    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            tracing::debug!(phase = ?self.phase, "start ignored");
            return;
        }
        self.phase = Phase::Running;
        tracing::info!(difficulty = %self.difficulty, "round started");
        self.emit(GameEvent::Started);
    }

    pub fn pause(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Paused;
        self.state.is_paused = true;
        self.emit(GameEvent::Paused);
    }

    pub fn resume(&mut self) {
        if self.phase != Phase::Paused {
            return;
        }
        self.phase = Phase::Running;
        self.state.is_paused = false;
        self.emit(GameEvent::Resumed);
    }

    pub fn toggle_pause(&mut self) {
        match self.phase {
            Phase::Running => self.pause(),
            Phase::Paused => self.resume(),
            Phase::Idle | Phase::GameOver => {}
        }
    }

    /// Queue a turn for the next tick. Reversals are refused.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.state.is_paused || self.state.is_game_over {
            return;
        }
        if self.state.snake.direction.is_opposite(direction) {
            tracing::debug!(?direction, "reverse turn refused");
            return;
        }
        self.state.snake.direction = direction;
    }

    /// Change the base period. The effective period changes immediately; the
    /// runtime picks it up through [`GameMachine::tick_period`].
    pub fn set_difficulty(&mut self, level: Difficulty) {
        if level == self.difficulty {
            return;
        }
        self.difficulty = level;
        tracing::info!(difficulty = %level, period = ?self.tick_period(), "difficulty changed");
        self.emit(GameEvent::DifficultyChanged(level));
    }

    /// Back to a fresh one-cell snake in the idle phase. The high score is kept.
    pub fn restart(&mut self) {
        let high_score = self.state.high_score;
        self.state = self.engine.reset();
        self.state.high_score = high_score;
        self.phase = Phase::Idle;
        tracing::info!("round restarted");
        self.emit(GameEvent::Restarted);
    }

    /// Advance one step. Only does anything while running.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Ignored;
        }

        let outcome = self.engine.tick(&mut self.state, now);
        match outcome {
            TickOutcome::Ate {
                kind,
                effect,
                new_high_score,
            } => {
                tracing::debug!(?kind, score = self.state.score, "food eaten");
                self.emit(GameEvent::FoodEaten(kind));
                if let Some(effect) = effect {
                    self.emit(GameEvent::EffectStarted(effect));
                }
                if new_high_score {
                    self.record_high_score();
                }
            }
            TickOutcome::LifeLost { remaining } => {
                tracing::info!(remaining, "life lost");
                self.emit(GameEvent::LifeLost { remaining });
            }
            TickOutcome::GameOver => {
                self.phase = Phase::GameOver;
                tracing::info!(score = self.state.score, "game over");
                self.emit(GameEvent::GameOver {
                    score: self.state.score,
                });
            }
            TickOutcome::Moved | TickOutcome::Ignored => {}
        }
        outcome
    }

    /// End the effect armed under `generation`. Returns false when that
    /// effect has already been replaced or cleared.
    pub fn expire_effect(&mut self, generation: u64) -> bool {
        match self.state.effect {
            Some(effect) if effect.generation == generation => {
                self.state.effect = None;
                self.state.speed_multiplier = 1.0;
                self.emit(GameEvent::EffectExpired);
                true
            }
            _ => false,
        }
    }

    /// Expire the active effect if its deadline has passed
    pub fn poll_effect(&mut self, now: Instant) -> bool {
        match self.effect_deadline() {
            Some((deadline, generation)) if now >= deadline => self.expire_effect(generation),
            _ => false,
        }
    }

    fn record_high_score(&mut self) {
        let score = self.state.high_score;
        if let Err(err) = self.store.save_high_score(score) {
            tracing::warn!("Failed to save high score: {:#}", err);
        }
        self.emit(GameEvent::NewHighScore(score));
    }

    fn emit(&self, event: GameEvent) {
        // No subscribers is fine; events are advisory.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Food, FoodKind, Position, Snake};
    use crate::persistence::MemoryHighScoreStore;

    fn machine() -> GameMachine {
        machine_with_store(MemoryHighScoreStore::default())
    }

    fn machine_with_store(store: MemoryHighScoreStore) -> GameMachine {
        GameMachine::with_engine(
            GameEngine::seeded(GameConfig::new(30, 30), 42).unwrap(),
            Box::new(store),
        )
    }

    fn place_food(machine: &mut GameMachine, x: i32, y: i32, kind: FoodKind) {
        machine.state_mut().food = Food::new(Position::new(x, y), kind);
    }

    fn coil(machine: &mut GameMachine) {
        machine.state_mut().snake = Snake::from_body(
            vec![
                Position::new(5, 6),
                Position::new(6, 6),
                Position::new(6, 5),
                Position::new(5, 5),
                Position::new(4, 5),
            ],
            Direction::Up,
        )
        .unwrap();
        place_food(machine, 20, 20, FoodKind::Normal);
    }

    #[test]
    fn test_initial_state() {
        let machine = machine();
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(machine.state().snake.body, vec![Position::new(5, 5)]);
        assert_eq!(machine.state().direction(), Direction::Right);
        assert_eq!(machine.tick_period(), Duration::from_millis(200));
    }

    #[test]
    fn test_new_rejects_empty_grid() {
        let store = Box::new(MemoryHighScoreStore::default());
        assert!(GameMachine::new(GameConfig::new(0, 30), store).is_err());
    }

    #[test]
    fn test_loads_high_score_from_store() {
        let machine = machine_with_store(MemoryHighScoreStore::new(90));
        assert_eq!(machine.state().high_score, 90);
    }

    #[test]
    fn test_idle_does_not_tick() {
        let mut machine = machine();
        assert_eq!(machine.tick(Instant::now()), TickOutcome::Ignored);
        assert_eq!(machine.state().snake.head(), Position::new(5, 5));
    }

    #[test]
    fn test_first_tick_moves_right() {
        let mut machine = machine();
        place_food(&mut machine, 20, 20, FoodKind::Normal);
        machine.start();

        machine.tick(Instant::now());

        assert_eq!(machine.state().snake.body, vec![Position::new(6, 5)]);
        assert_eq!(machine.state().score, 0);
    }

    #[test]
    fn test_start_is_noop_unless_idle() {
        let mut machine = machine();
        let mut events = machine.subscribe();
        machine.start();
        machine.start();
        assert_eq!(machine.phase(), Phase::Running);

        machine.pause();
        machine.start();
        assert_eq!(machine.phase(), Phase::Paused);

        assert_eq!(events.try_recv().unwrap(), GameEvent::Started);
        assert_eq!(events.try_recv().unwrap(), GameEvent::Paused);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut machine = machine();
        machine.start();

        machine.toggle_pause();
        assert_eq!(machine.phase(), Phase::Paused);
        assert!(machine.state().is_paused);
        assert!(!machine.is_ticking());
        assert_eq!(machine.tick(Instant::now()), TickOutcome::Ignored);

        machine.toggle_pause();
        assert_eq!(machine.phase(), Phase::Running);
        assert!(!machine.state().is_paused);
    }

    #[test]
    fn test_reverse_direction_is_noop() {
        let mut machine = machine();
        machine.start();

        machine.set_direction(Direction::Left);
        assert_eq!(machine.state().direction(), Direction::Right);

        machine.set_direction(Direction::Up);
        assert_eq!(machine.state().direction(), Direction::Up);
    }

    #[test]
    fn test_direction_ignored_while_paused() {
        let mut machine = machine();
        machine.start();
        machine.pause();

        machine.set_direction(Direction::Down);

        assert_eq!(machine.state().direction(), Direction::Right);
    }

    #[test]
    fn test_collision_on_last_life_ends_round() {
        let mut machine = machine();
        let mut events = machine.subscribe();
        machine.start();
        coil(&mut machine);

        assert_eq!(machine.tick(Instant::now()), TickOutcome::GameOver);
        assert_eq!(machine.phase(), Phase::GameOver);
        assert!(machine.state().is_game_over);
        assert!(!machine.is_ticking());

        let before = machine.state().clone();
        assert_eq!(machine.tick(Instant::now()), TickOutcome::Ignored);
        machine.set_direction(Direction::Left);
        machine.toggle_pause();
        machine.start();
        assert_eq!(machine.state(), &before);
        assert_eq!(machine.phase(), Phase::GameOver);

        assert_eq!(events.try_recv().unwrap(), GameEvent::Started);
        assert_eq!(events.try_recv().unwrap(), GameEvent::GameOver { score: 0 });
    }

    #[test]
    fn test_collision_with_spare_life_keeps_running() {
        let mut machine = machine();
        machine.start();
        coil(&mut machine);
        machine.state_mut().lives = 2;
        let before = machine.state().snake.clone();

        let outcome = machine.tick(Instant::now());

        assert_eq!(outcome, TickOutcome::LifeLost { remaining: 1 });
        assert_eq!(machine.state().lives, 1);
        assert_eq!(machine.state().snake, before);
        assert_eq!(machine.phase(), Phase::Running);
    }

    #[test]
    fn test_golden_effect_changes_period_then_expires() {
        let mut machine = machine();
        let mut events = machine.subscribe();
        let t0 = Instant::now();
        machine.start();
        place_food(&mut machine, 6, 5, FoodKind::Golden);

        machine.tick(t0);

        assert_eq!(machine.state().speed_multiplier, 1.5);
        assert_eq!(
            machine.tick_period(),
            Duration::from_millis(200).div_f64(1.5)
        );
        assert!(!machine.poll_effect(t0 + Duration::from_millis(4999)));
        assert_eq!(machine.state().speed_multiplier, 1.5);

        assert!(machine.poll_effect(t0 + Duration::from_millis(5000)));
        assert_eq!(machine.state().speed_multiplier, 1.0);
        assert_eq!(machine.tick_period(), Duration::from_millis(200));

        assert_eq!(events.try_recv().unwrap(), GameEvent::Started);
        assert_eq!(events.try_recv().unwrap(), GameEvent::FoodEaten(FoodKind::Golden));
        assert!(matches!(events.try_recv().unwrap(), GameEvent::EffectStarted(_)));
        assert!(matches!(events.try_recv().unwrap(), GameEvent::NewHighScore(30)));
        assert_eq!(events.try_recv().unwrap(), GameEvent::EffectExpired);
    }

    #[test]
    fn test_stale_expiry_does_not_end_newer_effect() {
        let mut machine = machine();
        let t0 = Instant::now();
        machine.start();
        place_food(&mut machine, 6, 5, FoodKind::Golden);
        machine.tick(t0);
        let (_, first_generation) = machine.effect_deadline().unwrap();

        place_food(&mut machine, 7, 5, FoodKind::Lightning);
        machine.tick(t0 + Duration::from_millis(2000));

        assert!(!machine.expire_effect(first_generation));
        assert_eq!(machine.state().speed_multiplier, 0.5);
        assert!(!machine.poll_effect(t0 + Duration::from_millis(5000)));
        assert!(machine.poll_effect(t0 + Duration::from_millis(7000)));
        assert_eq!(machine.state().speed_multiplier, 1.0);
    }

    #[test]
    fn test_difficulty_scales_with_multiplier() {
        let mut machine = machine();
        machine.start();
        place_food(&mut machine, 6, 5, FoodKind::Lightning);
        machine.tick(Instant::now());

        machine.set_difficulty(Difficulty::Hard);

        assert_eq!(machine.difficulty(), Difficulty::Hard);
        assert_eq!(machine.tick_period(), Duration::from_millis(200));
        assert_eq!(machine.phase(), Phase::Running);
    }

    #[test]
    fn test_new_high_score_is_saved() {
        let store = MemoryHighScoreStore::new(10);
        let mut machine = machine_with_store(store.clone());
        machine.start();
        place_food(&mut machine, 6, 5, FoodKind::Heart);

        machine.tick(Instant::now());

        assert_eq!(machine.state().high_score, 20);
        assert_eq!(store.get(), 20);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut machine = machine();
        machine.start();
        machine.state_mut().score = 50;
        machine.state_mut().high_score = 50;
        coil(&mut machine);
        machine.tick(Instant::now());
        assert_eq!(machine.phase(), Phase::GameOver);

        machine.restart();

        let state = machine.state();
        assert_eq!(state.snake.len(), 1);
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 1);
        assert_eq!(state.speed_multiplier, 1.0);
        assert!(state.effect.is_none());
        assert!(!state.is_game_over);
        assert!(!state.is_paused);
        assert_eq!(state.high_score, 50);
        assert_eq!(machine.phase(), Phase::Idle);

        machine.start();
        assert_eq!(machine.phase(), Phase::Running);
    }

    #[test]
    fn test_handle_dispatches_commands() {
        let mut machine = machine();
        machine.handle(Command::SetDifficulty(Difficulty::Medium));
        machine.handle(Command::Start);
        machine.handle(Command::Turn(Direction::Down));
        machine.handle(Command::Pause);

        assert_eq!(machine.difficulty(), Difficulty::Medium);
        assert_eq!(machine.state().direction(), Direction::Down);
        assert_eq!(machine.phase(), Phase::Paused);

        machine.handle(Command::Resume);
        assert_eq!(machine.phase(), Phase::Running);
    }
}
