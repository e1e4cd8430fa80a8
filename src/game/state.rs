use super::action::Direction;
use std::time::Instant;

/// A position on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Move position in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    /// Fold the position back onto a `width` x `height` torus
    pub fn wrapped(&self, width: usize, height: usize) -> Self {
        Self {
            x: self.x.rem_euclid(width as i32),
            y: self.y.rem_euclid(height as i32),
        }
    }
}

/// The snake in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: Vec<Position>,
    /// Current direction of movement
    pub direction: Direction,
}

impl Snake {
    /// A one-cell snake
    pub fn new(head: Position, direction: Direction) -> Self {
        Self {
            body: vec![head],
            direction,
        }
    }

    /// Build a snake from explicit segments, head first. `None` for an
    /// empty body.
    pub fn from_body(body: Vec<Position>, direction: Direction) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        Some(Self { body, direction })
    }

    /// Get the head position
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// Check if position is occupied by any segment, head included
    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (should never happen in practice)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Category of food, deciding score and side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FoodKind {
    #[default]
    Normal,
    Golden,
    Heart,
    Lightning,
}

impl FoodKind {
    /// Pick a kind from a uniform roll in `[0, 1)`
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.1 {
            FoodKind::Golden
        } else if roll < 0.2 {
            FoodKind::Heart
        } else if roll < 0.3 {
            FoodKind::Lightning
        } else {
            FoodKind::Normal
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            FoodKind::Normal => 10,
            FoodKind::Golden => 30,
            FoodKind::Heart => 20,
            FoodKind::Lightning => 15,
        }
    }

    /// The timed effect eating this food starts, if any
    pub fn effect(&self) -> Option<EffectKind> {
        match self {
            FoodKind::Golden => Some(EffectKind::SpeedUp),
            FoodKind::Lightning => Some(EffectKind::SlowDown),
            FoodKind::Normal | FoodKind::Heart => None,
        }
    }

    pub fn is_special(&self) -> bool {
        *self != FoodKind::Normal
    }
}

/// Food on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    pub position: Position,
    pub kind: FoodKind,
}

impl Food {
    pub fn new(position: Position, kind: FoodKind) -> Self {
        Self { position, kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    SpeedUp,
    SlowDown,
}

impl EffectKind {
    pub fn multiplier(&self) -> f64 {
        match self {
            EffectKind::SpeedUp => 1.5,
            EffectKind::SlowDown => 0.5,
        }
    }
}

/// A timed speed modifier. `generation` identifies which arming of the expiry
/// timer this effect belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub kind: EffectKind,
    pub expires_at: Instant,
    pub generation: u64,
}

/// Complete game state
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub snake: Snake,
    pub food: Food,
    pub grid_width: usize,
    pub grid_height: usize,
    pub score: u32,
    pub high_score: u32,
    pub lives: u32,
    pub speed_multiplier: f64,
    pub effect: Option<Effect>,
    pub is_paused: bool,
    pub is_game_over: bool,
}

impl GameState {
    /// Create a new game state
    pub fn new(snake: Snake, food: Food, grid_width: usize, grid_height: usize) -> Self {
        Self {
            snake,
            food,
            grid_width,
            grid_height,
            score: 0,
            high_score: 0,
            lives: 1,
            speed_multiplier: 1.0,
            effect: None,
            is_paused: false,
            is_game_over: false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.snake.direction
    }
}
