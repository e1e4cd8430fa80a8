use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::audio::AudioSettings;
use crate::game::{Difficulty, EffectKind, FoodKind, GameState, Phase, Position};
use crate::metrics::SessionMetrics;

/// Everything the renderer needs for one frame
pub struct View<'a> {
    pub state: &'a GameState,
    pub phase: Phase,
    pub difficulty: Difficulty,
    pub metrics: &'a SessionMetrics,
    pub audio: AudioSettings,
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame, view: &View) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Game area
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        let stats = self.render_stats(view);
        frame.render_widget(stats, chunks[0]);

        let game_area = chunks[1];
        let grid = self.render_grid(view.state);
        frame.render_widget(grid, game_area);

        if let Some(overlay) = self.render_overlay(view) {
            let area = centered(game_area, 36, 7);
            frame.render_widget(Clear, area);
            frame.render_widget(overlay, area);
        }

        let controls = self.render_controls(view.audio);
        frame.render_widget(controls, chunks[2]);
    }

    /// Glyph and style for one grid cell
    pub fn cell(&self, state: &GameState, pos: Position) -> Span<'static> {
        if pos == state.snake.head() {
            Span::styled(
                "■ ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        } else if state.snake.occupies(pos) {
            Span::styled("□ ", Style::default().fg(Color::Green))
        } else if pos == state.food.position {
            let (glyph, color) = food_glyph(state.food.kind);
            Span::styled(glyph, Style::default().fg(color).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(". ", Style::default().fg(Color::DarkGray))
        }
    }

    fn render_grid(&self, state: &GameState) -> Paragraph<'_> {
        let lines: Vec<Line> = (0..state.grid_height)
            .map(|y| {
                let spans: Vec<Span> = (0..state.grid_width)
                    .map(|x| self.cell(state, Position::new(x as i32, y as i32)))
                    .collect();
                Line::from(spans)
            })
            .collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::White))
                    .title(" Snake "),
            )
            .alignment(Alignment::Center)
    }

    fn render_stats(&self, view: &View) -> Paragraph<'_> {
        let state = view.state;
        let mut spans = vec![
            Span::styled("Score: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                state.score.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Best: ", Style::default().fg(Color::Yellow)),
            Span::styled(state.high_score.to_string(), Style::default().fg(Color::White)),
            Span::raw("    "),
            Span::styled("♥".repeat(state.lives as usize), Style::default().fg(Color::Red)),
            Span::raw("    "),
            Span::styled("Level: ", Style::default().fg(Color::Yellow)),
            Span::styled(view.difficulty.to_string(), Style::default().fg(Color::White)),
            Span::raw("    "),
            Span::styled("Time: ", Style::default().fg(Color::Yellow)),
            Span::styled(view.metrics.format_time(), Style::default().fg(Color::White)),
        ];

        if let Some(effect) = state.effect {
            let (label, color) = match effect.kind {
                EffectKind::SpeedUp => ("FAST", Color::LightYellow),
                EffectKind::SlowDown => ("SLOW", Color::LightCyan),
            };
            spans.push(Span::raw("    "));
            spans.push(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ));
        }

        Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
    }

    fn render_overlay(&self, view: &View) -> Option<Paragraph<'_>> {
        let (title, color, detail) = match view.phase {
            Phase::Running => return None,
            Phase::Idle => ("READY", Color::Green, "start"),
            Phase::Paused => ("PAUSED", Color::Yellow, "resume"),
            Phase::GameOver => ("GAME OVER", Color::Red, "restart"),
        };
        let key = match view.phase {
            Phase::Paused => "P",
            Phase::GameOver => "R",
            _ => "Space",
        };

        let mut text = vec![
            Line::from(""),
            Line::from(Span::styled(
                title,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
        ];
        if view.phase == Phase::GameOver {
            text.push(Line::from(vec![
                Span::styled("Final Score: ", Style::default().fg(Color::Yellow)),
                Span::styled(
                    view.state.score.to_string(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
            text.push(Line::from(format!(
                "Games: {}   Longest: {}",
                view.metrics.games_played, view.metrics.best_length
            )));
        } else {
            text.push(Line::from(""));
        }
        text.push(Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::Gray)),
            Span::styled(
                key,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" to {}", detail), Style::default().fg(Color::Gray)),
        ]));

        Some(
            Paragraph::new(text).alignment(Alignment::Center).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            ),
        )
    }

    fn render_controls(&self, audio: AudioSettings) -> Paragraph<'_> {
        let switch = |on: bool| if on { "on" } else { "off" };
        let text = vec![Line::from(vec![
            Span::styled("↑↓←→/WASD", Style::default().fg(Color::Cyan)),
            Span::raw(" move | "),
            Span::styled("Space", Style::default().fg(Color::Cyan)),
            Span::raw(" start | "),
            Span::styled("P", Style::default().fg(Color::Cyan)),
            Span::raw(" pause | "),
            Span::styled("R", Style::default().fg(Color::Cyan)),
            Span::raw(" restart | "),
            Span::styled("1-3", Style::default().fg(Color::Cyan)),
            Span::raw(" level | "),
            Span::styled("N", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" sound {} | ", switch(audio.sound))),
            Span::styled("M", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" music {} | ", switch(audio.music))),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" quit"),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn food_glyph(kind: FoodKind) -> (&'static str, Color) {
    match kind {
        FoodKind::Normal => ("● ", Color::Red),
        FoodKind::Golden => ("★ ", Color::Yellow),
        FoodKind::Heart => ("♥ ", Color::LightMagenta),
        FoodKind::Lightning => ("ϟ ", Color::LightCyan),
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
