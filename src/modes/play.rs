use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;

use crate::audio::{self, AudioSettings, TerminalBell};
use crate::game::{Command, GameConfig, GameMachine, Phase, TickOutcome};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::SessionMetrics;
use crate::persistence::HighScoreStore;
use crate::render::{Renderer, View};
use crate::schedule::{EffectTimer, TickTimer};

/// Interactive terminal session. Input, ticks, effect expiry and frames are
/// all handled on one task, one event at a time.
pub struct PlayMode {
    machine: GameMachine,
    metrics: SessionMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    audio: watch::Sender<AudioSettings>,
    should_quit: bool,
}

impl PlayMode {
    pub fn new(
        config: GameConfig,
        store: Box<dyn HighScoreStore>,
        audio: AudioSettings,
    ) -> Result<Self> {
        let (audio, _) = watch::channel(audio);

        Ok(Self {
            machine: GameMachine::new(config, store)?,
            metrics: SessionMetrics::new(),
            renderer: Renderer::new(),
            input_handler: InputHandler::new(),
            audio,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let listener = audio::spawn_listener(
            self.machine.subscribe(),
            self.audio.subscribe(),
            TerminalBell,
        );

        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        tracing::info!(
            width = self.machine.state().grid_width,
            height = self.machine.state().grid_height,
            "session started"
        );

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        // Cleanup terminal
        self.cleanup_terminal(&mut terminal)?;
        listener.abort();

        tracing::info!(
            games = self.metrics.games_played,
            high_score = self.machine.state().high_score,
            "session ended"
        );
        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut tick_timer = TickTimer::new();
        let mut effect_timer = EffectTimer::new();

        // Render at 30 FPS (33ms per frame)
        let render_interval = Duration::from_millis(33);
        let mut render_timer = interval(render_interval);

        loop {
            // Every branch below may change phase, period or effect; re-arm
            // the timers before waiting again.
            tick_timer.sync(self.machine.is_ticking(), self.machine.tick_period());
            effect_timer.sync(self.machine.effect_deadline());

            tokio::select! {
                // Handle terminal events
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(err)) => {
                            return Err(err).context("Failed to read terminal event");
                        }
                        None => self.should_quit = true,
                    }
                }

                // Game logic tick
                now = tick_timer.tick() => {
                    self.update_game(now.into_std());
                }

                // Active effect ran out
                generation = effect_timer.expired() => {
                    if self.machine.expire_effect(generation) {
                        tracing::debug!(generation, "effect expired");
                    }
                }

                // Render frame
                _ = render_timer.tick() => {
                    self.metrics.update(self.machine.state(), self.machine.phase());
                    let view = View {
                        state: self.machine.state(),
                        phase: self.machine.phase(),
                        difficulty: self.machine.difficulty(),
                        metrics: &self.metrics,
                        audio: *self.audio.borrow(),
                    };
                    terminal.draw(|frame| {
                        self.renderer.render(frame, &view);
                    }).context("Failed to draw frame")?;
                }

                // Handle Ctrl+C
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            // Only process key press events, not release
            if key.kind != KeyEventKind::Press {
                return;
            }

            let action = self.input_handler.handle_key_event(key);
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::Game(command) => self.apply_command(command),
            KeyAction::ToggleSound => {
                self.audio.send_modify(|settings| settings.sound = !settings.sound);
            }
            KeyAction::ToggleMusic => {
                self.audio.send_modify(|settings| settings.music = !settings.music);
            }
            KeyAction::Quit => {
                self.should_quit = true;
            }
            KeyAction::None => {}
        }
    }

    fn apply_command(&mut self, command: Command) {
        let starting = command == Command::Start && self.machine.phase() == Phase::Idle;
        self.machine.handle(command);
        if starting {
            self.metrics.on_game_start();
        }
    }

    fn update_game(&mut self, now: std::time::Instant) {
        if self.machine.tick(now) == TickOutcome::GameOver {
            self.metrics.on_game_over();
        }
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}
