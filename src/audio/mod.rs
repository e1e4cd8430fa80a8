//! Audio collaborator
//!
//! Listens to [`GameEvent`]s and turns them into cues. It owns the sound and
//! music switches; the game core never sees them. Every failure here is
//! logged and swallowed so the game plays the same with or without audio.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::game::GameEvent;

/// User-facing audio switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    pub sound: bool,
    pub music: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sound: true,
            music: false,
        }
    }
}

/// A short sound effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Eat,
    PowerUp,
    Die,
}

impl Cue {
    pub fn for_event(event: &GameEvent) -> Option<Cue> {
        match event {
            GameEvent::FoodEaten(kind) if kind.is_special() => Some(Cue::PowerUp),
            GameEvent::FoodEaten(_) => Some(Cue::Eat),
            GameEvent::GameOver { .. } => Some(Cue::Die),
            _ => None,
        }
    }
}

/// Something that can make noise
pub trait AudioSink: Send {
    fn play(&mut self, cue: Cue) -> Result<()>;

    fn set_music(&mut self, playing: bool) -> Result<()>;
}

/// Rings the terminal bell for every cue.
///
/// There is no background music: `set_music` makes no sound and only logs the
/// new state, so `--music` and the M key flip a switch nobody can hear.
pub struct TerminalBell;

impl AudioSink for TerminalBell {
    fn play(&mut self, cue: Cue) -> Result<()> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .with_context(|| format!("Failed to ring bell for {:?}", cue))
    }

    fn set_music(&mut self, playing: bool) -> Result<()> {
        tracing::debug!(playing, "music state changed");
        Ok(())
    }
}

/// Applies the switches to incoming events and drives a sink
pub struct AudioPlayer<S: AudioSink> {
    sink: S,
    settings: AudioSettings,
    round_active: bool,
    music_playing: bool,
}

impl<S: AudioSink> AudioPlayer<S> {
    pub fn new(sink: S, settings: AudioSettings) -> Self {
        Self {
            sink,
            settings,
            round_active: false,
            music_playing: false,
        }
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_playing
    }

    pub fn update_settings(&mut self, settings: AudioSettings) {
        self.settings = settings;
        self.refresh_music();
    }

    pub fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::Started | GameEvent::Resumed => self.round_active = true,
            GameEvent::Paused | GameEvent::GameOver { .. } | GameEvent::Restarted => {
                self.round_active = false
            }
            _ => {}
        }

        if self.settings.sound {
            if let Some(cue) = Cue::for_event(event) {
                if let Err(err) = self.sink.play(cue) {
                    tracing::warn!("Sound effect failed: {:#}", err);
                }
            }
        }

        self.refresh_music();
    }

    fn refresh_music(&mut self) {
        let wanted = self.settings.music && self.round_active;
        if wanted == self.music_playing {
            return;
        }
        match self.sink.set_music(wanted) {
            Ok(()) => self.music_playing = wanted,
            Err(err) => tracing::warn!("Background music failed: {:#}", err),
        }
    }
}

/// Run an [`AudioPlayer`] on its own task until the event channel closes
pub fn spawn_listener<S: AudioSink + 'static>(
    mut events: broadcast::Receiver<GameEvent>,
    mut settings: watch::Receiver<AudioSettings>,
    sink: S,
) -> JoinHandle<()> {
    let initial = *settings.borrow();
    let mut player = AudioPlayer::new(sink, initial);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => player.on_event(&event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "audio listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = settings.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *settings.borrow_and_update();
                    player.update_settings(current);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::FoodKind;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingSink {
        cues: Arc<Mutex<Vec<Cue>>>,
        music: Arc<Mutex<Vec<bool>>>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, cue: Cue) -> Result<()> {
            self.cues.lock().unwrap().push(cue);
            Ok(())
        }

        fn set_music(&mut self, playing: bool) -> Result<()> {
            self.music.lock().unwrap().push(playing);
            Ok(())
        }
    }

    struct BrokenSink;

    impl AudioSink for BrokenSink {
        fn play(&mut self, _cue: Cue) -> Result<()> {
            anyhow::bail!("no audio device")
        }

        fn set_music(&mut self, _playing: bool) -> Result<()> {
            anyhow::bail!("no audio device")
        }
    }

    #[test]
    fn test_cue_mapping() {
        assert_eq!(Cue::for_event(&GameEvent::FoodEaten(FoodKind::Normal)), Some(Cue::Eat));
        assert_eq!(
            Cue::for_event(&GameEvent::FoodEaten(FoodKind::Lightning)),
            Some(Cue::PowerUp)
        );
        assert_eq!(Cue::for_event(&GameEvent::GameOver { score: 3 }), Some(Cue::Die));
        assert_eq!(Cue::for_event(&GameEvent::Started), None);
    }

    #[test]
    fn test_sound_off_plays_nothing() {
        let sink = RecordingSink::default();
        let mut player = AudioPlayer::new(
            sink.clone(),
            AudioSettings {
                sound: false,
                music: false,
            },
        );

        player.on_event(&GameEvent::FoodEaten(FoodKind::Golden));

        assert!(sink.cues.lock().unwrap().is_empty());
    }

    #[test]
    fn test_music_follows_round() {
        let sink = RecordingSink::default();
        let mut player = AudioPlayer::new(
            sink.clone(),
            AudioSettings {
                sound: true,
                music: true,
            },
        );

        player.on_event(&GameEvent::Started);
        assert!(player.is_music_playing());
        player.on_event(&GameEvent::Paused);
        assert!(!player.is_music_playing());
        player.on_event(&GameEvent::Resumed);
        player.on_event(&GameEvent::GameOver { score: 10 });

        assert_eq!(*sink.music.lock().unwrap(), vec![true, false, true, false]);
        assert_eq!(*sink.cues.lock().unwrap(), vec![Cue::Die]);
    }

    #[test]
    fn test_toggling_music_mid_round() {
        let sink = RecordingSink::default();
        let mut player = AudioPlayer::new(sink.clone(), AudioSettings::default());
        player.on_event(&GameEvent::Started);
        assert!(!player.is_music_playing());

        player.update_settings(AudioSettings {
            sound: true,
            music: true,
        });

        assert!(player.is_music_playing());
    }

    #[test]
    fn test_broken_sink_is_harmless() {
        let mut player = AudioPlayer::new(
            BrokenSink,
            AudioSettings {
                sound: true,
                music: true,
            },
        );

        player.on_event(&GameEvent::Started);
        player.on_event(&GameEvent::FoodEaten(FoodKind::Normal));

        assert!(!player.is_music_playing());
    }

    #[test]
    fn test_terminal_bell_music_is_silent_switch() {
        let mut bell = TerminalBell;
        assert!(bell.set_music(true).is_ok());
        assert!(bell.set_music(false).is_ok());
    }

    #[tokio::test]
    async fn test_listener_receives_events() {
        let (events_tx, events_rx) = broadcast::channel(8);
        let (_settings_tx, settings_rx) = watch::channel(AudioSettings::default());
        let sink = RecordingSink::default();

        let handle = spawn_listener(events_rx, settings_rx, sink.clone());
        events_tx.send(GameEvent::FoodEaten(FoodKind::Heart)).unwrap();
        events_tx.send(GameEvent::GameOver { score: 20 }).unwrap();
        drop(events_tx);
        handle.await.unwrap();

        assert_eq!(*sink.cues.lock().unwrap(), vec![Cue::PowerUp, Cue::Die]);
    }
}
