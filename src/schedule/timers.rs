use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior, Sleep};

/// Repeating tick source that can be stopped and re-armed at a new period.
/// Re-arming drops the previous interval, so there is never more than one.
pub struct TickTimer {
    interval: Option<Interval>,
    period: Duration,
}

impl TickTimer {
    pub fn new() -> Self {
        Self {
            interval: None,
            period: Duration::ZERO,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Period of the armed interval
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(|_| self.period)
    }

    /// Replace any running schedule. The first tick fires one full period
    /// from now.
    pub fn arm(&mut self, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.period = period;
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    /// Bring the timer in line with the machine: stopped when not ticking,
    /// re-armed when the period changed, untouched otherwise.
    pub fn sync(&mut self, ticking: bool, period: Duration) {
        if !ticking {
            if self.is_armed() {
                tracing::trace!("tick timer stopped");
            }
            self.stop();
        } else if self.period() != Some(period) {
            tracing::debug!(?period, "tick timer armed");
            self.arm(period);
        }
    }

    /// Wait for the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) -> Instant {
        match self.interval.as_mut() {
            Some(interval) => interval.tick().await,
            None => pending().await,
        }
    }
}

impl Default for TickTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot timer for the active effect. Holds at most one pending sleep,
/// tagged with the generation of the effect it belongs to.
#[derive(Default)]
pub struct EffectTimer {
    armed: Option<(Pin<Box<Sleep>>, u64)>,
}

impl EffectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Option<u64> {
        self.armed.as_ref().map(|(_, generation)| *generation)
    }

    /// Arm for a new deadline, dropping whatever was armed before
    pub fn arm(&mut self, deadline: std::time::Instant, generation: u64) {
        let sleep = Box::pin(sleep_until(Instant::from_std(deadline)));
        self.armed = Some((sleep, generation));
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Follow the machine's current effect deadline. A deadline for the
    /// generation already armed is left alone.
    pub fn sync(&mut self, deadline: Option<(std::time::Instant, u64)>) {
        match deadline {
            None => self.cancel(),
            Some((_, generation)) if self.generation() == Some(generation) => {}
            Some((deadline, generation)) => {
                tracing::debug!(generation, "effect timer armed");
                self.arm(deadline, generation);
            }
        }
    }

    /// Wait for the armed deadline and return its generation. Never resolves
    /// while nothing is armed.
    pub async fn expired(&mut self) -> u64 {
        match self.armed.as_mut() {
            Some((sleep, generation)) => {
                let generation = *generation;
                sleep.await;
                self.armed = None;
                generation
            }
            None => pending().await,
        }
    }
}
