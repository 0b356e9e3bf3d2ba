//! Pomodoro countdown state machine.
//!
//! The timer never blocks: the host calls [`TimerState::tick`] once per
//! refresh and re-invokes it according to the returned [`Reinvoke`].

mod driver;

pub use driver::{Sleeper, ThreadSleeper, drive};

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_MINUTES: u32 = 25;
pub const MIN_MINUTES: u32 = 1;
pub const MAX_MINUTES: u32 = 60;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What the host should do after handing control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reinvoke {
    Now,
    After(Duration),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer is not running; nothing changed.
    Stopped,
    Advanced { remaining: u32 },
    /// This tick brought the countdown to zero.
    Completed,
    /// Already at zero. The timer stays "running" until stopped or reset.
    Exhausted,
}

impl TickOutcome {
    pub fn reinvoke(&self) -> Reinvoke {
        match self {
            Self::Advanced { .. } => Reinvoke::After(TICK_INTERVAL),
            Self::Stopped | Self::Completed | Self::Exhausted => Reinvoke::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u32,
    pub running: bool,
    pub configured_minutes: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::with_minutes(DEFAULT_MINUTES)
    }
}

impl TimerState {
    pub fn with_minutes(minutes: u32) -> Self {
        let configured_minutes = clamp_minutes(minutes);
        Self {
            remaining_seconds: configured_minutes * 60,
            running: false,
            configured_minutes,
        }
    }

    pub fn start(&mut self) -> Reinvoke {
        if self.running {
            return Reinvoke::Never;
        }
        self.running = true;
        debug!(remaining = self.remaining_seconds, "timer started");
        Reinvoke::Now
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(remaining = self.remaining_seconds, "timer stopped");
        }
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.remaining_seconds = self.configured_minutes * 60;
        self.running = false;
        debug!(minutes = self.configured_minutes, "timer reset");
    }

    /// Takes effect on the next [`reset`](Self::reset).
    pub fn set_configured_minutes(&mut self, minutes: u32) {
        self.configured_minutes = clamp_minutes(minutes);
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Stopped;
        }
        if self.remaining_seconds == 0 {
            return TickOutcome::Exhausted;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            debug!("timer completed");
            TickOutcome::Completed
        } else {
            TickOutcome::Advanced {
                remaining: self.remaining_seconds,
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_seconds == 0
    }

    pub fn format_remaining(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

pub fn clamp_minutes(minutes: u32) -> u32 {
    minutes.clamp(MIN_MINUTES, MAX_MINUTES)
}

/// Renders seconds as `MM:SS`. Minutes are not wrapped at 60.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
