use super::{Reinvoke, TickOutcome, TimerState};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Runs the countdown one tick per interval until it completes or `on_tick`
/// breaks. Each wait covers only what is left of the interval after the tick
/// and callback ran.
pub fn drive<F>(timer: &mut TimerState, sleeper: &dyn Sleeper, mut on_tick: F) -> TickOutcome
where
    F: FnMut(&TimerState, TickOutcome) -> ControlFlow<()>,
{
    let mut last = TickOutcome::Stopped;
    if !timer.running {
        return last;
    }

    loop {
        let started = Instant::now();
        last = timer.tick();
        if on_tick(timer, last).is_break() {
            return last;
        }

        match last.reinvoke() {
            Reinvoke::Now => continue,
            Reinvoke::After(interval) => {
                if let Some(rest) = interval.checked_sub(started.elapsed()) {
                    sleeper.sleep(rest);
                }
            }
            Reinvoke::Never => return last,
        }
    }
}
