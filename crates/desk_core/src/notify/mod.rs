use crate::error::AppError;
use crate::timer::{TimerState, format_clock};
use tracing::warn;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

pub const APP_NAME: &str = "deskapp";

pub trait Notifier {
    fn notify(&self, summary: &str, body: &str) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _summary: &str, _body: &str) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Box<dyn Notifier> {
    if std::env::var("DESKAPP_DISABLE_NOTIFICATIONS").is_ok() {
        return Box::new(NoopNotifier);
    }

    match platform_notifier() {
        Ok(notifier) => notifier,
        Err(err) => {
            warn!(error = %err, "desktop notifications unavailable");
            Box::new(NoopNotifier)
        }
    }
}

pub fn timer_finished_body(timer: &TimerState) -> String {
    format!(
        "{} focus session finished. Time for a break.",
        format_clock(timer.configured_minutes * 60)
    )
}

/// A failed notification never interrupts the countdown; it is only logged.
pub fn announce_timer_finished(notifier: &dyn Notifier, timer: &TimerState) -> bool {
    match notifier.notify("Pomodoro finished", &timer_finished_body(timer)) {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to show timer notification");
            false
        }
    }
}

#[cfg(target_os = "linux")]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(LinuxNotifier))
}

#[cfg(windows)]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Ok(Box::new(WindowsNotifier))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn platform_notifier() -> Result<Box<dyn Notifier>, AppError> {
    Err(AppError::invalid_data(
        "notifications are not supported on this platform",
    ))
}
