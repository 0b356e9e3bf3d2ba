use crate::error::AppError;
use crate::notify::{APP_NAME, Notifier};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, summary: &str, body: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname(APP_NAME);
        notification.summary(summary);
        notification.body(body);

        notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        Ok(())
    }
}
