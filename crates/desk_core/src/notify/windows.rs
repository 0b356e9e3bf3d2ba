use crate::error::AppError;
use crate::notify::{APP_NAME, Notifier};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, summary: &str, body: &str) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(summary)
            .text1(body)
            .text2(APP_NAME)
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
