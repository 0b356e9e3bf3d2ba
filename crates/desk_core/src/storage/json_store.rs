use crate::error::AppError;
use crate::model::Task;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing::debug;

const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "DESKAPP_STORE_PATH";

/// Result of reading the task file. A problem reading or parsing an existing
/// file is reported in `warning` while `tasks` falls back to empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTasks {
    pub tasks: Vec<Task>,
    pub warning: Option<AppError>,
}

pub fn store_path(configured: Option<&Path>) -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("deskapp").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("deskapp")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_tasks(path: &Path) -> LoadedTasks {
    if !path.exists() {
        return LoadedTasks {
            tasks: Vec::new(),
            warning: None,
        };
    }

    match read_tasks(path) {
        Ok(tasks) => LoadedTasks {
            tasks,
            warning: None,
        },
        Err(err) => {
            debug!(path = %path.display(), error = %err, "ignoring unreadable task file");
            LoadedTasks {
                tasks: Vec::new(),
                warning: Some(err),
            }
        }
    }
}

fn read_tasks(path: &Path) -> Result<Vec<Task>, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

/// Replaces the whole file. The content goes to a sibling temp file first and
/// is renamed into place, so a reader sees either the old or the new list.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let content =
        serde_json::to_string_pretty(tasks).map_err(|err| AppError::invalid_data(err.to_string()))?;
    let staging = staging_path(path);
    std::fs::write(&staging, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        let result = std::fs::set_permissions(&staging, permissions)
            .map_err(|err| AppError::io(err.to_string()));
        discard_staging_on_error(&staging, result)?;
    }

    let result = std::fs::rename(&staging, path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)));
    discard_staging_on_error(&staging, result)
}

fn discard_staging_on_error<T>(staging: &Path, result: Result<T, AppError>) -> Result<T, AppError> {
    if result.is_err() {
        std::fs::remove_file(staging).ok();
    }
    result
}

/// Copies the file next to itself as `.<name>.corrupt-<nanos>` and returns
/// the copy's path.
pub fn backup_file(path: &Path) -> Result<PathBuf, AppError> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| STORE_FILE_NAME.to_string());
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    let backup = path.with_file_name(format!(".{file_name}.corrupt-{nanos}"));
    std::fs::copy(path, &backup)
        .map_err(|err| AppError::io(format!("cannot back up {}: {}", path.display(), err)))?;
    Ok(backup)
}

fn staging_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| STORE_FILE_NAME.to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}
