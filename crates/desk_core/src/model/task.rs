use serde::{Deserialize, Serialize};

/// One to-do entry as stored in the task file.
///
/// The `task` key matches files written before ids existed; an empty `id`
/// marks a legacy entry that gets an id assigned on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "task")]
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new<I: Into<String>, T: Into<String>>(id: I, text: T) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            done: false,
        }
    }
}
