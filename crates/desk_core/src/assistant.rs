//! Generative-text collaborator.
//!
//! The host only ever sees plain strings from here: every failure becomes an
//! `Error: ...` message instead of a structured error.

use crate::config::AssistantConfig;
use crate::error::AppError;
use reqwest::blocking::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const QUOTE_PROMPT: &str =
    "Generate a motivational quote related to productivity and success.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Please enter a question.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub trait Assistant {
    fn generate(&self, prompt: &str) -> Result<String, AppError>;
}

/// Talks to an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaAssistant {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaAssistant {
    pub fn new(config: &AssistantConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::service(err.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint().trim_end_matches('/').to_string(),
            model: config.model().to_string(),
            client,
        })
    }
}

impl Assistant for OllamaAssistant {
    fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!(model = %self.model, %url, "sending prompt");

        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self.client.post(&url).json(&body).send().map_err(|err| {
            if err.is_connect() {
                AppError::service(format!("cannot connect to assistant at {}", self.endpoint))
            } else if err.is_timeout() {
                AppError::service("assistant request timed out")
            } else {
                AppError::service(err.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(AppError::service(format!(
                "assistant returned status {}",
                response.status()
            )));
        }

        let data: serde_json::Value = response
            .json()
            .map_err(|err| AppError::service(format!("invalid assistant response: {err}")))?;
        let text = data["response"].as_str().unwrap_or("").trim().to_string();
        if text.is_empty() {
            return Err(AppError::service("assistant returned an empty response"));
        }

        Ok(text)
    }
}

pub fn motivational_quote(assistant: &dyn Assistant) -> String {
    displayable(assistant.generate(QUOTE_PROMPT))
}

pub fn ask(assistant: &dyn Assistant, question: &str) -> String {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return EMPTY_QUESTION_MESSAGE.to_string();
    }
    displayable(assistant.generate(trimmed))
}

pub fn task_help(assistant: &dyn Assistant, task_text: &str) -> String {
    displayable(assistant.generate(&task_help_prompt(task_text)))
}

pub fn task_help_prompt(task_text: &str) -> String {
    format!("Help me complete this task: {}", task_text.trim())
}

fn displayable(result: Result<String, AppError>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => {
            warn!(error = %err, "assistant request failed");
            format!("Error: {}", err.message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Assistant, EMPTY_QUESTION_MESSAGE, OllamaAssistant, QUOTE_PROMPT, ask, motivational_quote,
        task_help, task_help_prompt,
    };
    use crate::config::AssistantConfig;
    use crate::error::AppError;
    use std::cell::RefCell;

    struct EchoAssistant {
        prompts: RefCell<Vec<String>>,
    }

    impl EchoAssistant {
        fn new() -> Self {
            Self {
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Assistant for EchoAssistant {
        fn generate(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(format!("echo: {prompt}"))
        }
    }

    struct DownAssistant;

    impl Assistant for DownAssistant {
        fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            Err(AppError::service("assistant returned status 503"))
        }
    }

    #[test]
    fn quote_uses_fixed_prompt() {
        let assistant = EchoAssistant::new();
        let quote = motivational_quote(&assistant);

        assert_eq!(quote, format!("echo: {QUOTE_PROMPT}"));
    }

    #[test]
    fn ask_rejects_blank_question_without_calling_out() {
        let assistant = EchoAssistant::new();

        assert_eq!(ask(&assistant, "   "), EMPTY_QUESTION_MESSAGE);
        assert!(assistant.prompts.borrow().is_empty());
    }

    #[test]
    fn ask_passes_trimmed_question() {
        let assistant = EchoAssistant::new();
        let answer = ask(&assistant, "  what is a pomodoro? ");

        assert_eq!(answer, "echo: what is a pomodoro?");
    }

    #[test]
    fn task_help_wraps_task_text() {
        let assistant = EchoAssistant::new();
        task_help(&assistant, "Write report");

        assert_eq!(
            assistant.prompts.borrow().as_slice(),
            &["Help me complete this task: Write report".to_string()]
        );
        assert_eq!(
            task_help_prompt(" Call client "),
            "Help me complete this task: Call client"
        );
    }

    #[test]
    fn failures_become_messages() {
        assert_eq!(
            motivational_quote(&DownAssistant),
            "Error: assistant returned status 503"
        );
        assert_eq!(
            ask(&DownAssistant, "hello"),
            "Error: assistant returned status 503"
        );
    }

    #[test]
    fn unreachable_endpoint_becomes_message() {
        let config = AssistantConfig {
            endpoint: Some("http://127.0.0.1:1".into()),
            model: None,
        };
        let assistant = OllamaAssistant::new(&config).unwrap();
        let answer = ask(&assistant, "hello");

        assert!(answer.starts_with("Error: "));
    }
}
