use clap::{Parser, Subcommand};
use desk_core::config::ConfigOverrides;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: desk add "Write report"
    Add { text: Option<String> },
    /// List tasks in order
    ///
    /// Example: desk list
    List,
    /// Flip a task between done and pending
    ///
    /// Example: desk toggle task-1718000000000000000
    Toggle { id: String },
    /// Delete a task
    ///
    /// Example: desk delete task-1718000000000000000
    Delete { id: String },
    /// Flip the task at a list position (0-based); stale positions are ignored
    ///
    /// Example: desk toggle-at 0
    ToggleAt { index: usize },
    /// Delete the task at a list position (0-based); stale positions are ignored
    ///
    /// Example: desk delete-at 0
    DeleteAt { index: usize },
    /// Control the Pomodoro timer
    ///
    /// Example: desk timer run
    Timer {
        #[command(subcommand)]
        action: TimerCommand,
    },
    /// Show the current local time
    ///
    /// Example: desk clock
    Clock,
    /// Ask the assistant a question
    ///
    /// Example: desk ask "How do I plan my day?"
    Ask { question: Option<String> },
    /// Get a motivational quote from the assistant
    ///
    /// Example: desk quote
    Quote,
    /// Ask the assistant for help with a task
    ///
    /// Example: desk help-task task-1718000000000000000
    HelpTask { id: String },
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    /// Start counting down
    Start,
    /// Pause the countdown
    Stop,
    /// Stop and refill to the configured length
    Reset,
    /// Set the timer length in minutes (1-60), applied on reset
    ///
    /// Example: desk timer set 50
    Set { minutes: u32 },
    /// Advance the countdown by one second
    Tick,
    /// Show remaining time
    Status,
    /// Run the countdown in the foreground until it finishes
    ///
    /// Example: desk timer run --minutes 5
    Run {
        #[arg(long, value_name = "MINUTES")]
        minutes: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    DefaultMinutes,
    StorePath,
    AssistantEndpoint,
    AssistantModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let (field, remainder) = key_raw
        .split_once('.')
        .map(|(field, rest)| (field.trim(), Some(rest.trim())))
        .unwrap_or((key_raw.trim(), None));

    let canonical_field =
        canonicalize_flag_name(field).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match (canonical_field.as_str(), remainder) {
        ("default_minutes" | "minutes", None) => ConfigOverrideTarget::DefaultMinutes,
        ("store_path", None) => ConfigOverrideTarget::StorePath,
        ("assistant", Some(sub)) => match canonicalize_flag_name(sub).as_deref() {
            Some("endpoint") => ConfigOverrideTarget::AssistantEndpoint,
            Some("model") => ConfigOverrideTarget::AssistantModel,
            Some(other) => return Err(format!("unknown assistant field '{other}'")),
            None => return Err("assistant override requires a field name".to_string()),
        },
        ("assistant", None) => {
            return Err("assistant override requires a field name".to_string());
        }
        ("default_minutes" | "minutes" | "store_path", Some(_)) => {
            return Err(format!("{canonical_field} override cannot have subfields"));
        }
        (other, _) => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Fold every `--config-override` value into one set of overrides; later
/// values win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::DefaultMinutes => {
                let minutes = parsed
                    .value
                    .parse::<u32>()
                    .map_err(|_| format!("default_minutes must be a number, got '{}'", parsed.value))?;
                overrides.default_minutes = Some(minutes);
            }
            ConfigOverrideTarget::StorePath => {
                if parsed.value.is_empty() {
                    return Err("store_path override cannot be empty".to_string());
                }
                overrides.store_path = Some(PathBuf::from(parsed.value));
            }
            ConfigOverrideTarget::AssistantEndpoint => {
                overrides.assistant_endpoint = Some(parsed.value);
            }
            ConfigOverrideTarget::AssistantModel => {
                overrides.assistant_model = Some(parsed.value);
            }
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
