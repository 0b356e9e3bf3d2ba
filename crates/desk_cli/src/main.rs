use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use desk_cli::cli::{Cli, Command, TimerCommand, collect_config_overrides};
use desk_core::assistant::{self, Assistant, OllamaAssistant};
use desk_core::config::{self, Config};
use desk_core::error::AppError;
use desk_core::model::Task;
use desk_core::notify;
use desk_core::session::SessionContext;
use desk_core::timer::{self, ThreadSleeper, TickOutcome, TimerState};
use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::ops::ControlFlow;
use tabled::{Table, Tabled};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    position: usize,
    id: String,
    status: &'static str,
    #[tabled(rename = "task")]
    text: String,
}

fn status_label(task: &Task) -> &'static str {
    if task.done { "done" } else { "pending" }
}

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::json!({
        "id": task.id,
        "task": task.text,
        "done": task.done,
    })
}

fn print_task_json(task: &Task) {
    println!("{}", task_json(task));
}

fn print_tasks(tasks: &[Task], json: bool) {
    if json {
        let payload: Vec<serde_json::Value> = tasks.iter().map(task_json).collect();
        println!("{}", serde_json::Value::Array(payload));
        return;
    }

    if tasks.is_empty() {
        println!("No tasks");
        return;
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .enumerate()
        .map(|(position, task)| TaskRow {
            position,
            id: task.id.clone(),
            status: status_label(task),
            text: task.text.clone(),
        })
        .collect();
    println!("{}", Table::new(rows));
}

fn print_timer(timer: &TimerState, json: bool, label: &str) {
    if json {
        let payload = serde_json::json!({
            "remaining": timer.format_remaining(),
            "remaining_seconds": timer.remaining_seconds,
            "running": timer.running,
            "configured_minutes": timer.configured_minutes,
        });
        println!("{payload}");
    } else {
        let state = if timer.running { "running" } else { "stopped" };
        println!("{label}: {} ({state})", timer.format_remaining());
    }
}

fn print_answer(answer: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "answer": answer }));
    } else {
        println!("{answer}");
    }
}

/// Write failures happen after the in-memory change, so say so.
fn saved<T>(result: Result<T, AppError>) -> Result<T, AppError> {
    result.map_err(|err| match err {
        AppError::Io(message) => AppError::io(format!("edits may not be saved: {message}")),
        other => other,
    })
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("DESKAPP_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_base_config() -> Config {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error {
        eprintln!("WARNING: using default config: {err}");
    }
    loaded.config
}

fn open_session(config: Config) -> Result<SessionContext, AppError> {
    let session = SessionContext::open(config)?;
    if let Some(err) = session.tasks.load_warning() {
        eprintln!(
            "WARNING: could not read {}, starting with an empty list: {err}",
            session.tasks.path().display()
        );
    }
    Ok(session)
}

fn assistant_for(session: &SessionContext) -> Result<Box<dyn Assistant>, String> {
    OllamaAssistant::new(&session.config.assistant)
        .map(|client| Box::new(client) as Box<dyn Assistant>)
        .map_err(|err| format!("Error: {}", err.message()))
}

fn run_timer_command(
    action: TimerCommand,
    session: &mut SessionContext,
    json: bool,
    stop_requested: &mut dyn FnMut() -> bool,
) -> Result<(), AppError> {
    let countdown = &mut session.timer;
    match action {
        TimerCommand::Start => {
            let label = match countdown.start() {
                timer::Reinvoke::Never => "Timer already running",
                _ => "Timer started",
            };
            print_timer(countdown, json, label);
        }
        TimerCommand::Stop => {
            countdown.stop();
            print_timer(countdown, json, "Timer stopped");
        }
        TimerCommand::Reset => {
            countdown.reset();
            print_timer(countdown, json, "Timer reset");
        }
        TimerCommand::Set { minutes } => {
            countdown.set_configured_minutes(minutes);
            if json {
                print_timer(countdown, json, "");
            } else {
                println!(
                    "Timer length set to {} minutes (applies on reset)",
                    countdown.configured_minutes
                );
            }
        }
        TimerCommand::Tick => {
            let label = match countdown.tick() {
                TickOutcome::Stopped => "Timer is stopped",
                TickOutcome::Advanced { .. } => "Time left",
                TickOutcome::Completed | TickOutcome::Exhausted => "Time's up",
            };
            print_timer(countdown, json, label);
        }
        TimerCommand::Status => {
            print_timer(countdown, json, "Time left");
        }
        TimerCommand::Run { minutes } => {
            if let Some(minutes) = minutes {
                countdown.set_configured_minutes(minutes);
                countdown.reset();
            }
            countdown.start();
            let mut cancelled = false;
            let last = timer::drive(countdown, &ThreadSleeper, |state, outcome| {
                if !json {
                    println!("{}", state.format_remaining());
                }
                debug!(?outcome, "tick");
                if stop_requested() {
                    cancelled = true;
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            if cancelled {
                countdown.stop();
                print_timer(countdown, json, "Timer stopped");
                return Ok(());
            }

            if last == TickOutcome::Completed {
                let notifier = notify::notifier_from_env();
                notify::announce_timer_finished(notifier.as_ref(), countdown);
            }
            print_timer(countdown, json, "Time's up");
        }
    }

    Ok(())
}

fn run_command(
    cli: Cli,
    session: &mut SessionContext,
    stop_requested: &mut dyn FnMut() -> bool,
) -> Result<(), AppError> {
    match cli.command {
        Command::Add { text } => {
            let text = text.unwrap_or_default();
            match saved(session.tasks.add(&text))? {
                Some(task) => {
                    if cli.json {
                        print_task_json(&task);
                    } else {
                        println!("Added task: {} ({})", task.text, task.id);
                    }
                }
                None => {
                    if cli.json {
                        println!("null");
                    } else {
                        println!("No task added: text is empty");
                    }
                }
            }
        }
        Command::List => {
            print_tasks(session.tasks.tasks(), cli.json);
        }
        Command::Toggle { id } => {
            let task = saved(session.tasks.toggle(&id))?;
            print_toggled(&task, cli.json);
        }
        Command::Delete { id } => {
            let task = saved(session.tasks.remove(&id))?;
            print_deleted(&task, cli.json);
        }
        Command::ToggleAt { index } => match saved(session.tasks.toggle_at(index))? {
            Some(task) => print_toggled(&task, cli.json),
            None => print_stale(index, cli.json),
        },
        Command::DeleteAt { index } => match saved(session.tasks.remove_at(index))? {
            Some(task) => print_deleted(&task, cli.json),
            None => print_stale(index, cli.json),
        },
        Command::Timer { action } => {
            run_timer_command(action, session, cli.json, stop_requested)?;
        }
        Command::Clock => {
            let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
            let rendered = now
                .format(format_description!("[hour]:[minute]:[second]"))
                .map_err(|err| AppError::invalid_data(err.to_string()))?;
            if cli.json {
                println!("{}", serde_json::json!({ "time": rendered }));
            } else {
                println!("{rendered}");
            }
        }
        Command::Ask { question } => {
            let question = question.unwrap_or_default();
            let answer = if question.trim().is_empty() {
                assistant::EMPTY_QUESTION_MESSAGE.to_string()
            } else {
                match assistant_for(session) {
                    Ok(client) => assistant::ask(client.as_ref(), &question),
                    Err(message) => message,
                }
            };
            print_answer(&answer, cli.json);
        }
        Command::Quote => {
            let answer = match assistant_for(session) {
                Ok(client) => assistant::motivational_quote(client.as_ref()),
                Err(message) => message,
            };
            print_answer(&answer, cli.json);
        }
        Command::HelpTask { id } => {
            let text = session.tasks.get(&id)?.text.clone();
            let answer = match assistant_for(session) {
                Ok(client) => assistant::task_help(client.as_ref(), &text),
                Err(message) => message,
            };
            print_answer(&answer, cli.json);
        }
    }

    Ok(())
}

fn print_toggled(task: &Task, json: bool) {
    if json {
        print_task_json(task);
    } else if task.done {
        println!("Marked done: {} ({})", task.text, task.id);
    } else {
        println!("Marked pending: {} ({})", task.text, task.id);
    }
}

fn print_deleted(task: &Task, json: bool) {
    if json {
        print_task_json(task);
    } else {
        println!("Deleted task: {} ({})", task.text, task.id);
    }
}

fn print_stale(index: usize, json: bool) {
    if json {
        println!("null");
    } else {
        println!("No task at position {index}");
    }
}

/// Reads stdin on its own thread so a running countdown can still see
/// `timer stop` as soon as it is typed.
fn spawn_line_reader() -> Receiver<io::Result<String>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let failed = line.is_err();
            if sender.send(line).is_err() || failed {
                break;
            }
        }
    });
    receiver
}

fn is_stop_line(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    matches!(words.as_slice(), ["stop"] | ["timer", "stop"])
}

fn report_backup(session: &mut SessionContext) {
    if let Some(backup) = session.tasks.take_backup() {
        eprintln!(
            "WARNING: previous contents of {} kept at {}",
            session.tasks.path().display(),
            backup.display()
        );
    }
}

fn run_interactive() -> Result<(), AppError> {
    let mut session = open_session(load_base_config())?;
    let lines = spawn_line_reader();
    let mut queued: VecDeque<io::Result<String>> = VecDeque::new();

    loop {
        let next = match queued.pop_front() {
            Some(next) => next,
            None => match lines.recv() {
                Ok(next) => next,
                Err(_) => break,
            },
        };
        let input = next.map_err(|err| AppError::io(err.to_string()))?;

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("desk".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if is_informational(&err) => {
                println!("{err}");
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if !cli.config_override.is_empty() {
            eprintln!("WARNING: config overrides are ignored inside an interactive session");
        }

        // Lines typed while a command runs are queued, except a stop request.
        let mut stop_requested = || {
            while let Ok(pending) = lines.try_recv() {
                if matches!(&pending, Ok(text) if is_stop_line(text)) {
                    return true;
                }
                queued.push_back(pending);
            }
            false
        };

        let result = run_command(cli, &mut session, &mut stop_requested);
        report_backup(&mut session);
        if let Err(err) = result {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn is_informational(err: &clap::Error) -> bool {
    matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

fn run_once(cli: Cli) -> Result<(), AppError> {
    let overrides =
        collect_config_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    let config = config::merge_overrides(&load_base_config(), &overrides);
    let mut session = open_session(config)?;
    let result = run_command(cli, &mut session, &mut || false);
    report_backup(&mut session);
    result
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        init_logging(false);
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if is_informational(&err) => err.exit(),
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);
    if let Err(err) = run_once(cli) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
