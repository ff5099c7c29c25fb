//! Interactive loop: slash commands drive search, anything else is a chat message.

use anyhow::Result;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::App;
use crate::models::{FilterUpdate, PageLimit, SearchMode};
use crate::prefs::Preferences;
use crate::render;
use crate::search::{SearchState, SearchStatus};
use crate::session::{ChatOutcome, ChatStatus, SessionState};

const HELP: &str = "\
/search <text>     search with the current mode and filters
/browse            list jobs without a query
/ai on|off         toggle AI-assisted search
/limit 10|20|50    page size
/company [name]    company filter (blank clears)
/location [name]   location filter (blank clears)
/jobs              show the current results
/select <n>        chat about result n
/deselect          chat without a job
/history           show the conversation
/theme             toggle dark/light
/quit              leave
anything else is sent to the assistant";

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Search(String),
    Browse,
    Mode(SearchMode),
    Filter(FilterUpdate),
    Jobs,
    Select(usize),
    Deselect,
    History,
    Theme,
    Help,
    Quit,
    Chat(String),
    Invalid(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<ShellCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(ShellCommand::Chat(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "search" | "s" => ShellCommand::Search(arg.to_string()),
        "browse" | "b" => ShellCommand::Browse,
        "ai" => match arg {
            "on" => ShellCommand::Mode(SearchMode::AiAssisted),
            "off" => ShellCommand::Mode(SearchMode::Traditional),
            _ => ShellCommand::Invalid("usage: /ai on|off".to_string()),
        },
        "limit" => match arg.parse::<u32>().map(PageLimit::try_from) {
            Ok(Ok(limit)) => ShellCommand::Filter(FilterUpdate::Limit(limit)),
            Ok(Err(e)) => ShellCommand::Invalid(e.to_string()),
            Err(_) => ShellCommand::Invalid("usage: /limit 10|20|50".to_string()),
        },
        "company" => ShellCommand::Filter(FilterUpdate::Company(arg.to_string())),
        "location" => ShellCommand::Filter(FilterUpdate::Location(arg.to_string())),
        "jobs" => ShellCommand::Jobs,
        "select" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ShellCommand::Select(n - 1),
            _ => ShellCommand::Invalid("usage: /select <n> (from /jobs)".to_string()),
        },
        "deselect" => ShellCommand::Deselect,
        "history" => ShellCommand::History,
        "theme" => ShellCommand::Theme,
        "help" | "?" => ShellCommand::Help,
        "quit" | "exit" | "q" => ShellCommand::Quit,
        other => ShellCommand::Invalid(format!("unknown command '/{}', try /help", other)),
    };
    Some(command)
}

fn prompt(app: &App) -> Result<()> {
    let state = app.search.snapshot();
    let job = app
        .session
        .snapshot()
        .selected_job
        .map(|j| format!(" @{}", render::truncate(&j.title, 20)))
        .unwrap_or_default();
    print!("[{}{}]> ", state.mode, job);
    std::io::stdout().flush()?;
    Ok(())
}

/// Awaits `request`, calling `on_interrupt` on Ctrl-C and continuing to wait
/// so the request can settle its own state.
async fn interruptible<F: Future>(request: F, on_interrupt: impl Fn()) -> F::Output {
    tokio::pin!(request);
    loop {
        tokio::select! {
            output = &mut request => return output,
            _ = tokio::signal::ctrl_c() => on_interrupt(),
        }
    }
}

/// Prints `message` the first time `view` publishes a state `busy` accepts.
/// The caller aborts the task once its request is done.
fn announce_when<T, F>(
    mut view: watch::Receiver<T>,
    busy: F,
    message: &'static str,
) -> JoinHandle<()>
where
    T: Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        while view.changed().await.is_ok() {
            let hit = busy(&*view.borrow_and_update());
            if hit {
                println!("{}", message);
                return;
            }
        }
    })
}

fn searching(view: watch::Receiver<SearchState>) -> JoinHandle<()> {
    announce_when(view, |s: &SearchState| s.status == SearchStatus::Loading, "Searching...")
}

pub async fn run(app: &App, prefs: &Preferences) -> Result<()> {
    debug!(path = %prefs.path().display(), "preferences loaded");
    println!("Theme: {}", prefs.theme()?);
    let (stats, _) = app.startup().await;
    if let Some(stats) = stats {
        println!("{}", render::stats(&stats));
    }
    print!("{}", render::search_state(&app.search.snapshot()));
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(app)?;
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let Some(command) = parse(&line) else {
            continue;
        };
        debug!(?command, "shell command");

        match command {
            ShellCommand::Search(query) => {
                let progress = searching(app.search.subscribe());
                interruptible(app.search.search(&query), || {
                    app.search.cancel();
                })
                .await;
                progress.abort();
                print!("{}", render::search_state(&app.search.snapshot()));
            }
            ShellCommand::Browse => {
                let progress = searching(app.search.subscribe());
                interruptible(app.search.browse_all(), || {
                    app.search.cancel();
                })
                .await;
                progress.abort();
                print!("{}", render::search_state(&app.search.snapshot()));
            }
            ShellCommand::Mode(mode) => {
                app.search.set_mode(mode);
                println!("Search mode: {}", mode);
            }
            ShellCommand::Filter(update) => {
                app.search.set_filter(update);
                let filters = app.search.snapshot().filters;
                println!(
                    "Filters: company='{}' location='{}' limit={} (re-run a search to apply)",
                    filters.company, filters.location, filters.limit
                );
            }
            ShellCommand::Jobs => {
                print!("{}", render::search_state(&app.search.snapshot()));
            }
            ShellCommand::Select(position) => match app.select_job_at(position) {
                Some(job) => print!("{}", render::job_detail(&job)),
                None => println!("No job #{} in the current results.", position + 1),
            },
            ShellCommand::Deselect => {
                app.session.deselect_job();
                println!("No job selected.");
            }
            ShellCommand::History => {
                print!("{}", render::session(&app.session.snapshot()));
            }
            ShellCommand::Theme => {
                println!("Theme: {}", prefs.toggle_theme()?);
            }
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => break,
            ShellCommand::Invalid(message) => println!("{}", message),
            ShellCommand::Chat(message) => {
                let progress = announce_when(
                    app.session.subscribe(),
                    |s: &SessionState| s.chat_status == ChatStatus::Sending,
                    "(waiting for the assistant)",
                );
                let outcome =
                    interruptible(app.session.send_message(&message), || app.session.cancel())
                        .await;
                progress.abort();
                let state = app.session.snapshot();
                match outcome {
                    ChatOutcome::Replied => {
                        if let Some(reply) = state.transcript.last() {
                            print!("{}", render::transcript_entry(reply));
                        }
                    }
                    ChatOutcome::Failed => {
                        println!(
                            "! {}",
                            state.last_error.as_deref().unwrap_or("message not delivered")
                        );
                    }
                    ChatOutcome::Ignored | ChatOutcome::Discarded => {}
                }
            }
        }
    }
    Ok(())
}
