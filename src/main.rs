mod app;
mod chat;
mod client;
mod config;
mod error;
#[cfg(test)]
mod fakes;
mod models;
mod prefs;
mod render;
mod search;
mod session;
mod shell;
mod ticket;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use app::App;
use config::{Config, FilterArgs};
use models::{Filters, JobId, SearchMode, Theme};
use prefs::Preferences;
use search::Dispatch;

#[derive(Parser)]
#[command(name = "jobseek")]
#[command(about = "Search a job index, with optional AI assistance, and chat about listings")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for jobs
    Search {
        /// Free-text query
        query: String,

        /// Let the language model interpret the query and analyse the results
        #[arg(long)]
        ai: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// List jobs without a query
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show a single job
    Show {
        /// Job ID
        id: i64,
    },

    /// Show index statistics
    Stats,

    /// Show or change the colour theme
    Theme {
        #[arg(value_enum, default_value_t = ThemeAction::Show)]
        action: ThemeAction,
    },

    /// Interactive search and chat session
    Shell {
        /// Start in AI-assisted search mode
        #[arg(long)]
        ai: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ThemeAction {
    Show,
    Toggle,
    Dark,
    Light,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn mode_for(ai: bool) -> SearchMode {
    if ai {
        SearchMode::AiAssisted
    } else {
        SearchMode::Traditional
    }
}

fn print_outcome(app: &App, outcome: Dispatch) -> Result<()> {
    let state = app.search.snapshot();
    print!("{}", render::search_state(&state));
    match outcome {
        Dispatch::Failed => Err(anyhow!(
            "{}",
            state.last_error.unwrap_or_else(|| "search failed".to_string())
        )),
        _ => Ok(()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = cli.config;

    match cli.command {
        Commands::Search { query, ai, filters } => {
            let app = App::from_config(&config, filters.to_filters()?)?;
            app.search.set_mode(mode_for(ai));
            let outcome = app.search.search(&query).await;
            if outcome == Dispatch::Ignored {
                println!("Nothing to search for.");
                return Ok(());
            }
            print_outcome(&app, outcome)?;
        }

        Commands::Browse { filters } => {
            let app = App::from_config(&config, filters.to_filters()?)?;
            let outcome = app.search.browse_all().await;
            print_outcome(&app, outcome)?;
        }

        Commands::Show { id } => {
            let app = App::from_config(&config, Filters::default())?;
            let job = app.index().fetch_job(JobId(id)).await?;
            print!("{}", render::job_detail(&job));
        }

        Commands::Stats => {
            let app = App::from_config(&config, Filters::default())?;
            if let Some(stats) = app.load_stats().await {
                println!("{}", render::stats(&stats));
            }
        }

        Commands::Theme { action } => {
            let prefs = Preferences::open(&config.data_dir()?)?;
            let theme = match action {
                ThemeAction::Show => prefs.theme()?,
                ThemeAction::Toggle => prefs.toggle_theme()?,
                ThemeAction::Dark => {
                    prefs.set_theme(Theme::Dark)?;
                    Theme::Dark
                }
                ThemeAction::Light => {
                    prefs.set_theme(Theme::Light)?;
                    Theme::Light
                }
            };
            println!("Theme: {}", theme);
        }

        Commands::Shell { ai, filters } => {
            let prefs = Preferences::open(&config.data_dir()?)?;
            let app = App::from_config(&config, filters.to_filters()?)?;
            app.search.set_mode(mode_for(ai));
            shell::run(&app, &prefs).await?;
        }
    }

    Ok(())
}
