use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::client::DEFAULT_API_URL;
use crate::models::{Filters, PageLimit};
use crate::session::TranscriptPolicy;

/// Settings shared by every subcommand. Flags win over environment variables.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base URL of the job search API
    #[arg(long, env = "JOBSEEK_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Base URL of the chat API (defaults to the job search API)
    #[arg(long, env = "JOBSEEK_CHAT_URL", global = true)]
    pub chat_url: Option<String>,

    /// Directory holding local preferences
    #[arg(long, env = "JOBSEEK_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// What happens to the chat transcript when a different job is selected
    #[arg(long, value_enum, default_value_t = TranscriptPolicy::Preserve, global = true)]
    pub transcript_policy: TranscriptPolicy,
}

impl Config {
    pub fn chat_url(&self) -> &str {
        self.chat_url.as_deref().unwrap_or(&self.api_url)
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobseek") {
            Ok(proj_dirs.data_dir().to_path_buf())
        } else {
            std::env::current_dir().context("Failed to resolve a data directory")
        }
    }
}

/// Filter flags accepted by `search`, `browse` and `shell`.
#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Results per page (10, 20 or 50)
    #[arg(short, long, default_value = "20")]
    pub limit: u32,

    /// Only listings from this company
    #[arg(short, long)]
    pub company: Option<String>,

    /// Only listings in this location
    #[arg(short = 'L', long)]
    pub location: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Result<Filters> {
        Ok(Filters {
            company: self.company.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            limit: PageLimit::try_from(self.limit)?,
        })
    }
}
