//! Application root: owns the search orchestrator and the chat session.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chat::{ChatApi, HttpChatClient};
use crate::client::{HttpJobIndex, JobIndex};
use crate::config::Config;
use crate::models::{Filters, JobListing, Stats};
use crate::search::{Dispatch, SearchOrchestrator};
use crate::session::{ChatSession, TranscriptPolicy};

pub struct App {
    index: Arc<dyn JobIndex>,
    pub search: SearchOrchestrator,
    pub session: ChatSession,
}

impl App {
    pub fn new(
        index: Arc<dyn JobIndex>,
        chat: Arc<dyn ChatApi>,
        filters: Filters,
        policy: TranscriptPolicy,
    ) -> Self {
        Self {
            search: SearchOrchestrator::with_filters(index.clone(), filters),
            session: ChatSession::new(chat, policy),
            index,
        }
    }

    pub fn from_config(config: &Config, filters: Filters) -> Result<Self> {
        let index = HttpJobIndex::new(&config.api_url)?;
        let chat = HttpChatClient::new(config.chat_url())?;
        info!(api = %config.api_url, chat = %chat.endpoint(), "clients ready");
        Ok(Self::new(
            Arc::new(index),
            Arc::new(chat),
            filters,
            config.transcript_policy,
        ))
    }

    pub fn index(&self) -> &dyn JobIndex {
        self.index.as_ref()
    }

    /// Stats are decoration: a failure is logged and otherwise ignored.
    pub async fn load_stats(&self) -> Option<Stats> {
        match self.index.fetch_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "stats unavailable");
                None
            }
        }
    }

    /// Stats and the first browse page, fetched concurrently.
    pub async fn startup(&self) -> (Option<Stats>, Dispatch) {
        tokio::join!(self.load_stats(), self.search.browse_all())
    }

    /// Selects the `position`-th listing (zero based) of the current result.
    pub fn select_job_at(&self, position: usize) -> Option<JobListing> {
        let job = self
            .search
            .snapshot()
            .current
            .and_then(|result| result.jobs.into_iter().nth(position))?;
        self.session.select_job(job.clone());
        Some(job)
    }
}
