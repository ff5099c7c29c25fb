//! Search orchestration: which endpoint to hit, and how results land in state.
//!
//! State transitions:
//! - `search` / `browse_all`: Idle|Error -> Loading -> Idle (success) | Error (failure)
//! - `cancel`: Loading -> Idle, `current` untouched
//!
//! Only the latest dispatch may write its outcome. A response for an older
//! dispatch is dropped even if it arrives last.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::JobIndex;
use crate::error::RequestError;
use crate::models::{FilterUpdate, Filters, SearchMode, SearchResult};
use crate::ticket::{Sequencer, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Loading,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub mode: SearchMode,
    pub query_text: String,
    pub filters: Filters,
    pub current: Option<SearchResult>,
    pub status: SearchStatus,
    pub last_error: Option<String>,
}

/// What happened to a single search or browse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Response written into state.
    Applied,
    /// Nothing sent (blank query).
    Ignored,
    /// A later dispatch owns the state; this response was dropped.
    Superseded,
    Failed,
    Cancelled,
}

pub struct SearchOrchestrator {
    index: Arc<dyn JobIndex>,
    state: watch::Sender<SearchState>,
    sequencer: Sequencer,
}

impl SearchOrchestrator {
    pub fn with_filters(index: Arc<dyn JobIndex>, filters: Filters) -> Self {
        let (state, _) = watch::channel(SearchState {
            filters,
            ..SearchState::default()
        });
        Self {
            index,
            state,
            sequencer: Sequencer::new(),
        }
    }

    /// Read-only feed for the view layer.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn set_mode(&self, mode: SearchMode) {
        self.state.send_if_modified(|s| {
            if s.mode == mode {
                return false;
            }
            debug!(from = %s.mode, to = %mode, "search mode changed");
            s.mode = mode;
            true
        });
    }

    pub fn set_filter(&self, update: FilterUpdate) {
        self.state.send_modify(|s| s.filters.apply(update));
    }

    #[cfg(test)]
    pub fn set_query_text(&self, text: &str) {
        self.state.send_modify(|s| s.query_text = text.to_string());
    }

    /// Cancels the in-flight request. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let cancelled = self.sequencer.cancel_in_flight();
        if cancelled {
            info!(seq = self.sequencer.latest(), "search request cancelled");
        }
        cancelled
    }

    pub async fn search(&self, query_text: &str) -> Dispatch {
        let query = query_text.trim();
        if query.is_empty() {
            debug!("blank query, nothing to search");
            return Dispatch::Ignored;
        }

        let (mode, filters) = {
            let s = self.state.borrow();
            (s.mode, s.filters.clone())
        };
        let ticket = self.sequencer.issue();
        self.state.send_modify(|s| {
            s.query_text = query.to_string();
            s.status = SearchStatus::Loading;
            // Stale analysis must not sit next to a pending request.
            if let Some(current) = s.current.as_mut() {
                current.clear_ai_artifacts();
            }
        });
        info!(seq = ticket.seq, %mode, query, limit = %filters.limit, "search dispatched");

        let outcome = match mode {
            SearchMode::Traditional => ticket
                .cancel
                .guard(self.index.fetch_traditional(Some(query), &filters, 0))
                .await
                .map(SearchResult::from_jobs),
            SearchMode::AiAssisted => {
                ticket
                    .cancel
                    .guard(self.index.fetch_ai_assisted(query, filters.limit))
                    .await
            }
        };

        self.settle(&ticket, outcome, |_| {})
    }

    /// Lists the first page of everything, always via the traditional endpoint.
    pub async fn browse_all(&self) -> Dispatch {
        let filters = self.state.borrow().filters.clone();
        let ticket = self.sequencer.issue();
        self.state.send_modify(|s| s.status = SearchStatus::Loading);
        info!(seq = ticket.seq, limit = %filters.limit, "browse dispatched");

        let outcome = ticket
            .cancel
            .guard(self.index.fetch_traditional(None, &filters, 0))
            .await
            .map(SearchResult::from_jobs);

        self.settle(&ticket, outcome, |s| s.query_text.clear())
    }

    fn settle(
        &self,
        ticket: &Ticket,
        outcome: Result<SearchResult, RequestError>,
        on_success: impl FnOnce(&mut SearchState),
    ) -> Dispatch {
        if !self.sequencer.is_latest(ticket) {
            debug!(
                seq = ticket.seq,
                latest = self.sequencer.latest(),
                "dropping superseded response"
            );
            return Dispatch::Superseded;
        }
        self.sequencer.finish(ticket);

        match outcome {
            Ok(result) => {
                debug!(seq = ticket.seq, jobs = result.jobs.len(), "results applied");
                self.state.send_modify(|s| {
                    s.current = Some(result);
                    s.status = SearchStatus::Idle;
                    s.last_error = None;
                    on_success(s);
                });
                Dispatch::Applied
            }
            Err(RequestError::Cancelled) => {
                self.state.send_modify(|s| s.status = SearchStatus::Idle);
                Dispatch::Cancelled
            }
            Err(e) => {
                warn!(seq = ticket.seq, error = %e, "job search request failed");
                self.state.send_modify(|s| {
                    s.current.get_or_insert_with(SearchResult::default).jobs.clear();
                    s.status = SearchStatus::Error;
                    s.last_error = Some(e.to_string());
                });
                Dispatch::Failed
            }
        }
    }
}
