//! Scripted stand-ins for the remote services, shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::chat::ChatApi;
use crate::client::JobIndex;
use crate::error::RequestError;
use crate::models::{
    AiAnalysis, ChatTurn, Filters, JobId, JobListing, PageLimit, ParsedQuery, SearchResult, Stats,
};

#[derive(Debug, Clone, PartialEq)]
pub enum IndexCall {
    Traditional {
        query: Option<String>,
        filters: Filters,
        offset: u32,
    },
    AiAssisted {
        query: String,
        limit: PageLimit,
    },
    Stats,
    Job(JobId),
}

struct Scripted<T> {
    outcome: Result<T, RequestError>,
    gate: Option<oneshot::Receiver<()>>,
}

pub fn jobs(ids: &[i64]) -> Vec<JobListing> {
    ids.iter()
        .map(|id| JobListing::new(*id, &format!("Job {}", id), "Acme", "Remote"))
        .collect()
}

pub fn ai_result(ids: &[i64], summary: &str, keywords: &[&str]) -> SearchResult {
    SearchResult {
        jobs: jobs(ids),
        ai_analysis: Some(AiAnalysis {
            summary: summary.to_string(),
            ..AiAnalysis::default()
        }),
        parsed_query: Some(ParsedQuery {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..ParsedQuery::default()
        }),
        summary: None,
    }
}

#[derive(Default)]
pub struct FakeIndex {
    calls: Mutex<Vec<IndexCall>>,
    replies: Mutex<VecDeque<Scripted<SearchResult>>>,
    stats: Mutex<Option<Result<Stats, RequestError>>>,
}

impl FakeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, outcome: Result<SearchResult, RequestError>) {
        self.replies.lock().unwrap().push_back(Scripted {
            outcome,
            gate: None,
        });
    }

    /// Queues a reply that is held back until the returned sender fires.
    pub fn reply_gated(&self, outcome: Result<SearchResult, RequestError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Scripted {
            outcome,
            gate: Some(rx),
        });
        tx
    }

    pub fn set_stats(&self, outcome: Result<Stats, RequestError>) {
        *self.stats.lock().unwrap() = Some(outcome);
    }

    pub fn calls(&self) -> Vec<IndexCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn next(&self, call: IndexCall) -> Result<SearchResult, RequestError> {
        self.calls.lock().unwrap().push(call);
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted { outcome, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                outcome
            }
            None => Ok(SearchResult::default()),
        }
    }
}

#[async_trait]
impl JobIndex for FakeIndex {
    async fn fetch_traditional(
        &self,
        query: Option<&str>,
        filters: &Filters,
        offset: u32,
    ) -> Result<Vec<JobListing>, RequestError> {
        let call = IndexCall::Traditional {
            query: query.map(str::to_string),
            filters: filters.clone(),
            offset,
        };
        self.next(call).await.map(|result| result.jobs)
    }

    async fn fetch_ai_assisted(
        &self,
        query: &str,
        limit: PageLimit,
    ) -> Result<SearchResult, RequestError> {
        let call = IndexCall::AiAssisted {
            query: query.to_string(),
            limit,
        };
        self.next(call).await
    }

    async fn fetch_stats(&self) -> Result<Stats, RequestError> {
        self.calls.lock().unwrap().push(IndexCall::Stats);
        self.stats
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Err(RequestError::Http(404)))
    }

    async fn fetch_job(&self, id: JobId) -> Result<JobListing, RequestError> {
        self.calls.lock().unwrap().push(IndexCall::Job(id));
        Ok(JobListing::new(id.0, "Looked up", "Acme", "Remote"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCall {
    pub message: String,
    pub history: Vec<ChatTurn>,
    pub context: Option<JobListing>,
}

#[derive(Default)]
pub struct FakeChat {
    calls: Mutex<Vec<ChatCall>>,
    replies: Mutex<VecDeque<Scripted<String>>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, outcome: Result<String, RequestError>) {
        self.replies.lock().unwrap().push_back(Scripted {
            outcome,
            gate: None,
        });
    }

    pub fn reply_gated(&self, outcome: Result<String, RequestError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Scripted {
            outcome,
            gate: Some(rx),
        });
        tx
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send_turn(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: Option<&JobListing>,
    ) -> Result<String, RequestError> {
        self.calls.lock().unwrap().push(ChatCall {
            message: message.to_string(),
            history: history.to_vec(),
            context: context.cloned(),
        });
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(Scripted { outcome, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                outcome
            }
            None => Ok(format!("re: {}", message)),
        }
    }
}
