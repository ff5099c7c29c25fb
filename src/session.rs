//! Selected-job context and the chat transcript bound to it.
//!
//! A user turn is appended optimistically as `Pending` before the network
//! round trip, then marked `Acknowledged` (and followed by the reply) or
//! `Failed`. Failed turns stay in the transcript.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, watch};
use tracing::{debug, info, warn};

use crate::chat::ChatApi;
use crate::error::RequestError;
use crate::models::{ChatRole, ChatTurn, JobListing, TranscriptEntry, TurnStatus};
use crate::ticket::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatStatus {
    #[default]
    Idle,
    Sending,
    Error,
}

/// What happens to the transcript when a different job is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TranscriptPolicy {
    /// Keep one conversation across job switches.
    #[default]
    Preserve,
    /// Start a fresh conversation whenever the selected job changes.
    ResetOnJobChange,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub selected_job: Option<JobListing>,
    pub transcript: Vec<TranscriptEntry>,
    pub chat_status: ChatStatus,
    pub last_error: Option<String>,
    /// Bumped each time a fresh conversation starts.
    pub conversation: u64,
}

impl SessionState {
    pub fn turns(&self) -> impl Iterator<Item = &ChatTurn> {
        self.transcript.iter().map(|entry| &entry.turn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied,
    /// Blank message, nothing sent.
    Ignored,
    Failed,
    /// The conversation was reset while the request was in flight.
    Discarded,
}

pub struct ChatSession {
    chat: Arc<dyn ChatApi>,
    policy: TranscriptPolicy,
    state: watch::Sender<SessionState>,
    // Tokio's mutex is FIFO, so replies land in submission order.
    send_gate: AsyncMutex<()>,
    in_flight: AtomicUsize,
    cancel: Mutex<CancelToken>,
}

impl ChatSession {
    pub fn new(chat: Arc<dyn ChatApi>, policy: TranscriptPolicy) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            chat,
            policy,
            state,
            send_gate: AsyncMutex::new(()),
            in_flight: AtomicUsize::new(0),
            cancel: Mutex::new(CancelToken::new()),
        }
    }

    /// Read-only feed for the view layer.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn select_job(&self, job: JobListing) {
        let reset = self.policy == TranscriptPolicy::ResetOnJobChange
            && self
                .state
                .borrow()
                .selected_job
                .as_ref()
                .is_some_and(|current| current.id != job.id);
        if reset {
            self.start_new_conversation();
        }
        info!(job_id = %job.id, title = %job.title, "job selected");
        self.state.send_modify(|s| s.selected_job = Some(job));
    }

    pub fn deselect_job(&self) {
        self.state.send_if_modified(|s| {
            let had = s.selected_job.take().is_some();
            if had {
                info!("job deselected");
            }
            had
        });
    }

    /// Cancels every chat request still in flight. Their user turns end up `Failed`.
    pub fn cancel(&self) {
        let mut slot = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.cancel();
        *slot = CancelToken::new();
    }

    fn start_new_conversation(&self) {
        self.cancel();
        self.state.send_modify(|s| {
            s.transcript.clear();
            s.chat_status = ChatStatus::Idle;
            s.last_error = None;
            s.conversation += 1;
            info!(conversation = s.conversation, "new conversation started");
        });
    }

    /// History for the user turn at `position`, read once every earlier send
    /// has settled: the turns before it plus the replies appended since.
    fn history_for(&self, position: usize, conversation: u64) -> Vec<ChatTurn> {
        let s = self.state.borrow();
        if s.conversation != conversation {
            return Vec::new();
        }
        let (before, after) = s.transcript.split_at(position.min(s.transcript.len()));
        before
            .iter()
            .chain(
                after
                    .iter()
                    .skip(1)
                    .filter(|entry| entry.turn.role == ChatRole::Assistant),
            )
            .map(|entry| entry.turn.clone())
            .collect()
    }

    pub async fn send_message(&self, text: &str) -> ChatOutcome {
        let text = text.trim();
        if text.is_empty() {
            return ChatOutcome::Ignored;
        }

        let mut context: Option<JobListing> = None;
        let mut position = 0usize;
        let mut conversation = 0u64;
        self.state.send_modify(|s| {
            context = s.selected_job.clone();
            position = s.transcript.len();
            conversation = s.conversation;
            s.transcript.push(TranscriptEntry {
                turn: ChatTurn::user(text),
                status: TurnStatus::Pending,
            });
            s.chat_status = ChatStatus::Sending;
        });
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let _gate = self.send_gate.lock().await;
        let history = self.history_for(position, conversation);
        debug!(
            conversation,
            position,
            history_len = history.len(),
            "sending chat turn"
        );
        let outcome = cancel
            .guard(self.chat.send_turn(text, &history, context.as_ref()))
            .await;
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;

        let mut result = ChatOutcome::Discarded;
        self.state.send_modify(|s| {
            if s.conversation != conversation {
                debug!(conversation, "reply for an abandoned conversation dropped");
                if remaining == 0 {
                    s.chat_status = ChatStatus::Idle;
                }
                return;
            }
            match outcome {
                Ok(reply) => {
                    if let Some(entry) = s.transcript.get_mut(position) {
                        entry.status = TurnStatus::Acknowledged;
                    }
                    s.transcript.push(TranscriptEntry {
                        turn: ChatTurn::assistant(&reply),
                        status: TurnStatus::Acknowledged,
                    });
                    if remaining == 0 {
                        s.chat_status = ChatStatus::Idle;
                        s.last_error = None;
                    }
                    result = ChatOutcome::Replied;
                }
                Err(e) => {
                    warn!(error = %e, "chat turn failed");
                    if let Some(entry) = s.transcript.get_mut(position) {
                        entry.status = TurnStatus::Failed;
                    }
                    s.chat_status = if remaining == 0 && e == RequestError::Cancelled {
                        ChatStatus::Idle
                    } else if remaining == 0 {
                        ChatStatus::Error
                    } else {
                        ChatStatus::Sending
                    };
                    s.last_error = Some(format!("Message not delivered: {}", e));
                    result = ChatOutcome::Failed;
                }
            }
        });
        result
    }
}
