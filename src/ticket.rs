//! Request sequencing and cancellation.
//!
//! Every dispatch takes a [`Ticket`]. Only the most recently issued ticket
//! may write its response into shared state; anything older is stale and
//! gets dropped. Issuing a ticket cancels the one before it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::RequestError;

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Runs `request` until it finishes or this token is cancelled.
    pub async fn guard<T, F>(&self, request: F) -> Result<T, RequestError>
    where
        F: Future<Output = Result<T, RequestError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RequestError::Cancelled),
            outcome = request => outcome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    pub seq: u64,
    pub cancel: CancelToken,
}

#[derive(Debug, Default)]
pub struct Sequencer {
    latest: AtomicU64,
    in_flight: Mutex<Option<CancelToken>>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next ticket and cancels whichever one was in flight.
    pub fn issue(&self) -> Ticket {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancelToken::new();
        let previous = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(cancel.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        Ticket { seq, cancel }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.seq
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Cancels the in-flight ticket, if any. Returns whether one was pending.
    pub fn cancel_in_flight(&self) -> bool {
        let current = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match current {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Forgets the in-flight token once its request has settled.
    pub fn finish(&self, ticket: &Ticket) {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.is_latest(ticket) {
            slot.take();
        }
    }
}
