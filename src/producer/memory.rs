//! In-process message sink
//!
//! Used by `--dry-run` to push a URL dump through the full producer without a
//! broker, and by tests to script broker behavior.

use crate::producer::message::CrawlMessage;
use crate::producer::sink::{DeliveryError, MessageSink, PendingDelivery, SinkError, SubmitError};
use futures::FutureExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type FailurePredicate = Arc<dyn Fn(&CrawlMessage) -> bool + Send + Sync>;

/// Sink that acknowledges messages in memory
///
/// Clones share state, so a test can keep a handle while the producer owns
/// the sink.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<MemoryState>,
    capacity: Option<usize>,
    ack_delay: Option<Duration>,
    fail_when: Option<FailurePredicate>,
    keep_messages: bool,
}

#[derive(Default)]
struct MemoryState {
    messages: Mutex<Vec<CrawlMessage>>,
    submitted: AtomicUsize,
    outstanding: AtomicUsize,
    queue_full_rejections: AtomicUsize,
    closed: AtomicBool,
}

impl MemorySink {
    /// Sink that acknowledges everything and only counts submissions
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep decoded copies of every submitted message
    pub fn recording() -> Self {
        Self {
            keep_messages: true,
            ..Self::default()
        }
    }

    /// Report a full queue while `capacity` deliveries are unresolved
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Resolve each delivery only after `delay`
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = Some(delay);
        self
    }

    /// Fail delivery of every message matching `predicate`
    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CrawlMessage) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    /// Messages accepted so far (only populated by [`MemorySink::recording`])
    pub fn messages(&self) -> Vec<CrawlMessage> {
        self.state
            .messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn submitted(&self) -> usize {
        self.state.submitted.load(Ordering::SeqCst)
    }

    /// Deliveries handed out but not yet resolved
    pub fn outstanding(&self) -> usize {
        self.state.outstanding.load(Ordering::SeqCst)
    }

    /// Number of submissions refused because the queue was full
    pub fn queue_full_rejections(&self) -> usize {
        self.state.queue_full_rejections.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl MessageSink for MemorySink {
    fn submit(&mut self, payload: &[u8]) -> Result<PendingDelivery, SubmitError> {
        if let Some(capacity) = self.capacity {
            if self.outstanding() >= capacity {
                self.state
                    .queue_full_rejections
                    .fetch_add(1, Ordering::SeqCst);
                return Err(SubmitError::QueueFull);
            }
        }

        let message: CrawlMessage = serde_json::from_slice(payload)
            .map_err(|e| SubmitError::Rejected(format!("undecodable payload: {}", e)))?;

        let outcome = match &self.fail_when {
            Some(predicate) if predicate(&message) => Err(DeliveryError::Broker(format!(
                "message for {} refused",
                message.url
            ))),
            _ => Ok(()),
        };

        if self.keep_messages {
            if let Ok(mut messages) = self.state.messages.lock() {
                messages.push(message);
            }
        }
        self.state.submitted.fetch_add(1, Ordering::SeqCst);
        self.state.outstanding.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&self.state);
        let delay = self.ack_delay;
        Ok(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            state.outstanding.fetch_sub(1, Ordering::SeqCst);
            outcome
        }
        .boxed())
    }

    fn close(self) -> Result<(), SinkError> {
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
