//! Streaming producer
//!
//! Turns a stream of URL rows into crawl messages and pushes them into a
//! [`MessageSink`], keeping track of every pending delivery until it resolves.

use crate::config::Config;
use crate::producer::message::CrawlMessage;
use crate::producer::sink::{DeliveryError, MessageSink, SubmitError};
use crate::source::UrlRow;
use crate::InputError;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::time::Duration;
use tokio::time::Instant;

/// Pause between submission attempts while the queue is full and nothing is pending locally
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(50);

/// Counters for one producer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProduceSummary {
    /// Messages accepted by the sink
    pub submitted: u64,
    /// Messages acknowledged by the broker
    pub sent: u64,
    /// Messages that could not be enqueued or whose delivery failed
    pub failed: u64,
    /// Input rows that could not be read
    pub skipped: u64,
}

type Outcome = (String, Result<(), DeliveryError>);

/// Pending deliveries and their running tallies
#[derive(Default)]
struct Deliveries {
    pending: FuturesUnordered<BoxFuture<'static, Outcome>>,
    sent: u64,
    failed: u64,
}

impl Deliveries {
    fn push(&mut self, delivery: BoxFuture<'static, Outcome>) {
        self.pending.push(delivery);
    }

    fn record(&mut self, (url, outcome): Outcome) {
        match outcome {
            Ok(()) => self.sent += 1,
            Err(e) => {
                tracing::error!("Message delivery failed for {}: {}", url, e);
                self.failed += 1;
            }
        }
    }

    /// Records every delivery that has already resolved, without waiting
    fn reap(&mut self) {
        while let Some(Some(outcome)) = self.pending.next().now_or_never() {
            self.record(outcome);
        }
    }

    /// Waits up to `limit` for at least one delivery to resolve
    async fn wait_for_one(&mut self, limit: Duration) {
        if self.pending.is_empty() {
            tokio::time::sleep(limit.min(QUEUE_FULL_BACKOFF)).await;
            return;
        }
        if let Ok(Some(outcome)) = tokio::time::timeout(limit, self.pending.next()).await {
            self.record(outcome);
        }
        self.reap();
    }

    /// Waits, without a deadline, until every delivery has resolved
    async fn drain(&mut self) {
        while let Some(outcome) = self.pending.next().await {
            self.record(outcome);
        }
    }
}

/// Streams URL rows into a message sink
///
/// The producer owns its sink for the duration of one run and closes it
/// before [`MessageProducer::run`] returns.
pub struct MessageProducer<S: MessageSink> {
    sink: S,
    progress_interval: u64,
    queue_full_timeout: Duration,
}

impl<S: MessageSink> MessageProducer<S> {
    pub fn new(sink: S, progress_interval: u64, queue_full_timeout: Duration) -> Self {
        Self {
            sink,
            progress_interval: progress_interval.max(1),
            queue_full_timeout,
        }
    }

    pub fn from_config(sink: S, config: &Config) -> Self {
        Self::new(
            sink,
            config.producer.progress_interval,
            config.kafka.queue_full_timeout(),
        )
    }

    /// Produces one message per row and waits for every delivery outcome
    ///
    /// Unreadable rows are skipped and failed deliveries are counted; neither
    /// stops the run.
    pub async fn run<I>(mut self, source: I, crawl_id: &str) -> ProduceSummary
    where
        I: IntoIterator<Item = Result<UrlRow, InputError>>,
    {
        let mut deliveries = Deliveries::default();
        let mut summary = ProduceSummary::default();
        let mut processed: u64 = 0;

        for row in source {
            processed += 1;

            match row {
                Ok(row) => {
                    if self.produce(&mut deliveries, row.url, crawl_id).await {
                        summary.submitted += 1;
                    } else {
                        summary.failed += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("Skipping unreadable row {}: {}", processed, e);
                    summary.skipped += 1;
                }
            }

            deliveries.reap();

            if processed % self.progress_interval == 0 {
                tracing::info!("Processed {} rows. Still producing...", processed);
            }
        }

        tracing::info!(
            "Produced {} messages. Waiting for delivery...",
            summary.submitted
        );
        deliveries.drain().await;

        summary.sent = deliveries.sent;
        summary.failed += deliveries.failed;
        tracing::info!(
            "Delivery complete: {} sent, {} failed, {} skipped",
            summary.sent,
            summary.failed,
            summary.skipped
        );

        if let Err(e) = self.sink.close() {
            tracing::error!("Failed to close message sink: {}", e);
        }

        summary
    }

    /// Encodes and submits one message, blocking while the queue is full
    ///
    /// Returns `false` when the message could not be enqueued.
    async fn produce(&mut self, deliveries: &mut Deliveries, url: String, crawl_id: &str) -> bool {
        let payload = match CrawlMessage::new(url.as_str(), crawl_id).to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode message for {}: {}", url, e);
                return false;
            }
        };

        let mut deadline: Option<Instant> = None;
        loop {
            match self.sink.submit(&payload) {
                Ok(delivery) => {
                    deliveries.push(delivery.map(move |outcome| (url, outcome)).boxed());
                    return true;
                }
                Err(SubmitError::QueueFull) => {
                    let now = Instant::now();
                    let deadline = *deadline.get_or_insert_with(|| {
                        tracing::warn!(
                            "Producer queue is full, waiting on {} pending deliveries",
                            deliveries.pending.len()
                        );
                        now + self.queue_full_timeout
                    });

                    if now >= deadline {
                        tracing::error!(
                            "Producer queue still full after {:?}, dropping {}",
                            self.queue_full_timeout,
                            url
                        );
                        return false;
                    }

                    deliveries.wait_for_one(deadline - now).await;
                }
                Err(e @ SubmitError::Rejected(_)) => {
                    tracing::error!("Failed to enqueue {}: {}", url, e);
                    return false;
                }
            }
        }
    }
}
