//! Crawl execution
//!
//! Sequences one run against the cluster:
//! 1. Health gate; an unhealthy cluster aborts before any side effect
//! 2. Generate the crawl identifier
//! 3. Publish rate limits; any rejection aborts before messages are sent
//! 4. Open the queue connection and stream the URL dump into it

use crate::cluster::{build_http_client, ClusterError, FeedStatus, HealthGate, RateLimitPublisher};
use crate::config::Config;
use crate::ids::IdGenerator;
use crate::plan::CrawlPlan;
use crate::producer::{MessageProducer, MessageSink, ProduceSummary, SinkError};
use crate::source::UrlRow;
use crate::InputError;
use std::sync::Arc;

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every row was produced and every delivery resolved
    Scheduled {
        crawl_id: String,
        summary: ProduceSummary,
    },

    /// The cluster was unreachable or not fully operational
    HealthAbort,

    /// The control plane did not accept every rate-limit update
    RateLimitAbort { statuses: Vec<FeedStatus> },

    /// The queue connection could not be opened
    SinkUnavailable,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Scheduled { .. })
    }

    /// Process exit code for this outcome
    ///
    /// Failed deliveries inside a scheduled run do not affect the exit code.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Runs a crawl plan against the cluster
pub struct Executor {
    config: Config,
    health: HealthGate,
    rate_limits: RateLimitPublisher,
    ids: Arc<dyn IdGenerator>,
}

impl Executor {
    /// Creates an executor for the configured cluster
    ///
    /// # Arguments
    ///
    /// * `config` - The executor configuration
    /// * `ids` - Source of the crawl identifier and rate-limit request identifiers
    pub fn new(config: Config, ids: Arc<dyn IdGenerator>) -> Result<Self, ClusterError> {
        let client = build_http_client(&config.cluster)?;
        let health = HealthGate::new(client.clone(), &config.cluster);
        let rate_limits = RateLimitPublisher::new(client, &config.cluster, Arc::clone(&ids));

        Ok(Self {
            config,
            health,
            rate_limits,
            ids,
        })
    }

    /// Executes one run
    ///
    /// `open_sink` is only called once the cluster is healthy and every rate
    /// limit was accepted, so an aborted run never connects to the broker.
    pub async fn execute<S, F, I>(&self, plan: &CrawlPlan, urls: I, open_sink: F) -> RunOutcome
    where
        S: MessageSink,
        F: FnOnce() -> Result<S, SinkError>,
        I: IntoIterator<Item = Result<UrlRow, InputError>>,
    {
        tracing::info!("Performing cluster healthcheck");
        if !self.health.check().await {
            tracing::error!("Cluster healthcheck failed. Aborting crawl.");
            return RunOutcome::HealthAbort;
        }

        let crawl_id = self.ids.next_id();

        tracing::info!("Setting rate limits for {} domains...", plan.len());
        if let Err(e) = self.rate_limits.apply(plan).await {
            tracing::error!("Failed to set rate limits: {}. Aborting crawl.", e);
            let statuses = match e {
                ClusterError::RateLimitRejected { statuses } => statuses,
                _ => Vec::new(),
            };
            return RunOutcome::RateLimitAbort { statuses };
        }

        let sink = match open_sink() {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!("Failed to open message sink: {}. Aborting crawl.", e);
                return RunOutcome::SinkUnavailable;
            }
        };

        tracing::info!("Scheduling crawl {}...", crawl_id);
        let summary = MessageProducer::from_config(sink, &self.config)
            .run(urls, &crawl_id)
            .await;
        tracing::info!("Crawl {} scheduled.", crawl_id);

        RunOutcome::Scheduled { crawl_id, summary }
    }
}
