use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Crawl Executor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub cluster: ClusterConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
}

/// Control-plane (REST service) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the control plane; health is read from here and
    /// rate limits are posted to `{rest_url}/feed`
    #[serde(rename = "rest-url")]
    pub rest_url: String,

    /// Total timeout for a single control-plane request (milliseconds)
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Timeout for establishing a connection (milliseconds)
    #[serde(rename = "connect-timeout-ms", default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Kafka broker and topic configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KafkaConfig {
    /// Comma separated list of bootstrap brokers
    pub brokers: String,

    /// Topic the crawl cluster ingests URLs from
    pub topic: String,

    /// Network request timeout inside the Kafka client, metadata requests included
    #[serde(rename = "socket-timeout-ms", default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,

    /// Capacity of the client's outstanding-message buffer
    #[serde(
        rename = "queue-buffering-max-messages",
        default = "default_queue_buffering_max_messages"
    )]
    pub queue_buffering_max_messages: u32,

    /// Upper bound on the time a message may take to be acknowledged or failed
    #[serde(rename = "message-timeout-ms", default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,

    /// How long a submission may block waiting for buffer space
    #[serde(rename = "queue-full-timeout-ms", default = "default_queue_full_timeout_ms")]
    pub queue_full_timeout_ms: u64,
}

impl KafkaConfig {
    pub fn queue_full_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_full_timeout_ms)
    }
}

/// Input file locations
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the YAML crawl plan
    #[serde(rename = "plan-path", default = "default_plan_path")]
    pub plan_path: String,

    /// Path to the CSV URL dump
    #[serde(rename = "url-dump-path", default = "default_url_dump_path")]
    pub url_dump_path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            plan_path: default_plan_path(),
            url_dump_path: default_url_dump_path(),
        }
    }
}

/// Message producer behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ProducerConfig {
    /// Number of submitted rows between progress log lines
    #[serde(rename = "progress-interval", default = "default_progress_interval")]
    pub progress_interval: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_socket_timeout_ms() -> u64 {
    5_000
}

fn default_queue_buffering_max_messages() -> u32 {
    1_000_000
}

fn default_message_timeout_ms() -> u64 {
    300_000
}

fn default_queue_full_timeout_ms() -> u64 {
    30_000
}

fn default_plan_path() -> String {
    "crawl_plan.yml".to_string()
}

fn default_url_dump_path() -> String {
    "url_dump.csv".to_string()
}

fn default_progress_interval() -> u64 {
    100_000
}
