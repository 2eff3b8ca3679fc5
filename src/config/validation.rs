use crate::config::types::{ClusterConfig, Config, KafkaConfig, ProducerConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_cluster_config(&config.cluster)?;
    validate_kafka_config(&config.kafka)?;
    validate_producer_config(&config.producer)?;
    Ok(())
}

/// Validates control-plane configuration
fn validate_cluster_config(config: &ClusterConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.rest_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid rest-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "rest-url '{}' must use http or https",
            config.rest_url
        )));
    }

    if config.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.connect_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates Kafka configuration
fn validate_kafka_config(config: &KafkaConfig) -> Result<(), ConfigError> {
    if config.brokers.split(',').all(|b| b.trim().is_empty()) {
        return Err(ConfigError::Validation("brokers cannot be empty".to_string()));
    }

    if config.topic.trim().is_empty() {
        return Err(ConfigError::Validation("topic cannot be empty".to_string()));
    }

    for (name, value) in [
        ("socket-timeout-ms", config.socket_timeout_ms),
        ("message-timeout-ms", config.message_timeout_ms),
        ("queue-full-timeout-ms", config.queue_full_timeout_ms),
        (
            "queue-buffering-max-messages",
            u64::from(config.queue_buffering_max_messages),
        ),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

/// Validates producer configuration
fn validate_producer_config(config: &ProducerConfig) -> Result<(), ConfigError> {
    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "progress-interval must be >= 1, got {}",
            config.progress_interval
        )));
    }

    Ok(())
}
