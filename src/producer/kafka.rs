//! Kafka-backed message sink

use crate::config::KafkaConfig;
use crate::producer::sink::{DeliveryError, MessageSink, PendingDelivery, SinkError, SubmitError};
use futures::FutureExt;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use std::time::Duration;

/// Publishes crawl messages to a single Kafka topic
///
/// The underlying producer runs its own polling thread; delivery reports are
/// surfaced through the returned [`PendingDelivery`] futures.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    flush_timeout: Duration,
}

impl KafkaSink {
    /// Creates a producer for the configured brokers and topic
    ///
    /// Connecting is lazy: broker connections are established in the
    /// background once the first message is enqueued.
    pub fn connect(config: &KafkaConfig) -> Result<Self, SinkError> {
        let producer: FutureProducer = producer_config(config)
            .create()
            .map_err(|e| SinkError::Connect(e.to_string()))?;

        tracing::info!(
            "Kafka producer created for {} (topic {})",
            config.brokers,
            config.topic
        );

        Ok(Self {
            producer,
            topic: config.topic.clone(),
            flush_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }
}

fn producer_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.brokers.as_str())
        .set("socket.timeout.ms", config.socket_timeout_ms.to_string())
        .set(
            "queue.buffering.max.messages",
            config.queue_buffering_max_messages.to_string(),
        )
        .set("message.timeout.ms", config.message_timeout_ms.to_string());
    client_config
}

impl MessageSink for KafkaSink {
    fn submit(&mut self, payload: &[u8]) -> Result<PendingDelivery, SubmitError> {
        let record: FutureRecord<'_, (), [u8]> = FutureRecord::to(&self.topic).payload(payload);

        match self.producer.send_result(record) {
            Ok(delivery) => Ok(async move {
                match delivery.await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err((e, _))) => Err(DeliveryError::Broker(e.to_string())),
                    Err(_) => Err(DeliveryError::Canceled),
                }
            }
            .boxed()),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(SubmitError::QueueFull)
            }
            Err((e, _)) => Err(SubmitError::Rejected(e.to_string())),
        }
    }

    fn close(self) -> Result<(), SinkError> {
        self.producer
            .flush(Timeout::After(self.flush_timeout))
            .map_err(|e| SinkError::Flush(e.to_string()))
    }
}
