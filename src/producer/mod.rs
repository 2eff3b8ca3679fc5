//! Crawl message production
//!
//! This module streams a URL dump into the cluster's ingestion topic:
//! - Encoding one crawl message per URL
//! - Submitting messages to a sink without waiting on the broker
//! - Tracking every pending delivery until it is acknowledged or failed
//! - Bounded blocking when the client's buffer is full

mod kafka;
mod memory;
mod message;
mod runner;
mod sink;

pub use kafka::KafkaSink;
pub use memory::MemorySink;
pub use message::{CrawlMessage, SPIDER_ID};
pub use runner::{MessageProducer, ProduceSummary};
pub use sink::{DeliveryError, MessageSink, PendingDelivery, SinkError, SubmitError};
