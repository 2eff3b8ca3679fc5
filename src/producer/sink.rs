//! Message sink abstraction
//!
//! A sink accepts encoded messages and hands back one pending delivery per
//! message. The pending delivery resolves once the broker has acknowledged or
//! failed the message.

use futures::future::BoxFuture;
use thiserror::Error;

/// Resolves to the terminal delivery outcome of one submitted message
pub type PendingDelivery = BoxFuture<'static, Result<(), DeliveryError>>;

/// Errors returned synchronously when a message cannot be enqueued
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Producer queue is full")]
    QueueFull,

    #[error("Message rejected by producer: {0}")]
    Rejected(String),
}

/// Terminal failure of a message that was enqueued
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Broker reported delivery failure: {0}")]
    Broker(String),

    #[error("Delivery report dropped before the message completed")]
    Canceled,
}

/// Errors opening or closing a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create producer: {0}")]
    Connect(String),

    #[error("Failed to flush producer: {0}")]
    Flush(String),
}

/// Destination for encoded crawl messages
pub trait MessageSink {
    /// Enqueues one message without waiting for the broker
    fn submit(&mut self, payload: &[u8]) -> Result<PendingDelivery, SubmitError>;

    /// Flushes anything still buffered and releases the connection
    fn close(self) -> Result<(), SinkError>
    where
        Self: Sized;
}
