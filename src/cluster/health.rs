//! Cluster health gate
//!
//! A crawl is only scheduled against a cluster whose control plane reports
//! both backends connected and a GREEN node health. Anything else, including
//! failing to reach the control plane at all, counts as unhealthy.

use crate::cluster::ClusterError;
use crate::config::ClusterConfig;
use reqwest::Client;
use serde::Deserialize;

/// Health document returned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterHealth {
    pub kafka_connected: bool,
    pub redis_connected: bool,
    pub node_health: NodeHealth,
}

/// Aggregate node health as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeHealth {
    Green,
    Yellow,
    Red,
}

impl ClusterHealth {
    /// True only when every health signal is satisfied
    pub fn is_ready(&self) -> bool {
        self.kafka_connected && self.redis_connected && self.node_health == NodeHealth::Green
    }
}

/// Reads cluster health from the control plane
pub struct HealthGate {
    client: Client,
    url: String,
}

impl HealthGate {
    pub fn new(client: Client, config: &ClusterConfig) -> Self {
        Self {
            client,
            url: config.rest_url.clone(),
        }
    }

    /// Fetches and decodes the health document
    ///
    /// # Returns
    ///
    /// * `Ok(ClusterHealth)` - The control plane answered with a valid document
    /// * `Err(ClusterError)` - Connection failure, timeout, non-2xx status, or undecodable body
    pub async fn fetch(&self) -> Result<ClusterHealth, ClusterError> {
        let http_err = |source| ClusterError::Http {
            url: self.url.clone(),
            source,
        };

        self.client
            .get(&self.url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http_err)?
            .json::<ClusterHealth>()
            .await
            .map_err(http_err)
    }

    /// Performs a single health read
    ///
    /// Returns `true` only if the control plane was reachable and reported a
    /// fully operational cluster. There is no retry.
    pub async fn check(&self) -> bool {
        match self.fetch().await {
            Ok(health) if health.is_ready() => {
                tracing::info!("Cluster is healthy");
                true
            }
            Ok(health) => {
                tracing::warn!(
                    kafka_connected = health.kafka_connected,
                    redis_connected = health.redis_connected,
                    node_health = ?health.node_health,
                    "Cluster is not ready"
                );
                false
            }
            Err(e) => {
                tracing::error!("Failed to reach control plane: {}", e);
                false
            }
        }
    }
}
