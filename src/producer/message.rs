use crate::APP_ID;
use serde::{Deserialize, Serialize};

/// Spider that consumes messages scheduled by this executor
pub const SPIDER_ID: &str = "validator";

/// Message placed on the cluster's ingestion topic for one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlMessage {
    pub url: String,
    pub appid: String,
    pub crawlid: String,
    pub spiderid: String,
}

impl CrawlMessage {
    pub fn new(url: impl Into<String>, crawl_id: &str) -> Self {
        Self {
            url: url.into(),
            appid: APP_ID.to_string(),
            crawlid: crawl_id.to_string(),
            spiderid: SPIDER_ID.to_string(),
        }
    }

    /// Encodes the message as compact UTF-8 JSON
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
