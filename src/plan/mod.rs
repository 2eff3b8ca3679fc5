//! Crawl plan input
//!
//! A crawl plan is produced by an external generator and lists the
//! per-domain rate limits the cluster should apply for a run.
//!
//! ```yaml
//! domains:
//!   example.com:
//!     window: 60
//!     hits: 10
//! ```

mod parser;

pub use parser::{compute_plan_hash, load_plan, load_plan_with_hash, parse_plan};

use serde::Deserialize;
use std::collections::BTreeMap;

/// Per-domain rate limits for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrawlPlan {
    pub domains: BTreeMap<String, DomainLimit>,
}

/// Allow `hits` requests per `window` time units for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DomainLimit {
    pub window: u32,
    pub hits: u32,
}

impl CrawlPlan {
    /// Number of domains in the plan
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}
