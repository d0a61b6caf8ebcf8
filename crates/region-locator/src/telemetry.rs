//! Query outcome telemetry
//!
//! One counter per query:
//!
//! ```text
//! region.source  key:<api key>  region:<hint>  source:internal  accuracy:<tier>  status:<hit|miss>
//! ```
//!
//! Transport is not this crate's concern; callers plug a [`MetricsSink`].

use crate::results::Accuracy;
use crate::{Query, SOURCE_INTERNAL};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// Counter emitted once per region query
pub const REGION_SOURCE_METRIC: &str = "region.source";

/// Tag value used when a tag has no value
pub const TAG_NONE: &str = "none";

/// Query outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Hit,
    Miss,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Hit => "hit",
            Status::Miss => "miss",
        }
    }
}

/// Destination for counters
pub trait MetricsSink: Send + Sync {
    fn record_counter(&self, name: &str, tags: &[(&'static str, String)]);
}

/// Per-query values that end up as tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeContext {
    pub api_key: Option<String>,
    pub region_hint: Option<String>,
    pub source: &'static str,
}

impl OutcomeContext {
    pub fn from_query(query: &Query) -> Self {
        Self {
            api_key: query.api_key.clone(),
            region_hint: query.region_hint.clone(),
            source: SOURCE_INTERNAL,
        }
    }

    /// Tags in emission order: key, region, source, accuracy, status
    pub fn tags(&self, accuracy: Accuracy, status: Status) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone().unwrap_or_else(|| TAG_NONE.to_string())),
            ("region", self.region_hint.clone().unwrap_or_else(|| TAG_NONE.to_string())),
            ("source", self.source.to_string()),
            ("accuracy", accuracy.as_str().to_string()),
            ("status", status.as_str().to_string()),
        ]
    }
}

/// Sink that writes counters to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn record_counter(&self, name: &str, tags: &[(&'static str, String)]) {
        let joined = format_tags(tags).join(",");
        info!(counter = name, tags = %joined, "metric");
    }
}

/// A recorded counter with `key:value` tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRecord {
    pub name: String,
    pub tags: Vec<String>,
}

/// Sink that keeps counters in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct MemorySink {
    counters: Mutex<Vec<CounterRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Vec<CounterRecord> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of counters with this name carrying all given `key:value` tags
    pub fn count(&self, name: &str, tags: &[&str]) -> usize {
        self.counters()
            .iter()
            .filter(|c| c.name == name && tags.iter().all(|t| c.tags.iter().any(|ct| ct == t)))
            .count()
    }
}

impl MetricsSink for MemorySink {
    fn record_counter(&self, name: &str, tags: &[(&'static str, String)]) {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CounterRecord {
                name: name.to_string(),
                tags: format_tags(tags),
            });
    }
}

fn format_tags(tags: &[(&'static str, String)]) -> Vec<String> {
    tags.iter().map(|(k, v)| format!("{}:{}", k, v)).collect()
}
