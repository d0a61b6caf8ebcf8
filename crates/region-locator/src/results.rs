//! Ranked region results, best-region selection and outcome reporting

use crate::telemetry::{MetricsSink, OutcomeContext, Status, REGION_SOURCE_METRIC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Index;

/// Coarse confidence tier of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// Cell area evidence only
    Low,
    /// One station contributed
    Medium,
    /// Two or more stations contributed
    High,
}

impl Accuracy {
    /// Classify by the number of station contributions behind a region
    pub fn from_station_contributions(count: usize) -> Self {
        match count {
            0 => Accuracy::Low,
            1 => Accuracy::Medium,
            _ => Accuracy::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Accuracy::Low => "low",
            Accuracy::Medium => "medium",
            Accuracy::High => "high",
        }
    }
}

/// Accumulated score of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionScore {
    pub region_code: String,
    pub region_name: String,
    /// Sum of all contributions
    pub score: f64,
    /// Cell areas that contributed
    pub area_contributions: usize,
    /// Stations that contributed
    pub station_contributions: usize,
}

impl RegionScore {
    pub fn new(region_code: impl Into<String>, region_name: impl Into<String>) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: region_name.into(),
            score: 0.0,
            area_contributions: 0,
            station_contributions: 0,
        }
    }

    /// Total number of contributing evidence items
    pub fn evidence_count(&self) -> usize {
        self.area_contributions + self.station_contributions
    }

    fn absorb(&mut self, other: &RegionScore) {
        self.score += other.score;
        self.area_contributions += other.area_contributions;
        self.station_contributions += other.station_contributions;
    }
}

/// Immutable, ranked list of region scores.
///
/// Ordered by descending score; equal scores are ordered by ascending region
/// code. Holds at most one entry per region code.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RegionResultList {
    results: Vec<RegionScore>,
}

impl RegionResultList {
    /// An empty list (a miss)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a ranked list; entries sharing a region code are summed.
    pub fn new(scores: impl IntoIterator<Item = RegionScore>) -> Self {
        let mut by_code: BTreeMap<String, RegionScore> = BTreeMap::new();
        for score in scores {
            match by_code.get_mut(&score.region_code) {
                Some(existing) => existing.absorb(&score),
                None => {
                    by_code.insert(score.region_code.clone(), score);
                }
            }
        }

        // BTreeMap yields ascending codes; the stable sort keeps that order among ties
        let mut results: Vec<RegionScore> = by_code.into_values().collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        Self { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RegionScore> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RegionScore> {
        self.results.iter()
    }

    /// Highest-scoring region, ties broken by ascending region code
    pub fn best(&self) -> Option<&RegionScore> {
        self.results.first()
    }

    /// Tier derived from the evidence behind the best region; `Low` for a miss.
    ///
    /// Station contributions to lower-ranked regions do not count: a set whose
    /// winner rests on cell areas alone reports `Low` even if a losing region
    /// has station evidence.
    pub fn accuracy(&self) -> Accuracy {
        self.best()
            .map(|b| Accuracy::from_station_contributions(b.station_contributions))
            .unwrap_or(Accuracy::Low)
    }

    pub fn status(&self) -> Status {
        if self.is_empty() {
            Status::Miss
        } else {
            Status::Hit
        }
    }

    /// Emit the per-query outcome counter
    pub fn record_outcome(&self, sink: &dyn MetricsSink, ctx: &OutcomeContext) {
        sink.record_counter(REGION_SOURCE_METRIC, &ctx.tags(self.accuracy(), self.status()));
    }

    /// Export as a JSON document
    pub fn to_json(&self) -> serde_json::Value {
        let best = self.best().map(|b| {
            serde_json::json!({
                "region_code": b.region_code,
                "region_name": b.region_name,
                "score": b.score,
            })
        });

        serde_json::json!({
            "status": self.status(),
            "accuracy": self.accuracy(),
            "best": best,
            "results": self.results,
        })
    }
}

impl Index<usize> for RegionResultList {
    type Output = RegionScore;

    fn index(&self, index: usize) -> &RegionScore {
        &self.results[index]
    }
}

impl<'a> IntoIterator for &'a RegionResultList {
    type Item = &'a RegionScore;
    type IntoIter = std::slice::Iter<'a, RegionScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
