//! Region aggregation: combines catalog resolution, stored evidence and
//! score functions into one ranked result list per query.
//!
//! Contributions, in evaluation order:
//!
//! 1. Cell areas (ascending area id). Each area with a known MCC adds `1/k`
//!    to every one of its `k` candidate regions. A stored record adds
//!    `area_score` to the single candidate when `k == 1`, or to the record's
//!    own region when that region is one of the `k` candidates.
//! 2. WiFi stations, then Bluetooth stations (ascending normalized MAC). A
//!    stored record with a region adds `station_score` to that region only.
//!
//! Invalid or unknown items are skipped. Duplicate identifiers in one query
//! count once. The fixed order makes results bit-reproducible.

use crate::catalog::{RegionCatalog, RegionDescriptor};
use crate::results::{RegionResultList, RegionScore};
use crate::score::{area_score, station_score, ScoreConfig};
use crate::store::EvidenceStore;
use crate::telemetry::{MetricsSink, OutcomeContext};
use crate::{normalize_mac, normalize_region_code, CellAreaId, Query, Result, StationKind, StationObservation};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Region search over the internal evidence store
#[derive(Debug, Clone)]
pub struct RegionAggregator<S> {
    catalog: Arc<RegionCatalog>,
    store: S,
    config: ScoreConfig,
}

impl<S: EvidenceStore> RegionAggregator<S> {
    pub fn new(catalog: Arc<RegionCatalog>, store: S) -> Self {
        Self {
            catalog,
            store,
            config: ScoreConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    /// Score all regions supported by the query's evidence.
    ///
    /// An empty list is a miss, not an error. Errors come only from the
    /// evidence store and are never accompanied by partial results.
    pub fn search(&self, query: &Query, now: DateTime<Utc>) -> Result<RegionResultList> {
        let mut scores: BTreeMap<String, RegionScore> = BTreeMap::new();

        self.add_area_evidence(query, now, &mut scores)?;
        for kind in [StationKind::Wifi, StationKind::Bluetooth] {
            self.add_station_evidence(kind, query.stations(kind), now, &mut scores)?;
        }

        let results = RegionResultList::new(scores.into_values());

        debug!(
            "Region search: {} regions, best={:?}, accuracy={}",
            results.len(),
            results.best().map(|b| b.region_code.as_str()),
            results.accuracy().as_str()
        );

        Ok(results)
    }

    /// Search and emit the outcome counter for the query
    pub fn search_and_record(
        &self,
        query: &Query,
        now: DateTime<Utc>,
        sink: &dyn MetricsSink,
    ) -> Result<RegionResultList> {
        let results = self.search(query, now)?;
        results.record_outcome(sink, &OutcomeContext::from_query(query));
        Ok(results)
    }

    fn add_area_evidence(
        &self,
        query: &Query,
        now: DateTime<Utc>,
        scores: &mut BTreeMap<String, RegionScore>,
    ) -> Result<()> {
        let area_ids: BTreeSet<CellAreaId> = query
            .cell_areas
            .iter()
            .map(|a| a.area_id())
            .chain(query.cells.iter().map(|c| c.area_id()))
            .collect();

        let candidates: Vec<(CellAreaId, &[RegionDescriptor])> = area_ids
            .into_iter()
            .filter_map(|id| {
                let regions = self.catalog.regions_for_mcc(id.mcc);
                if regions.is_empty() {
                    debug!("Skipping cell area {:?}: unknown MCC {}", id, id.mcc);
                    None
                } else {
                    Some((id, regions))
                }
            })
            .collect();

        if candidates.is_empty() {
            return Ok(());
        }

        let lookup: BTreeSet<CellAreaId> = candidates.iter().map(|(id, _)| *id).collect();
        let records = self.store.lookup_cell_areas(&lookup)?;

        for (id, regions) in candidates {
            let base = 1.0 / regions.len() as f64;
            for region in regions {
                let entry = region_entry(scores, &region.code, &region.name);
                entry.score += base;
                entry.area_contributions += 1;
            }

            let Some(record) = records.get(&id) else {
                continue;
            };

            // A single candidate takes the bonus outright, on top of its 1.0
            // share, whatever region the record names. Otherwise only the
            // area's own recorded region may, and only if it is a candidate.
            let bonus_region = if regions.len() == 1 {
                regions.first()
            } else {
                record
                    .region
                    .as_deref()
                    .and_then(normalize_region_code)
                    .and_then(|code| regions.iter().find(|r| r.code == code))
            };

            if let Some(region) = bonus_region {
                let bonus = area_score(record.num_cells, record.last_seen, now, &self.config);
                region_entry(scores, &region.code, &region.name).score += bonus;
            }
        }

        Ok(())
    }

    fn add_station_evidence(
        &self,
        kind: StationKind,
        stations: &[StationObservation],
        now: DateTime<Utc>,
        scores: &mut BTreeMap<String, RegionScore>,
    ) -> Result<()> {
        let macs: BTreeSet<String> = stations
            .iter()
            .filter_map(|s| {
                let mac = normalize_mac(&s.mac);
                if mac.is_none() {
                    debug!("Skipping {} station with invalid identifier {:?}", kind.as_str(), s.mac);
                }
                mac
            })
            .collect();

        if macs.is_empty() {
            return Ok(());
        }

        let records = self.store.lookup_stations(kind, &macs)?;

        for mac in &macs {
            let Some(record) = records.get(mac) else {
                continue;
            };
            let Some(code) = record.region.as_deref().and_then(normalize_region_code) else {
                continue;
            };

            let name = self
                .catalog
                .region(&code)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| code.clone());
            let score = station_score(record.samples, record.last_seen, now, &self.config);

            let entry = region_entry(scores, &code, &name);
            entry.score += score;
            entry.station_contributions += 1;
        }

        Ok(())
    }
}

fn region_entry<'a>(
    scores: &'a mut BTreeMap<String, RegionScore>,
    code: &str,
    name: &str,
) -> &'a mut RegionScore {
    scores
        .entry(code.to_string())
        .or_insert_with(|| RegionScore::new(code, name))
}
