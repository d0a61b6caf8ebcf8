//! Evidence store gateway
//!
//! The only seam through which historical station and cell-area records
//! reach the aggregator. Lookups are batched: one call per evidence kind per
//! query. A missing record is not an error, it simply contributes nothing.

use crate::{normalize_mac, normalize_region_code, CellAreaId, StationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Evidence store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Historical record of a WiFi access point or Bluetooth beacon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationEvidence {
    /// Region assigned from earlier observations, if any
    pub region: Option<String>,
    /// Number of samples the record was built from
    pub samples: u64,
    pub last_seen: DateTime<Utc>,
}

/// Historical record of a cell area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEvidence {
    /// Region assigned from earlier observations, if any
    pub region: Option<String>,
    /// Number of distinct cells known in the area
    pub num_cells: u64,
    pub last_seen: DateTime<Utc>,
}

/// Read-only access to the persistent station/area store.
///
/// Implementations must tolerate concurrent reads.
pub trait EvidenceStore: Send + Sync {
    /// Records for the given normalized identifiers; unknown ids are absent from the map
    fn lookup_stations(
        &self,
        kind: StationKind,
        macs: &BTreeSet<String>,
    ) -> Result<HashMap<String, StationEvidence>, StoreError>;

    /// Records for the given cell areas; unknown areas are absent from the map
    fn lookup_cell_areas(
        &self,
        ids: &BTreeSet<CellAreaId>,
    ) -> Result<HashMap<CellAreaId, AreaEvidence>, StoreError>;

    /// Record for a single cell area
    fn lookup_cell_area(&self, id: CellAreaId) -> Result<Option<AreaEvidence>, StoreError> {
        let ids = BTreeSet::from([id]);
        Ok(self.lookup_cell_areas(&ids)?.remove(&id))
    }
}

impl<T: EvidenceStore + ?Sized> EvidenceStore for Arc<T> {
    fn lookup_stations(
        &self,
        kind: StationKind,
        macs: &BTreeSet<String>,
    ) -> Result<HashMap<String, StationEvidence>, StoreError> {
        (**self).lookup_stations(kind, macs)
    }

    fn lookup_cell_areas(
        &self,
        ids: &BTreeSet<CellAreaId>,
    ) -> Result<HashMap<CellAreaId, AreaEvidence>, StoreError> {
        (**self).lookup_cell_areas(ids)
    }
}

/// In-process evidence store, filled once and then only read
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvidenceStore {
    wifi: HashMap<String, StationEvidence>,
    bluetooth: HashMap<String, StationEvidence>,
    areas: HashMap<CellAreaId, AreaEvidence>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a station record. Returns false when the identifier is not MAC-like.
    pub fn insert_station(&mut self, kind: StationKind, mac: &str, mut evidence: StationEvidence) -> bool {
        let Some(mac) = normalize_mac(mac) else {
            return false;
        };
        evidence.region = evidence.region.as_deref().and_then(normalize_region_code);
        self.table_mut(kind).insert(mac, evidence);
        true
    }

    /// Insert a cell area record
    pub fn insert_area(&mut self, id: CellAreaId, mut evidence: AreaEvidence) {
        evidence.region = evidence.region.as_deref().and_then(normalize_region_code);
        self.areas.insert(id, evidence);
    }

    pub fn station_count(&self, kind: StationKind) -> usize {
        self.table(kind).len()
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    fn table(&self, kind: StationKind) -> &HashMap<String, StationEvidence> {
        match kind {
            StationKind::Wifi => &self.wifi,
            StationKind::Bluetooth => &self.bluetooth,
        }
    }

    fn table_mut(&mut self, kind: StationKind) -> &mut HashMap<String, StationEvidence> {
        match kind {
            StationKind::Wifi => &mut self.wifi,
            StationKind::Bluetooth => &mut self.bluetooth,
        }
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn lookup_stations(
        &self,
        kind: StationKind,
        macs: &BTreeSet<String>,
    ) -> Result<HashMap<String, StationEvidence>, StoreError> {
        let table = self.table(kind);
        Ok(macs
            .iter()
            .filter_map(|mac| table.get(mac).map(|e| (mac.clone(), e.clone())))
            .collect())
    }

    fn lookup_cell_areas(
        &self,
        ids: &BTreeSet<CellAreaId>,
    ) -> Result<HashMap<CellAreaId, AreaEvidence>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.areas.get(id).map(|e| (*id, e.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Radio;

    fn station(region: Option<&str>, samples: u64) -> StationEvidence {
        StationEvidence {
            region: region.map(str::to_string),
            samples,
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn test_lookup_returns_only_known_stations() {
        let mut store = InMemoryEvidenceStore::new();
        assert!(store.insert_station(StationKind::Wifi, "AA:BB:CC:00:00:01", station(Some("gb"), 10)));
        assert!(store.insert_station(StationKind::Wifi, "aabbcc000002", station(None, 3)));

        let macs: BTreeSet<String> = ["aabbcc000001", "aabbcc000002", "aabbcc000003"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let found = store.lookup_stations(StationKind::Wifi, &macs).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found["aabbcc000001"].region.as_deref(), Some("GB"));
        assert_eq!(found["aabbcc000002"].region, None);
    }

    #[test]
    fn test_station_kinds_are_separate_tables() {
        let mut store = InMemoryEvidenceStore::new();
        store.insert_station(StationKind::Bluetooth, "aabbcc000001", station(Some("DE"), 5));

        let macs = BTreeSet::from(["aabbcc000001".to_string()]);
        assert!(store.lookup_stations(StationKind::Wifi, &macs).unwrap().is_empty());
        assert_eq!(store.lookup_stations(StationKind::Bluetooth, &macs).unwrap().len(), 1);
        assert_eq!(store.station_count(StationKind::Bluetooth), 1);
    }

    #[test]
    fn test_rejects_invalid_mac() {
        let mut store = InMemoryEvidenceStore::new();
        assert!(!store.insert_station(StationKind::Wifi, "not-a-mac", station(Some("GB"), 1)));
        assert_eq!(store.station_count(StationKind::Wifi), 0);
    }

    #[test]
    fn test_single_area_lookup() {
        let mut store = InMemoryEvidenceStore::new();
        let id = CellAreaId { radio: Radio::Gsm, mcc: 234, mnc: 10, lac: 99 };
        let other = CellAreaId { lac: 100, ..id };
        store.insert_area(
            id,
            AreaEvidence { region: Some("gb".to_string()), num_cells: 6, last_seen: Utc::now() },
        );

        let found = store.lookup_cell_area(id).unwrap().unwrap();
        assert_eq!(found.region.as_deref(), Some("GB"));
        assert_eq!(found.num_cells, 6);
        assert!(store.lookup_cell_area(other).unwrap().is_none());
    }

    #[test]
    fn test_arc_store_delegates() {
        let mut store = InMemoryEvidenceStore::new();
        store.insert_station(StationKind::Wifi, "aabbcc000001", station(Some("GB"), 1));
        let shared = Arc::new(store);

        let macs = BTreeSet::from(["aabbcc000001".to_string()]);
        assert_eq!(shared.lookup_stations(StationKind::Wifi, &macs).unwrap().len(), 1);
    }
}
