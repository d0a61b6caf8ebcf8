//! Data loading from JSON files: MCC catalog, evidence store snapshot,
//! score configuration and queries

use crate::catalog::{is_assignable_mcc, RegionCatalog, RegionDescriptor};
use crate::score::ScoreConfig;
use crate::store::{AreaEvidence, InMemoryEvidenceStore, StationEvidence};
use crate::{
    CellAreaId, CellAreaObservation, CellObservation, LocateError, Query, Radio, Result,
    StationKind, StationObservation,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Sanitize display name (printable characters only, bounded length)
fn sanitize_name(name: String) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || " -_.,()&'".contains(*c))
        .take(256)
        .collect()
}

/// Raw catalog entry from JSON
#[derive(Debug, Deserialize)]
struct RawCatalogEntry {
    mcc: Option<u16>,
    regions: Option<Vec<RawRegion>>,
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    code: Option<String>,
    name: Option<String>,
}

/// Raw station record from a store snapshot
#[derive(Debug, Deserialize)]
struct RawStation {
    mac: Option<String>,
    region: Option<String>,
    samples: Option<u64>,
    last_seen: Option<DateTime<Utc>>,
}

/// Raw cell area record from a store snapshot
#[derive(Debug, Deserialize)]
struct RawArea {
    radio: Option<Radio>,
    mcc: Option<u16>,
    mnc: Option<u16>,
    lac: Option<u32>,
    region: Option<String>,
    num_cells: Option<u64>,
    last_seen: Option<DateTime<Utc>>,
}

/// Container for a store snapshot
#[derive(Debug, Default, Deserialize)]
struct StoreSnapshotFile {
    #[serde(default)]
    wifi: Vec<RawStation>,
    #[serde(default)]
    bluetooth: Vec<RawStation>,
    #[serde(default)]
    areas: Vec<RawArea>,
}

/// Load an MCC → region table from JSON file
pub fn load_catalog(path: impl AsRef<Path>) -> Result<RegionCatalog> {
    let path = path.as_ref();
    info!("Loading region catalog from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let entries: Vec<RawCatalogEntry> = serde_json::from_reader(reader)?;

    let mut catalog = RegionCatalog::new();
    let mut skipped = 0;

    for entry in entries {
        let mcc = match entry.mcc {
            Some(m) if is_assignable_mcc(m) => m,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let regions: Vec<RegionDescriptor> = entry
            .regions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| {
                let code = r.code?;
                let name = sanitize_name(r.name.unwrap_or_else(|| code.clone()));
                Some(RegionDescriptor::new(code, name))
            })
            .collect();

        if catalog.insert(mcc, regions) == 0 {
            skipped += 1;
        }
    }

    if catalog.is_empty() {
        return Err(LocateError::InvalidData {
            kind: "catalog",
            reason: format!("no usable MCC entries in {:?}", path),
        });
    }

    info!("Loaded {} MCCs ({} entries skipped)", catalog.len(), skipped);

    Ok(catalog)
}

/// Load an evidence store snapshot from JSON file
pub fn load_store_snapshot(path: impl AsRef<Path>) -> Result<InMemoryEvidenceStore> {
    let path = path.as_ref();
    info!("Loading evidence store snapshot from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: StoreSnapshotFile = serde_json::from_reader(reader)?;

    let mut store = InMemoryEvidenceStore::new();

    for (kind, stations) in [
        (StationKind::Wifi, snapshot.wifi),
        (StationKind::Bluetooth, snapshot.bluetooth),
    ] {
        let mut skipped = 0;
        for station in stations {
            let (Some(mac), Some(last_seen)) = (station.mac, station.last_seen) else {
                skipped += 1;
                continue;
            };
            let evidence = StationEvidence {
                region: station.region,
                samples: station.samples.unwrap_or(0),
                last_seen,
            };
            if !store.insert_station(kind, &mac, evidence) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!("Skipped {} {} records with missing or invalid fields", skipped, kind.as_str());
        }
    }

    let mut skipped = 0;
    for area in snapshot.areas {
        let (Some(radio), Some(mcc), Some(mnc), Some(lac), Some(last_seen)) =
            (area.radio, area.mcc, area.mnc, area.lac, area.last_seen)
        else {
            skipped += 1;
            continue;
        };
        store.insert_area(
            CellAreaId { radio, mcc, mnc, lac },
            AreaEvidence {
                region: area.region,
                num_cells: area.num_cells.unwrap_or(0),
                last_seen,
            },
        );
    }
    if skipped > 0 {
        warn!("Skipped {} area records with missing fields", skipped);
    }

    info!(
        "Loaded {} wifi, {} bluetooth, {} area records",
        store.station_count(StationKind::Wifi),
        store.station_count(StationKind::Bluetooth),
        store.area_count()
    );

    Ok(store)
}

/// Load score configuration from JSON file; missing fields take defaults
pub fn load_config(path: impl AsRef<Path>) -> Result<ScoreConfig> {
    let path = path.as_ref();
    info!("Loading score config from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Raw query document. Collections must be arrays when present; their entries
/// are converted one by one.
#[derive(Debug, Deserialize)]
struct RawQuery {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    region_hint: Option<String>,
    #[serde(default)]
    cell_areas: Vec<serde_json::Value>,
    #[serde(default)]
    cells: Vec<serde_json::Value>,
    #[serde(default)]
    wifi: Vec<serde_json::Value>,
    #[serde(default)]
    bluetooth: Vec<serde_json::Value>,
}

/// Raw observed cell or cell area. Numbers are read wide so out-of-range
/// values reject only their own entry.
#[derive(Debug, Deserialize)]
struct RawObservedCell {
    radio: Option<String>,
    mcc: Option<i64>,
    mnc: Option<i64>,
    lac: Option<i64>,
    cid: Option<i64>,
}

impl RawObservedCell {
    fn to_area(&self) -> Option<CellAreaObservation> {
        Some(CellAreaObservation {
            radio: parse_radio(self.radio.as_deref()?)?,
            mcc: u16::try_from(self.mcc?).ok()?,
            mnc: u16::try_from(self.mnc?).ok()?,
            lac: u32::try_from(self.lac?).ok()?,
        })
    }

    fn to_cell(&self) -> Option<CellObservation> {
        let area = self.to_area()?;
        Some(CellObservation {
            radio: area.radio,
            mcc: area.mcc,
            mnc: area.mnc,
            lac: area.lac,
            cid: u64::try_from(self.cid?).ok()?,
        })
    }
}

/// Raw observed WiFi or Bluetooth station
#[derive(Debug, Deserialize)]
struct RawObservedStation {
    mac: Option<String>,
}

fn parse_radio(name: &str) -> Option<Radio> {
    match name.trim().to_ascii_lowercase().as_str() {
        "gsm" => Some(Radio::Gsm),
        "wcdma" => Some(Radio::Wcdma),
        "lte" => Some(Radio::Lte),
        "nr" => Some(Radio::Nr),
        _ => None,
    }
}

/// Convert each entry, dropping those that do not fit
fn convert_entries<R, T>(
    label: &str,
    entries: Vec<serde_json::Value>,
    convert: impl Fn(R) -> Option<T>,
) -> Vec<T>
where
    R: serde::de::DeserializeOwned,
{
    let total = entries.len();
    let converted: Vec<T> = entries
        .into_iter()
        .filter_map(|value| serde_json::from_value::<R>(value).ok().and_then(&convert))
        .collect();

    let skipped = total - converted.len();
    if skipped > 0 {
        debug!("Skipped {} invalid {} entries in query", skipped, label);
    }
    converted
}

/// Parse a query document.
///
/// A document that is not an object, or a collection that is `null` or not
/// an array, is a malformed query. Individual entries that cannot be read are
/// dropped.
pub fn parse_query(json: &str) -> Result<Query> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| LocateError::MalformedQuery(e.to_string()))?;
    if !value.is_object() {
        return Err(LocateError::MalformedQuery("query must be a JSON object".to_string()));
    }
    let raw: RawQuery =
        serde_json::from_value(value).map_err(|e| LocateError::MalformedQuery(e.to_string()))?;

    Ok(Query {
        api_key: raw.api_key,
        region_hint: raw.region_hint,
        cell_areas: convert_entries("cell area", raw.cell_areas, |c: RawObservedCell| c.to_area()),
        cells: convert_entries("cell", raw.cells, |c: RawObservedCell| c.to_cell()),
        wifi: convert_entries("wifi", raw.wifi, |s: RawObservedStation| {
            s.mac.map(StationObservation::new)
        }),
        bluetooth: convert_entries("bluetooth", raw.bluetooth, |s: RawObservedStation| {
            s.mac.map(StationObservation::new)
        }),
    })
}

/// Load a query document from JSON file
pub fn load_query(path: impl AsRef<Path>) -> Result<Query> {
    let path = path.as_ref();
    info!("Loading query from {:?}", path);

    let json = fs::read_to_string(path)?;
    parse_query(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EvidenceStore;
    use std::collections::BTreeSet;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_catalog() {
        let file = write_temp(
            r#"[
                {"mcc": 234, "regions": [{"code": "gb", "name": "United Kingdom"}, {"code": "JE"}]},
                {"mcc": 999, "regions": [{"code": "XX", "name": "Nowhere"}]},
                {"regions": [{"code": "DE"}]}
            ]"#,
        );

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        let regions = catalog.regions_for_mcc(234);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].code, "GB");
        assert_eq!(regions[1].name, "JE");
    }

    #[test]
    fn test_load_catalog_rejects_empty() {
        let file = write_temp(r#"[{"mcc": 100, "regions": [{"code": "XX"}]}]"#);
        assert!(matches!(
            load_catalog(file.path()),
            Err(LocateError::InvalidData { kind: "catalog", .. })
        ));
    }

    #[test]
    fn test_load_store_snapshot() {
        let file = write_temp(
            r#"{
                "wifi": [
                    {"mac": "AA:BB:CC:00:00:01", "region": "gb", "samples": 10, "last_seen": "2024-05-01T00:00:00Z"},
                    {"mac": "bogus", "region": "GB", "samples": 10, "last_seen": "2024-05-01T00:00:00Z"},
                    {"mac": "aabbcc000002", "samples": 3}
                ],
                "areas": [
                    {"radio": "lte", "mcc": 234, "mnc": 30, "lac": 1200, "region": "GB", "num_cells": 6, "last_seen": "2024-05-01T00:00:00Z"},
                    {"radio": "lte", "mcc": 234}
                ]
            }"#,
        );

        let store = load_store_snapshot(file.path()).unwrap();
        assert_eq!(store.station_count(StationKind::Wifi), 1);
        assert_eq!(store.station_count(StationKind::Bluetooth), 0);
        assert_eq!(store.area_count(), 1);

        let macs = BTreeSet::from(["aabbcc000001".to_string()]);
        let found = store.lookup_stations(StationKind::Wifi, &macs).unwrap();
        assert_eq!(found["aabbcc000001"].region.as_deref(), Some("GB"));

        let id = CellAreaId { radio: Radio::Lte, mcc: 234, mnc: 30, lac: 1200 };
        assert_eq!(store.lookup_cell_area(id).unwrap().map(|a| a.num_cells), Some(6));
    }

    #[test]
    fn test_load_config() {
        let file = write_temp(r#"{"area_half_life_days": 30.0}"#);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.area_half_life_days, 30.0);
        assert_eq!(config.station_half_life_days, ScoreConfig::default().station_half_life_days);
    }

    #[test]
    fn test_parse_query() {
        let query = parse_query(
            r#"{
                "api_key": "test",
                "cell_areas": [{"radio": "gsm", "mcc": 235, "mnc": 1, "lac": 2}],
                "wifi": [{"mac": "aa:bb:cc:00:00:01"}]
            }"#,
        )
        .unwrap();
        assert_eq!(query.cell_areas.len(), 1);
        assert_eq!(query.wifi.len(), 1);
        assert!(query.bluetooth.is_empty());
    }

    #[test]
    fn test_null_collection_is_malformed() {
        let err = parse_query(r#"{"cell_areas": null}"#).unwrap_err();
        assert!(matches!(err, LocateError::MalformedQuery(_)));
        assert!(!err.is_retryable());

        let err = parse_query(r#"{"wifi": {"mac": "aabbcc000001"}}"#).unwrap_err();
        assert!(matches!(err, LocateError::MalformedQuery(_)));

        let err = parse_query("42").unwrap_err();
        assert!(matches!(err, LocateError::MalformedQuery(_)));
    }

    #[test]
    fn test_invalid_entries_are_dropped() {
        let query = parse_query(
            r#"{
                "cell_areas": [
                    {"radio": "gsm", "mcc": 70000, "mnc": 1, "lac": 2},
                    {"radio": "cdma", "mcc": 235, "mnc": 1, "lac": 2},
                    {"radio": "lte", "mcc": 235, "mnc": 1},
                    "not an object",
                    {"radio": "LTE", "mcc": 235, "mnc": 1, "lac": 3}
                ],
                "cells": [
                    {"radio": "gsm", "mcc": 234, "mnc": 1, "lac": 2, "cid": -1},
                    {"radio": "gsm", "mcc": 234, "mnc": 1, "lac": 2, "cid": 42}
                ],
                "wifi": [{"ssid": "no mac"}, {"mac": 12}, {"mac": "aabbcc000001"}],
                "bluetooth": [{}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            query.cell_areas,
            vec![CellAreaObservation { radio: Radio::Lte, mcc: 235, mnc: 1, lac: 3 }]
        );
        assert_eq!(query.cells.len(), 1);
        assert_eq!(query.cells[0].cid, 42);
        assert_eq!(query.wifi, vec![StationObservation::new("aabbcc000001")]);
        assert!(query.bluetooth.is_empty());
    }

    #[test]
    fn test_broken_area_does_not_hide_station() {
        use crate::aggregate::RegionAggregator;
        use chrono::TimeZone;
        use std::sync::Arc;

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut store = InMemoryEvidenceStore::new();
        store.insert_station(
            StationKind::Wifi,
            "aabbcc000001",
            StationEvidence { region: Some("DE".to_string()), samples: 10, last_seen: now },
        );

        let query = parse_query(
            r#"{
                "cell_areas": [{"radio": "cdma", "mcc": 70000, "mnc": 1, "lac": 2}],
                "wifi": [{"mac": "aa:bb:cc:00:00:01"}]
            }"#,
        )
        .unwrap();

        let results = RegionAggregator::new(Arc::new(RegionCatalog::with_defaults()), store)
            .search(&query, now)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].region_code, "DE");
        assert_eq!(results[0].station_contributions, 1);
        assert_eq!(results[0].area_contributions, 0);
    }

    #[test]
    fn test_load_query_missing_file() {
        assert!(matches!(
            load_query("/nonexistent/query.json"),
            Err(LocateError::Io(_))
        ));
    }
}
