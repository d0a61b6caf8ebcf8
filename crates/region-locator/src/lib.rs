//! Region Locator
//!
//! Infers the most likely country-level region for a positioning query from
//! observed radio evidence: cell areas (keyed by mobile country code) and
//! short-range station sightings (WiFi access points, Bluetooth beacons).
//! No latitude/longitude is computed; the output is a ranked list of scored
//! regions plus a single best guess.
//!
//! # Scoring Model
//!
//! ```text
//! Score(r) = Σ_area [ 1/k + bonus_area(r) ] + Σ_station score_station(r)
//! ```
//!
//! | Evidence     | Contribution | Applied to |
//! |--------------|--------------|------------|
//! | Cell area    | 1/k          | every one of the k regions sharing the MCC |
//! | Cell area    | area_score   | the single region (k = 1), or the area's recorded region if among the k |
//! | WiFi / BT    | station_score| the station's recorded region, never split |
//!
//! # Accuracy Tiers
//!
//! The tier is taken from the evidence behind the winning region:
//! 1. `low` - cell area evidence only
//! 2. `medium` - one station contributed
//! 3. `high` - two or more stations contributed

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod aggregate;
pub mod catalog;
pub mod loader;
pub mod results;
pub mod score;
pub mod store;
pub mod telemetry;

pub use aggregate::RegionAggregator;
pub use catalog::{RegionCatalog, RegionDescriptor};
pub use results::{Accuracy, RegionResultList, RegionScore};
pub use score::{area_score, station_score, ScoreConfig};
pub use store::{AreaEvidence, EvidenceStore, InMemoryEvidenceStore, StationEvidence, StoreError};
pub use telemetry::{MemorySink, MetricsSink, OutcomeContext, Status, TracingSink};

/// Lowest mobile country code assigned by the ITU
pub const MCC_MIN: u16 = 200;

/// Highest mobile country code assigned by the ITU
pub const MCC_MAX: u16 = 799;

/// Source tag reported for results computed from the internal evidence store
pub const SOURCE_INTERNAL: &str = "internal";

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed query: {0}")]
    MalformedQuery(String),
    #[error("Evidence store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid {kind} data: {reason}")]
    InvalidData { kind: &'static str, reason: String },
}

impl LocateError {
    /// Whether a caller may reasonably retry the same query later
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocateError::Store(e) if e.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, LocateError>;

/// Cellular radio generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Radio {
    Gsm,
    Wcdma,
    Lte,
    Nr,
}

/// Identifier of a cell area (location area / tracking area)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellAreaId {
    pub radio: Radio,
    pub mcc: u16,
    pub mnc: u16,
    pub lac: u32,
}

/// A cell area seen by the querying device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellAreaObservation {
    pub radio: Radio,
    pub mcc: u16,
    pub mnc: u16,
    pub lac: u32,
}

impl CellAreaObservation {
    pub fn area_id(&self) -> CellAreaId {
        CellAreaId {
            radio: self.radio,
            mcc: self.mcc,
            mnc: self.mnc,
            lac: self.lac,
        }
    }
}

/// A single cell seen by the querying device.
///
/// Region inference only uses the cell's area, so cells are folded into
/// their area before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellObservation {
    pub radio: Radio,
    pub mcc: u16,
    pub mnc: u16,
    pub lac: u32,
    pub cid: u64,
}

impl CellObservation {
    pub fn area_id(&self) -> CellAreaId {
        CellAreaId {
            radio: self.radio,
            mcc: self.mcc,
            mnc: self.mnc,
            lac: self.lac,
        }
    }
}

/// Kind of short-range station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    Wifi,
    Bluetooth,
}

impl StationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationKind::Wifi => "wifi",
            StationKind::Bluetooth => "bluetooth",
        }
    }
}

/// A WiFi access point or Bluetooth beacon seen by the querying device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationObservation {
    /// MAC-like identifier, in any common notation
    pub mac: String,
}

impl StationObservation {
    pub fn new(mac: impl Into<String>) -> Self {
        Self { mac: mac.into() }
    }
}

/// A region query.
///
/// Collections may be omitted from a query document but never `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// API key of the caller, used only as a telemetry tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Region suggested by an outer source (e.g. GeoIP), used only as a telemetry tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_hint: Option<String>,
    #[serde(default)]
    pub cell_areas: Vec<CellAreaObservation>,
    #[serde(default)]
    pub cells: Vec<CellObservation>,
    #[serde(default)]
    pub wifi: Vec<StationObservation>,
    #[serde(default)]
    pub bluetooth: Vec<StationObservation>,
}

impl Query {
    /// Stations of one kind in submission order
    pub fn stations(&self, kind: StationKind) -> &[StationObservation] {
        match kind {
            StationKind::Wifi => &self.wifi,
            StationKind::Bluetooth => &self.bluetooth,
        }
    }

    /// Whether the query carries no evidence at all
    pub fn is_empty(&self) -> bool {
        self.cell_areas.is_empty()
            && self.cells.is_empty()
            && self.wifi.is_empty()
            && self.bluetooth.is_empty()
    }
}

/// Normalize a MAC-like identifier to 12 lowercase hex digits.
///
/// Accepts `01:23:45:67:89:ab`, `01-23-45-67-89-AB`, `0123.4567.89ab` and
/// bare hex. Returns `None` for anything else.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let mac: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if mac.len() == 12 && mac.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(mac)
    } else {
        None
    }
}

/// Normalize a region code to its uppercase two-letter form
pub fn normalize_region_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}
