//! Evidence weights for stations and cell areas
//!
//! Both weights share one shape:
//!
//! ```text
//! score(n, age) = growth(n) · decay(age)
//! growth(n)     = min(1, (1 + ln(1 + n)) / (1 + ln(1 + N_sat)))
//! decay(age)    = max(D_min, 0.5^(age / T_half))
//! ```
//!
//! `n` is the station's sample count or the area's cell count, `age` is the
//! number of days between the record's last sighting and `now`. The result
//! always lies in `(0, 1]`, grows with `n` under diminishing returns and
//! shrinks with age without ever reaching zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Station half-life in days
pub const STATION_HALF_LIFE_DAYS: f64 = 60.000000000;

/// Cell area half-life in days
pub const AREA_HALF_LIFE_DAYS: f64 = 180.000000000;

/// Sample count at which station growth saturates
pub const STATION_SATURATION_SAMPLES: f64 = 100.000000000;

/// Cell count at which area growth saturates
pub const AREA_SATURATION_CELLS: f64 = 50.000000000;

/// Floor of the recency decay
pub const MIN_DECAY: f64 = 0.050000000;

const MS_PER_DAY: f64 = 86_400_000.000000000;

/// Score function parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Days after which a station's weight halves
    pub station_half_life_days: f64,
    /// Days after which a cell area's weight halves
    pub area_half_life_days: f64,
    /// Sample count giving full station growth
    pub station_saturation_samples: f64,
    /// Cell count giving full area growth
    pub area_saturation_cells: f64,
    /// Lower bound of the recency decay, in (0, 1]
    pub min_decay: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            station_half_life_days: STATION_HALF_LIFE_DAYS,
            area_half_life_days: AREA_HALF_LIFE_DAYS,
            station_saturation_samples: STATION_SATURATION_SAMPLES,
            area_saturation_cells: AREA_SATURATION_CELLS,
            min_decay: MIN_DECAY,
        }
    }
}

impl ScoreConfig {
    fn decay_floor(&self) -> f64 {
        if self.min_decay > 0.0 && self.min_decay <= 1.0 {
            self.min_decay
        } else {
            MIN_DECAY
        }
    }
}

/// Weight of one station sighting
pub fn station_score(samples: u64, last_seen: DateTime<Utc>, now: DateTime<Utc>, config: &ScoreConfig) -> f64 {
    let growth = growth(samples, config.station_saturation_samples);
    let decay = decay(age_days(last_seen, now), config.station_half_life_days, config.decay_floor());
    let score = growth * decay;

    debug!(
        "station_score(samples={}, age={:.1}d) = {:.6} (growth={:.4}, decay={:.4})",
        samples,
        age_days(last_seen, now),
        score,
        growth,
        decay
    );

    score
}

/// Weight of one cell area
pub fn area_score(num_cells: u64, last_seen: DateTime<Utc>, now: DateTime<Utc>, config: &ScoreConfig) -> f64 {
    let growth = growth(num_cells, config.area_saturation_cells);
    let decay = decay(age_days(last_seen, now), config.area_half_life_days, config.decay_floor());
    let score = growth * decay;

    debug!(
        "area_score(num_cells={}, age={:.1}d) = {:.6} (growth={:.4}, decay={:.4})",
        num_cells,
        age_days(last_seen, now),
        score,
        growth,
        decay
    );

    score
}

/// Days elapsed since `last_seen`; sightings in the future count as fresh
fn age_days(last_seen: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = (now - last_seen).num_milliseconds();
    (ms.max(0) as f64) / MS_PER_DAY
}

/// Logarithmic growth in (0, 1]
fn growth(count: u64, saturation: f64) -> f64 {
    let saturation = if saturation.is_finite() && saturation > 0.0 {
        saturation
    } else {
        0.0
    };
    let value = (1.0 + (count as f64).ln_1p()) / (1.0 + saturation.ln_1p());
    value.min(1.0)
}

/// Half-life decay bounded below by `floor`
fn decay(age_days: f64, half_life_days: f64, floor: f64) -> f64 {
    if !(half_life_days.is_finite() && half_life_days > 0.0) {
        return 1.0;
    }
    0.5_f64.powf(age_days / half_life_days).clamp(floor, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_station_score_in_range() {
        let config = ScoreConfig::default();
        for samples in [0, 1, 10, 100, 10_000, u64::MAX] {
            for days in [0, 1, 30, 365, 100_000] {
                let score = station_score(samples, now() - Duration::days(days), now(), &config);
                assert!(score > 0.0 && score <= 1.0, "samples={} days={} score={}", samples, days, score);
            }
        }
    }

    #[test]
    fn test_area_score_in_range() {
        let config = ScoreConfig::default();
        for cells in [0, 1, 6, 50, 1_000] {
            for days in [0, 7, 3650] {
                let score = area_score(cells, now() - Duration::days(days), now(), &config);
                assert!(score > 0.0 && score <= 1.0, "cells={} days={} score={}", cells, days, score);
            }
        }
    }

    #[test]
    fn test_more_samples_never_lower() {
        let config = ScoreConfig::default();
        let seen = now() - Duration::days(10);
        let mut previous = 0.0;
        for samples in 0..200 {
            let score = station_score(samples, seen, now(), &config);
            assert!(score >= previous, "samples={} dropped score", samples);
            previous = score;
        }
    }

    #[test]
    fn test_older_never_higher() {
        let config = ScoreConfig::default();
        let mut previous = f64::INFINITY;
        for days in 0..1000 {
            let score = area_score(10, now() - Duration::days(days), now(), &config);
            assert!(score <= previous, "days={} raised score", days);
            previous = score;
        }
    }

    #[test]
    fn test_saturation_reaches_one() {
        let config = ScoreConfig::default();
        assert_eq!(station_score(100, now(), now(), &config), 1.0);
        assert_eq!(station_score(5_000, now(), now(), &config), 1.0);
        assert_eq!(area_score(50, now(), now(), &config), 1.0);
    }

    #[test]
    fn test_decay_floor() {
        let config = ScoreConfig::default();
        let ancient = now() - Duration::days(365 * 50);
        assert_eq!(station_score(100, ancient, now(), &config), MIN_DECAY);
    }

    #[test]
    fn test_future_last_seen_counts_as_fresh() {
        let config = ScoreConfig::default();
        let future = now() + Duration::days(3);
        assert_eq!(
            station_score(20, future, now(), &config),
            station_score(20, now(), now(), &config)
        );
    }

    #[test]
    fn test_half_life() {
        let config = ScoreConfig::default();
        let fresh = station_score(100, now(), now(), &config);
        let half = station_score(100, now() - Duration::days(60), now(), &config);
        assert!((half - fresh / 2.0).abs() < 1e-12, "fresh={} half={}", fresh, half);
    }

    #[test]
    fn test_identical_inputs_bit_identical() {
        let config = ScoreConfig::default();
        let seen = now() - Duration::hours(37);
        let a = station_score(17, seen, now(), &config);
        let b = station_score(17, seen, now(), &config);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_degenerate_config_stays_in_range() {
        let config = ScoreConfig {
            station_half_life_days: 0.0,
            area_half_life_days: f64::NAN,
            station_saturation_samples: -5.0,
            area_saturation_cells: f64::INFINITY,
            min_decay: 0.0,
        };
        let old = now() - Duration::days(400);
        let s = station_score(3, old, now(), &config);
        let a = area_score(3, old, now(), &config);
        assert!(s > 0.0 && s <= 1.0);
        assert!(a > 0.0 && a <= 1.0);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: ScoreConfig = serde_json::from_str(r#"{"station_half_life_days": 14.0}"#).unwrap();
        assert_eq!(config.station_half_life_days, 14.0);
        assert_eq!(config.area_half_life_days, AREA_HALF_LIFE_DAYS);
        assert_eq!(config.min_decay, MIN_DECAY);
    }
}
