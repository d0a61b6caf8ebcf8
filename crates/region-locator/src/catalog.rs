//! Region catalog: mobile country code → candidate regions
//!
//! An MCC is not always unique to one country. The catalog models the
//! mapping as a multi-valued table:
//!
//! ```text
//! 235 → [GB]
//! 234 → [GB, GG, IM, JE]
//! 340 → [GP, MQ, GF, BL, MF]
//! ```
//!
//! Ordering within one MCC is the table order and carries no ranking.

use crate::{normalize_region_code, MCC_MAX, MCC_MIN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A region that an MCC may belong to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDescriptor {
    /// ISO 3166-1 alpha-2 code (e.g., "GB", "DE")
    pub code: String,
    /// Display name
    pub name: String,
}

impl RegionDescriptor {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Whether an MCC lies in the range the ITU assigns to countries
pub fn is_assignable_mcc(mcc: u16) -> bool {
    (MCC_MIN..=MCC_MAX).contains(&mcc)
}

/// Read-only MCC → region table, loaded once per process
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    by_mcc: BTreeMap<u16, Vec<RegionDescriptor>>,
    by_code: BTreeMap<String, RegionDescriptor>,
}

impl RegionCatalog {
    /// Create new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Create catalog with the built-in MCC table
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.load_default_data();
        catalog
    }

    /// Candidate regions for an MCC; empty for unknown or out-of-range codes
    pub fn regions_for_mcc(&self, mcc: u16) -> &[RegionDescriptor] {
        if !is_assignable_mcc(mcc) {
            return &[];
        }
        self.by_mcc.get(&mcc).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether the MCC is in range and maps to at least one region
    pub fn is_valid_mcc(&self, mcc: u16) -> bool {
        !self.regions_for_mcc(mcc).is_empty()
    }

    /// Look up a region by code (case-insensitive)
    pub fn region(&self, code: &str) -> Option<&RegionDescriptor> {
        self.by_code.get(&code.trim().to_ascii_uppercase())
    }

    /// Number of MCCs in the table
    pub fn len(&self) -> usize {
        self.by_mcc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mcc.is_empty()
    }

    /// Register the regions for one MCC.
    ///
    /// Out-of-range MCCs and malformed codes are rejected; a code repeated
    /// within one MCC is kept once. Returns the number of regions stored.
    pub fn insert(&mut self, mcc: u16, regions: impl IntoIterator<Item = RegionDescriptor>) -> usize {
        if !is_assignable_mcc(mcc) {
            return 0;
        }

        let entry = self.by_mcc.entry(mcc).or_default();
        for region in regions {
            let Some(code) = normalize_region_code(&region.code) else {
                continue;
            };
            if entry.iter().any(|r| r.code == code) {
                continue;
            }
            let region = RegionDescriptor::new(code.clone(), region.name);
            self.by_code.entry(code).or_insert_with(|| region.clone());
            entry.push(region);
        }

        let stored = entry.len();
        if stored == 0 {
            self.by_mcc.remove(&mcc);
        }
        stored
    }

    fn add_mcc(&mut self, mcc: u16, regions: &[(&str, &str)]) {
        self.insert(
            mcc,
            regions.iter().map(|&(code, name)| RegionDescriptor::new(code, name)),
        );
    }

    /// Load the built-in MCC table
    pub fn load_default_data(&mut self) {
        // Europe
        self.add_mcc(202, &[("GR", "Greece")]);
        self.add_mcc(204, &[("NL", "Netherlands")]);
        self.add_mcc(206, &[("BE", "Belgium")]);
        self.add_mcc(208, &[("FR", "France")]);
        self.add_mcc(212, &[("MC", "Monaco")]);
        self.add_mcc(213, &[("AD", "Andorra")]);
        self.add_mcc(214, &[("ES", "Spain")]);
        self.add_mcc(216, &[("HU", "Hungary")]);
        self.add_mcc(218, &[("BA", "Bosnia and Herzegovina")]);
        self.add_mcc(219, &[("HR", "Croatia")]);
        self.add_mcc(220, &[("RS", "Serbia")]);
        self.add_mcc(222, &[("IT", "Italy")]);
        self.add_mcc(226, &[("RO", "Romania")]);
        self.add_mcc(228, &[("CH", "Switzerland")]);
        self.add_mcc(230, &[("CZ", "Czech Republic")]);
        self.add_mcc(231, &[("SK", "Slovakia")]);
        self.add_mcc(232, &[("AT", "Austria")]);
        self.add_mcc(
            234,
            &[
                ("GB", "United Kingdom"),
                ("GG", "Guernsey"),
                ("IM", "Isle of Man"),
                ("JE", "Jersey"),
            ],
        );
        self.add_mcc(235, &[("GB", "United Kingdom")]);
        self.add_mcc(238, &[("DK", "Denmark")]);
        self.add_mcc(240, &[("SE", "Sweden")]);
        self.add_mcc(242, &[("NO", "Norway")]);
        self.add_mcc(244, &[("FI", "Finland")]);
        self.add_mcc(246, &[("LT", "Lithuania")]);
        self.add_mcc(247, &[("LV", "Latvia")]);
        self.add_mcc(248, &[("EE", "Estonia")]);
        self.add_mcc(250, &[("RU", "Russia")]);
        self.add_mcc(255, &[("UA", "Ukraine")]);
        self.add_mcc(257, &[("BY", "Belarus")]);
        self.add_mcc(260, &[("PL", "Poland")]);
        self.add_mcc(262, &[("DE", "Germany")]);
        self.add_mcc(266, &[("GI", "Gibraltar")]);
        self.add_mcc(268, &[("PT", "Portugal")]);
        self.add_mcc(270, &[("LU", "Luxembourg")]);
        self.add_mcc(272, &[("IE", "Ireland")]);
        self.add_mcc(274, &[("IS", "Iceland")]);
        self.add_mcc(276, &[("AL", "Albania")]);
        self.add_mcc(278, &[("MT", "Malta")]);
        self.add_mcc(280, &[("CY", "Cyprus")]);
        self.add_mcc(284, &[("BG", "Bulgaria")]);
        self.add_mcc(286, &[("TR", "Turkey")]);
        self.add_mcc(293, &[("SI", "Slovenia")]);
        self.add_mcc(294, &[("MK", "North Macedonia")]);
        self.add_mcc(295, &[("LI", "Liechtenstein")]);
        self.add_mcc(297, &[("ME", "Montenegro")]);

        // North America & Caribbean
        self.add_mcc(302, &[("CA", "Canada")]);
        self.add_mcc(308, &[("PM", "Saint Pierre and Miquelon")]);
        self.add_mcc(
            310,
            &[
                ("US", "United States"),
                ("GU", "Guam"),
                ("MP", "Northern Mariana Islands"),
            ],
        );
        self.add_mcc(311, &[("US", "United States"), ("GU", "Guam")]);
        self.add_mcc(312, &[("US", "United States")]);
        self.add_mcc(313, &[("US", "United States")]);
        self.add_mcc(314, &[("US", "United States")]);
        self.add_mcc(315, &[("US", "United States")]);
        self.add_mcc(316, &[("US", "United States")]);
        self.add_mcc(330, &[("PR", "Puerto Rico")]);
        self.add_mcc(334, &[("MX", "Mexico")]);
        self.add_mcc(338, &[("JM", "Jamaica")]);
        self.add_mcc(
            340,
            &[
                ("GP", "Guadeloupe"),
                ("MQ", "Martinique"),
                ("GF", "French Guiana"),
                ("BL", "Saint Barthelemy"),
                ("MF", "Saint Martin"),
            ],
        );
        self.add_mcc(342, &[("BB", "Barbados")]);
        self.add_mcc(344, &[("AG", "Antigua and Barbuda")]);
        self.add_mcc(346, &[("KY", "Cayman Islands")]);
        self.add_mcc(348, &[("VG", "British Virgin Islands")]);
        self.add_mcc(350, &[("BM", "Bermuda")]);
        self.add_mcc(352, &[("GD", "Grenada")]);
        self.add_mcc(354, &[("MS", "Montserrat")]);
        self.add_mcc(356, &[("KN", "Saint Kitts and Nevis")]);
        self.add_mcc(358, &[("LC", "Saint Lucia")]);
        self.add_mcc(360, &[("VC", "Saint Vincent and the Grenadines")]);
        self.add_mcc(
            362,
            &[
                ("CW", "Curacao"),
                ("BQ", "Caribbean Netherlands"),
                ("SX", "Sint Maarten"),
            ],
        );
        self.add_mcc(363, &[("AW", "Aruba")]);
        self.add_mcc(364, &[("BS", "Bahamas")]);
        self.add_mcc(365, &[("AI", "Anguilla")]);
        self.add_mcc(366, &[("DM", "Dominica")]);
        self.add_mcc(368, &[("CU", "Cuba")]);
        self.add_mcc(370, &[("DO", "Dominican Republic")]);
        self.add_mcc(372, &[("HT", "Haiti")]);
        self.add_mcc(374, &[("TT", "Trinidad and Tobago")]);
        self.add_mcc(376, &[("TC", "Turks and Caicos Islands")]);

        // Asia & Middle East
        self.add_mcc(400, &[("AZ", "Azerbaijan")]);
        self.add_mcc(401, &[("KZ", "Kazakhstan")]);
        self.add_mcc(404, &[("IN", "India")]);
        self.add_mcc(405, &[("IN", "India")]);
        self.add_mcc(410, &[("PK", "Pakistan")]);
        self.add_mcc(412, &[("AF", "Afghanistan")]);
        self.add_mcc(413, &[("LK", "Sri Lanka")]);
        self.add_mcc(414, &[("MM", "Myanmar")]);
        self.add_mcc(415, &[("LB", "Lebanon")]);
        self.add_mcc(416, &[("JO", "Jordan")]);
        self.add_mcc(417, &[("SY", "Syria")]);
        self.add_mcc(418, &[("IQ", "Iraq")]);
        self.add_mcc(419, &[("KW", "Kuwait")]);
        self.add_mcc(420, &[("SA", "Saudi Arabia")]);
        self.add_mcc(421, &[("YE", "Yemen")]);
        self.add_mcc(422, &[("OM", "Oman")]);
        self.add_mcc(424, &[("AE", "United Arab Emirates")]);
        self.add_mcc(425, &[("IL", "Israel"), ("PS", "Palestine")]);
        self.add_mcc(426, &[("BH", "Bahrain")]);
        self.add_mcc(427, &[("QA", "Qatar")]);
        self.add_mcc(428, &[("MN", "Mongolia")]);
        self.add_mcc(429, &[("NP", "Nepal")]);
        self.add_mcc(432, &[("IR", "Iran")]);
        self.add_mcc(434, &[("UZ", "Uzbekistan")]);
        self.add_mcc(440, &[("JP", "Japan")]);
        self.add_mcc(441, &[("JP", "Japan")]);
        self.add_mcc(450, &[("KR", "South Korea")]);
        self.add_mcc(452, &[("VN", "Vietnam")]);
        self.add_mcc(454, &[("HK", "Hong Kong")]);
        self.add_mcc(455, &[("MO", "Macao")]);
        self.add_mcc(456, &[("KH", "Cambodia")]);
        self.add_mcc(457, &[("LA", "Laos")]);
        self.add_mcc(460, &[("CN", "China")]);
        self.add_mcc(466, &[("TW", "Taiwan")]);
        self.add_mcc(470, &[("BD", "Bangladesh")]);

        // Oceania & Southeast Asia
        self.add_mcc(502, &[("MY", "Malaysia")]);
        self.add_mcc(505, &[("AU", "Australia"), ("NF", "Norfolk Island")]);
        self.add_mcc(510, &[("ID", "Indonesia")]);
        self.add_mcc(515, &[("PH", "Philippines")]);
        self.add_mcc(520, &[("TH", "Thailand")]);
        self.add_mcc(525, &[("SG", "Singapore")]);
        self.add_mcc(528, &[("BN", "Brunei")]);
        self.add_mcc(530, &[("NZ", "New Zealand")]);

        // Africa
        self.add_mcc(602, &[("EG", "Egypt")]);
        self.add_mcc(603, &[("DZ", "Algeria")]);
        self.add_mcc(604, &[("MA", "Morocco")]);
        self.add_mcc(605, &[("TN", "Tunisia")]);
        self.add_mcc(606, &[("LY", "Libya")]);
        self.add_mcc(608, &[("SN", "Senegal")]);
        self.add_mcc(620, &[("GH", "Ghana")]);
        self.add_mcc(621, &[("NG", "Nigeria")]);
        self.add_mcc(639, &[("KE", "Kenya")]);
        self.add_mcc(640, &[("TZ", "Tanzania")]);
        self.add_mcc(641, &[("UG", "Uganda")]);
        self.add_mcc(647, &[("RE", "Reunion"), ("YT", "Mayotte")]);
        self.add_mcc(655, &[("ZA", "South Africa")]);

        // Central & South America
        self.add_mcc(712, &[("CR", "Costa Rica")]);
        self.add_mcc(714, &[("PA", "Panama")]);
        self.add_mcc(716, &[("PE", "Peru")]);
        self.add_mcc(722, &[("AR", "Argentina")]);
        self.add_mcc(724, &[("BR", "Brazil")]);
        self.add_mcc(730, &[("CL", "Chile")]);
        self.add_mcc(732, &[("CO", "Colombia")]);
        self.add_mcc(734, &[("VE", "Venezuela")]);
        self.add_mcc(736, &[("BO", "Bolivia")]);
        self.add_mcc(740, &[("EC", "Ecuador")]);
        self.add_mcc(744, &[("PY", "Paraguay")]);
        self.add_mcc(748, &[("UY", "Uruguay")]);
    }
}
