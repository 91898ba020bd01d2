//! Reference data: species, their encounters and evolutions, regional dex
//! numbering, and base capture rates.
//!
//! Everything here is loaded once and treated as immutable afterwards. The
//! season and time-of-day tags that the raw data bakes into location labels
//! are parsed into [`LocationTags`] at load time.

use regex::Regex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

use crate::clock::{Period, Season};
use crate::constants::REGIONAL_INDEX_FALLBACK_OFFSET;

/// Errors raised while loading reference data.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to parse {document}: {source}")]
    Parse {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("species id {id} is defined more than once")]
    DuplicateSpecies { id: u32 },
    #[error("species name {name:?} is used by ids {first} and {second}")]
    DuplicateName { name: String, first: u32, second: u32 },
    #[error("unknown region {0:?}")]
    UnknownRegion(String),
}

/// Game regions in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Kanto,
    Johto,
    Hoenn,
    Sinnoh,
    Unova,
}

impl Region {
    pub const ALL: [Self; 5] = [
        Self::Kanto,
        Self::Johto,
        Self::Hoenn,
        Self::Sinnoh,
        Self::Unova,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kanto => "Kanto",
            Self::Johto => "Johto",
            Self::Hoenn => "Hoenn",
            Self::Sinnoh => "Sinnoh",
            Self::Unova => "Unova",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Region {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|region| region.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| DataError::UnknownRegion(s.to_string()))
    }
}

/// Encounter rarity tiers, ordered from most to least common.
///
/// The two trailing tiers mark encounters that cannot be caught in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rarity {
    #[serde(rename = "Very Common")]
    VeryCommon,
    Common,
    Horde,
    Uncommon,
    Rare,
    #[serde(rename = "Very Rare")]
    VeryRare,
    Lure,
    Special,
    Uncatchable,
    Unobtainable,
}

impl Rarity {
    pub const ALL: [Self; 10] = [
        Self::VeryCommon,
        Self::Common,
        Self::Horde,
        Self::Uncommon,
        Self::Rare,
        Self::VeryRare,
        Self::Lure,
        Self::Special,
        Self::Uncatchable,
        Self::Unobtainable,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryCommon => "Very Common",
            Self::Common => "Common",
            Self::Horde => "Horde",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::VeryRare => "Very Rare",
            Self::Lure => "Lure",
            Self::Special => "Special",
            Self::Uncatchable => "Uncatchable",
            Self::Unobtainable => "Unobtainable",
        }
    }

    /// Whether an encounter of this tier can actually be caught.
    #[must_use]
    pub const fn is_catchable(self) -> bool {
        !matches!(self, Self::Uncatchable | Self::Unobtainable)
    }

    /// Parse a tier by its label, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let needle = label.trim();
        Self::ALL
            .into_iter()
            .find(|rarity| rarity.label().eq_ignore_ascii_case(needle))
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Known encounter methods in display order. Anything else is kept verbatim.
pub const METHOD_ORDER: [&str; 14] = [
    "Grass",
    "Cave",
    "Water",
    "Rocks",
    "Inside",
    "Old Rod",
    "Good Rod",
    "Super Rod",
    "Honey Tree",
    "Dark Grass",
    "Fishing",
    "Shadow",
    "Dust Cloud",
    "Headbutt",
];

/// Mechanical means of finding a species at a location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EncounterMethod {
    Known(usize),
    Other(String),
}

impl EncounterMethod {
    /// Position in [`METHOD_ORDER`], or `None` for methods outside it.
    #[must_use]
    pub const fn order(&self) -> Option<usize> {
        match self {
            Self::Known(index) => Some(*index),
            Self::Other(_) => None,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Known(index) => METHOD_ORDER.get(*index).copied().unwrap_or_default(),
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for EncounterMethod {
    fn from(raw: String) -> Self {
        METHOD_ORDER
            .iter()
            .position(|known| known.eq_ignore_ascii_case(raw.trim()))
            .map_or(Self::Other(raw), Self::Known)
    }
}

impl From<&str> for EncounterMethod {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<EncounterMethod> for String {
    fn from(method: EncounterMethod) -> Self {
        method.label().to_string()
    }
}

impl fmt::Display for EncounterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Periods a location label is restricted to. Empty means "any time".
pub type PeriodSet = SmallVec<[Period; 3]>;

/// Season and time-of-day restrictions parsed out of a raw location label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocationTags {
    pub season: Option<Season>,
    pub periods: PeriodSet,
    pub clean_label: String,
}

fn season_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)season\s*(\d)").unwrap())
}

fn period_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b(morning|day|night)\b").unwrap())
}

fn tag_parenthetical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\s*\((season[0-3]|day|night|morning)[^)]*\)").unwrap()
    })
}

impl LocationTags {
    /// Parse the tags embedded in a raw label. Unparseable tags read as "none".
    #[must_use]
    pub fn parse(label: &str) -> Self {
        let season = season_pattern()
            .captures(label)
            .and_then(|caps| caps.get(1))
            .and_then(|digit| digit.as_str().parse::<u8>().ok())
            .and_then(Season::from_index);

        let mut periods = PeriodSet::new();
        for found in period_pattern().find_iter(label) {
            if let Some(period) = Period::from_tag(found.as_str())
                && !periods.contains(&period)
            {
                periods.push(period);
            }
        }

        let clean_label = tag_parenthetical_pattern()
            .replace_all(label, "")
            .trim()
            .to_string();

        Self {
            season,
            periods,
            clean_label,
        }
    }

    #[must_use]
    pub fn is_time_tagged(&self) -> bool {
        !self.periods.is_empty()
    }

    /// Human-readable tag list such as `"Morning/Day"`.
    #[must_use]
    pub fn time_label(&self) -> Option<String> {
        if self.periods.is_empty() {
            return None;
        }
        Some(
            self.periods
                .iter()
                .map(|period| period.name())
                .collect::<Vec<_>>()
                .join("/"),
        )
    }
}

/// One place and way a species can be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    #[serde(default)]
    pub region_id: u32,
    pub region_name: Region,
    #[serde(default)]
    pub location: String,
    pub rarity: Rarity,
    #[serde(rename = "type", default)]
    pub method: Option<EncounterMethod>,
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub max_level: Option<u32>,
    #[serde(skip)]
    pub tags: LocationTags,
}

impl Encounter {
    /// Parse the location label into [`LocationTags`].
    pub fn prepare(&mut self) {
        self.tags = LocationTags::parse(&self.location);
    }

    /// Label with season/time parentheticals removed.
    #[must_use]
    pub fn clean_location(&self) -> &str {
        &self.tags.clean_label
    }

    #[must_use]
    pub fn level_range(&self) -> Option<String> {
        match (self.min_level, self.max_level) {
            (Some(min), Some(max)) if min != max => Some(format!("{min}-{max}")),
            (_, Some(level)) | (Some(level), None) => Some(level.to_string()),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStats {
    #[serde(default)]
    pub hp: Option<u32>,
}

/// How an evolution is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvolutionTrigger {
    Level,
    Item,
    #[serde(other)]
    Other,
}

/// A directed evolution edge to `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub trigger: EvolutionTrigger,
    #[serde(default)]
    pub val: Option<u32>,
    #[serde(default)]
    pub item_name: Option<String>,
}

impl Evolution {
    #[must_use]
    pub fn describe(&self) -> String {
        match (self.trigger, self.val, self.item_name.as_deref()) {
            (EvolutionTrigger::Level, Some(level), _) => format!("Level {level}"),
            (EvolutionTrigger::Item, _, Some(item)) => item.to_string(),
            (EvolutionTrigger::Level, None, _) => "Level up".to_string(),
            (EvolutionTrigger::Item, _, None) => "Item".to_string(),
            (EvolutionTrigger::Other, _, _) => "Other".to_string(),
        }
    }
}

const fn default_obtainable() -> bool {
    true
}

/// A collectible species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub stats: BaseStats,
    #[serde(default)]
    pub locations: Vec<Encounter>,
    #[serde(default)]
    pub evolutions: Vec<Evolution>,
    #[serde(default = "default_obtainable")]
    pub obtainable: bool,
}

impl Species {
    #[must_use]
    pub fn has_type(&self, element: &str) -> bool {
        self.types
            .iter()
            .any(|own| own.eq_ignore_ascii_case(element))
    }

    /// True when at least one encounter is not tagged as non-catchable.
    #[must_use]
    pub fn has_catchable_encounter(&self) -> bool {
        self.locations
            .iter()
            .any(|encounter| encounter.rarity.is_catchable())
    }
}

/// Regional dex numbering for one species. Zero means "not in that dex".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalDex {
    pub id: u32,
    #[serde(default)]
    pub kanto: u32,
    #[serde(default)]
    pub johto: u32,
    #[serde(default)]
    pub hoenn: u32,
    #[serde(default)]
    pub sinnoh: u32,
    #[serde(default)]
    pub unova: u32,
}

impl RegionalDex {
    #[must_use]
    pub const fn index(&self, region: Region) -> Option<u32> {
        let raw = match region {
            Region::Kanto => self.kanto,
            Region::Johto => self.johto,
            Region::Hoenn => self.hoenn,
            Region::Sinnoh => self.sinnoh,
            Region::Unova => self.unova,
        };
        if raw == 0 { None } else { Some(raw) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchRate {
    pub id: u32,
    pub rate: u32,
}

/// All immutable reference data with lookup indexes.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    species: Vec<Species>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
    dex: HashMap<u32, RegionalDex>,
    rates: HashMap<u32, u32>,
}

impl ReferenceData {
    /// Create empty reference data (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the three reference documents.
    ///
    /// # Errors
    ///
    /// Returns an error if any document cannot be parsed or if species ids or
    /// names collide.
    pub fn from_json(monsters: &str, dex: &str, rates: &str) -> Result<Self, DataError> {
        let species: Vec<Species> =
            serde_json::from_str(monsters).map_err(|source| DataError::Parse {
                document: "monsters",
                source,
            })?;
        let dex: Vec<RegionalDex> =
            serde_json::from_str(dex).map_err(|source| DataError::Parse {
                document: "dex",
                source,
            })?;
        let rates: Vec<CatchRate> =
            serde_json::from_str(rates).map_err(|source| DataError::Parse {
                document: "catch_rates",
                source,
            })?;
        Self::from_parts(species, dex, rates)
    }

    /// Build reference data from pre-parsed records.
    ///
    /// # Errors
    ///
    /// Returns an error if species ids or names collide.
    pub fn from_parts(
        mut species: Vec<Species>,
        dex: Vec<RegionalDex>,
        rates: Vec<CatchRate>,
    ) -> Result<Self, DataError> {
        let mut by_id = HashMap::with_capacity(species.len());
        let mut by_name = HashMap::with_capacity(species.len());
        for (index, entry) in species.iter_mut().enumerate() {
            for encounter in &mut entry.locations {
                encounter.prepare();
            }
            if by_id.insert(entry.id, index).is_some() {
                return Err(DataError::DuplicateSpecies { id: entry.id });
            }
            if let Some(previous) = by_name.insert(entry.name.to_lowercase(), index) {
                return Err(DataError::DuplicateName {
                    name: entry.name.clone(),
                    first: species_id_at(&by_id, previous),
                    second: entry.id,
                });
            }
        }

        for entry in &species {
            for evolution in &entry.evolutions {
                if !by_id.contains_key(&evolution.id) {
                    log::warn!(
                        "{} evolves into unknown species id {}",
                        entry.name,
                        evolution.id
                    );
                }
            }
        }

        log::info!(
            "loaded {} species, {} dex rows, {} catch rates",
            species.len(),
            dex.len(),
            rates.len()
        );

        Ok(Self {
            species,
            by_id,
            by_name,
            dex: dex.into_iter().map(|row| (row.id, row)).collect(),
            rates: rates.into_iter().map(|row| (row.id, row.rate)).collect(),
        })
    }

    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    #[must_use]
    pub fn species_by_id(&self, id: u32) -> Option<&Species> {
        self.by_id.get(&id).map(|&index| &self.species[index])
    }

    #[must_use]
    pub fn species_by_name(&self, name: &str) -> Option<&Species> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&index| &self.species[index])
    }

    /// Look a species up by national number or by name.
    #[must_use]
    pub fn find(&self, query: &str) -> Option<&Species> {
        query
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|id| self.species_by_id(id))
            .or_else(|| self.species_by_name(query))
    }

    #[must_use]
    pub fn catch_rate(&self, id: u32) -> Option<u32> {
        self.rates.get(&id).copied()
    }

    #[must_use]
    pub fn regional_index(&self, id: u32, region: Region) -> Option<u32> {
        self.dex.get(&id).and_then(|row| row.index(region))
    }

    /// Sort position within a region's dex; species outside it follow by
    /// national id.
    #[must_use]
    pub fn dex_sort_index(&self, id: u32, region: Option<Region>) -> u32 {
        match region {
            Some(region) => self
                .regional_index(id, region)
                .unwrap_or_else(|| REGIONAL_INDEX_FALLBACK_OFFSET.saturating_add(id)),
            None => id,
        }
    }
}

fn species_id_at(by_id: &HashMap<u32, usize>, index: usize) -> u32 {
    by_id
        .iter()
        .find_map(|(&id, &at)| (at == index).then_some(id))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_tags_parse_time_and_season() {
        let tags = LocationTags::parse("Route 29 (Morning/Day)");
        assert_eq!(tags.season, None);
        assert_eq!(tags.periods.as_slice(), &[Period::Morning, Period::Day]);
        assert_eq!(tags.clean_label, "Route 29");
        assert_eq!(tags.time_label().as_deref(), Some("Morning/Day"));

        let seasonal = LocationTags::parse("National Park (SEASON2)");
        assert_eq!(seasonal.season, Some(Season::Autumn));
        assert!(seasonal.periods.is_empty());
        assert_eq!(seasonal.clean_label, "National Park");
    }

    #[test]
    fn malformed_tags_read_as_untagged() {
        let tags = LocationTags::parse("Mt. Moon (SEASON9)");
        assert_eq!(tags.season, None);
        assert_eq!(tags.clean_label, "Mt. Moon (SEASON9)");

        let untagged = LocationTags::parse("Midday Meadow");
        assert!(untagged.periods.is_empty());
    }

    #[test]
    fn encounter_method_keeps_unknown_labels() {
        assert_eq!(EncounterMethod::from("old rod").order(), Some(5));
        let odd = EncounterMethod::from("Sweet Scent");
        assert_eq!(odd.order(), None);
        assert_eq!(odd.label(), "Sweet Scent");
    }

    #[test]
    fn reference_data_rejects_duplicate_ids() {
        let monsters = r#"[
            {"id": 1, "name": "A", "types": [], "stats": {"hp": 10}},
            {"id": 1, "name": "B", "types": [], "stats": {"hp": 10}}
        ]"#;
        let err = ReferenceData::from_json(monsters, "[]", "[]").unwrap_err();
        assert!(matches!(err, DataError::DuplicateSpecies { id: 1 }));
    }

    #[test]
    fn reference_data_reports_document_on_parse_failure() {
        let err = ReferenceData::from_json("[]", "{", "[]").unwrap_err();
        assert!(err.to_string().starts_with("failed to parse dex"));
    }

    #[test]
    fn lookups_cover_name_number_and_dex() {
        let monsters = r#"[
            {"id": 7, "name": "Squirtle", "types": ["WATER"], "stats": {"hp": 44},
             "locations": [{"region_id": 0, "region_name": "Kanto", "location": "Route 24 (Night)",
                            "rarity": "Rare", "type": "Grass", "min_level": 8, "max_level": 12}],
             "evolutions": [{"id": 8, "name": "Wartortle", "type": "LEVEL", "val": 16}]}
        ]"#;
        let dex = r#"[{"id": 7, "kanto": 7, "johto": 0}]"#;
        let rates = r#"[{"id": 7, "rate": 45}]"#;
        let data = ReferenceData::from_json(monsters, dex, rates).unwrap();

        let squirtle = data.find("squirtle").unwrap();
        assert_eq!(squirtle.id, 7);
        assert!(data.find("7").is_some());
        assert!(squirtle.has_type("water"));
        assert_eq!(squirtle.locations[0].clean_location(), "Route 24");
        assert_eq!(squirtle.locations[0].level_range().as_deref(), Some("8-12"));
        assert_eq!(squirtle.evolutions[0].describe(), "Level 16");
        assert_eq!(data.catch_rate(7), Some(45));
        assert_eq!(data.dex_sort_index(7, Some(Region::Kanto)), 7);
        assert_eq!(data.dex_sort_index(7, Some(Region::Johto)), 1_000_007);
    }
}
