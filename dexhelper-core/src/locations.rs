//! Location aggregation: groups live encounters by place and ranks places by
//! how much they advance the collection.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::clock::{ActiveEncounter, Availability, active_encounters};
use crate::collection::CollectionStatus;
use crate::config::HelperConfig;
use crate::data::{Rarity, ReferenceData, Region, Species};
use crate::evolution::EvolutionResolver;
use crate::notes::{EvolutionNote, best_rarity, better_spot_exists, evolution_notes};
use crate::strategy::{SpeciesStrategy, StrategySelector};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("region {0} listed more than once")]
    DuplicateRegion(Region),
    #[error("unknown sort {0:?} (expected lines, catchable, or dex)")]
    UnknownSort(String),
    #[error("unknown rarity filter {0:?}")]
    UnknownRarity(String),
}

/// Primary ranking key for locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotSort {
    #[default]
    EvolutionLines,
    CatchableSpecies,
    DexEntries,
}

impl FromStr for SpotSort {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lines" => Ok(Self::EvolutionLines),
            "catchable" => Ok(Self::CatchableSpecies),
            "dex" => Ok(Self::DexEntries),
            other => Err(QueryError::UnknownSort(other.to_string())),
        }
    }
}

/// Raw filter and sort choices for the location view.
#[derive(Debug, Clone, Default)]
pub struct SpotOptions {
    pub location: Option<String>,
    pub species: Option<String>,
    pub regions: Vec<Region>,
    pub exclude_preserve: bool,
    pub prioritize_time: bool,
    pub sort: SpotSort,
    pub hide_tallies: bool,
    pub dex_region: Option<Region>,
}

/// Validated location-view query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpotQuery {
    location: Option<String>,
    species: Option<String>,
    regions: Vec<Region>,
    exclude_preserve: bool,
    prioritize_time: bool,
    sort: SpotSort,
    hide_tallies: bool,
    dex_region: Option<Region>,
}

fn normalize_text(text: Option<String>) -> Option<String> {
    text.map(|raw| raw.trim().to_lowercase())
        .filter(|needle| !needle.is_empty())
}

impl SpotQuery {
    /// # Errors
    ///
    /// Returns an error if a region is listed twice.
    pub fn new(options: SpotOptions) -> Result<Self, QueryError> {
        let mut seen = BTreeSet::new();
        for region in &options.regions {
            if !seen.insert(*region) {
                return Err(QueryError::DuplicateRegion(*region));
            }
        }
        Ok(Self {
            location: normalize_text(options.location),
            species: normalize_text(options.species),
            regions: options.regions,
            exclude_preserve: options.exclude_preserve,
            prioritize_time: options.prioritize_time,
            sort: options.sort,
            hide_tallies: options.hide_tallies,
            dex_region: options.dex_region,
        })
    }

    #[must_use]
    pub const fn sort(&self) -> SpotSort {
        self.sort
    }

    #[must_use]
    pub const fn dex_region(&self) -> Option<Region> {
        self.dex_region
    }

    fn allows_region(&self, region: Region) -> bool {
        self.regions.is_empty() || self.regions.contains(&region)
    }
}

/// Region plus the location label with time/season tags removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LocationKey {
    pub region: Region,
    pub name: String,
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.region, self.name)
    }
}

/// One species as listed under a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotSpecies {
    pub id: u32,
    pub name: String,
    pub noted_for: Option<String>,
    pub rarities: Vec<Rarity>,
    pub best_rarity: Option<Rarity>,
    pub methods: Vec<String>,
    pub levels: Vec<String>,
    pub time_exclusivity: Vec<String>,
    pub time_exclusive_only: bool,
    pub better_spot_elsewhere: bool,
    pub uncaught_line_count: usize,
    pub notes: Vec<EvolutionNote>,
    pub strategy: Option<SpeciesStrategy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodTally {
    pub method: String,
    pub count: usize,
}

/// An aggregated, ranked location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSpot {
    pub key: LocationKey,
    pub species: Vec<SpotSpecies>,
    pub distinct_uncaught_lines: usize,
    pub catchable_count: usize,
    pub total_uncaught_dex_entries: usize,
    pub uncaught_by_rarity: BTreeMap<Rarity, usize>,
    pub uncaught_by_method: Vec<MethodTally>,
    pub has_time_exclusive: bool,
}

impl LocationSpot {
    const fn primary(&self, sort: SpotSort) -> usize {
        match sort {
            SpotSort::EvolutionLines => self.distinct_uncaught_lines,
            SpotSort::CatchableSpecies => self.catchable_count,
            SpotSort::DexEntries => self.total_uncaught_dex_entries,
        }
    }
}

fn rank(a: &LocationSpot, b: &LocationSpot, query: &SpotQuery) -> Ordering {
    let primary = b.primary(query.sort).cmp(&a.primary(query.sort));
    let leading = if query.prioritize_time {
        b.has_time_exclusive
            .cmp(&a.has_time_exclusive)
            .then(primary)
    } else {
        primary.then(a.has_time_exclusive.cmp(&b.has_time_exclusive))
    };
    leading
        .then_with(|| b.total_uncaught_dex_entries.cmp(&a.total_uncaught_dex_entries))
        .then_with(|| a.key.cmp(&b.key))
}

struct Group<'a> {
    members: Vec<(&'a Species, Vec<ActiveEncounter<'a>>)>,
}

impl<'a> Group<'a> {
    fn add(&mut self, species: &'a Species, active: ActiveEncounter<'a>) {
        match self.members.iter_mut().find(|(known, _)| known.id == species.id) {
            Some((_, encounters)) => encounters.push(active),
            None => self.members.push((species, vec![active])),
        }
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

/// Builds the ranked location view from the current collection status.
pub struct SpotFinder<'a> {
    data: &'a ReferenceData,
    resolver: &'a EvolutionResolver,
    status: &'a CollectionStatus,
    config: &'a HelperConfig,
}

impl<'a> SpotFinder<'a> {
    #[must_use]
    pub const fn new(
        data: &'a ReferenceData,
        resolver: &'a EvolutionResolver,
        status: &'a CollectionStatus,
        config: &'a HelperConfig,
    ) -> Self {
        Self {
            data,
            resolver,
            status,
            config,
        }
    }

    fn group(&self, availability: Availability) -> BTreeMap<LocationKey, Group<'a>> {
        let venues = &self.config.preserve_venues;
        let mut groups: BTreeMap<LocationKey, Group<'a>> = BTreeMap::new();
        for species in self.data.species() {
            for active in active_encounters(species, availability, venues) {
                let encounter = active.encounter;
                if encounter.rarity == Rarity::Special || !encounter.rarity.is_catchable() {
                    continue;
                }
                let key = LocationKey {
                    region: encounter.region_name,
                    name: encounter.clean_location().to_string(),
                };
                groups
                    .entry(key)
                    .or_insert_with(|| Group {
                        members: Vec::new(),
                    })
                    .add(species, active);
            }
        }
        groups
    }

    fn matches_filters(&self, key: &LocationKey, group: &Group<'_>, query: &SpotQuery) -> bool {
        if !query.allows_region(key.region) {
            return false;
        }
        if query.exclude_preserve && self.config.preserve_venues.contains(&key.name) {
            return false;
        }
        if let Some(needle) = &query.location
            && !key.to_string().to_lowercase().contains(needle)
        {
            return false;
        }
        if let Some(needle) = &query.species {
            return group
                .members
                .iter()
                .filter(|(species, _)| !self.status.is_caught(species.id))
                .any(|(species, _)| species.name.to_lowercase().contains(needle));
        }
        true
    }

    fn describe(&self, species: &Species, encounters: &[ActiveEncounter<'_>]) -> SpotSpecies {
        let venues = &self.config.preserve_venues;
        let mut rarities = Vec::new();
        let mut methods = Vec::new();
        let mut levels = Vec::new();
        let mut time_exclusivity = Vec::new();
        for active in encounters {
            let encounter = active.encounter;
            push_unique(&mut rarities, encounter.rarity);
            if let Some(method) = &encounter.method {
                push_unique(&mut methods, method.label().to_string());
            }
            if let Some(range) = encounter.level_range() {
                push_unique(&mut levels, range);
            }
            if let Some(label) = &active.time_exclusivity {
                push_unique(&mut time_exclusivity, label.clone());
            }
        }
        let best = best_rarity(encounters.iter().map(|active| active.encounter));
        let better_spot_elsewhere = rarities
            .iter()
            .all(|rarity| matches!(rarity, Rarity::Lure | Rarity::VeryRare))
            && rarities
                .iter()
                .any(|rarity| better_spot_exists(species, *rarity, venues));
        let strategy = StrategySelector::new(self.config, self.data)
            .first_complete(species, encounters.iter().map(|active| active.encounter));

        SpotSpecies {
            id: species.id,
            name: species.name.clone(),
            noted_for: self
                .status
                .get(species.id)
                .and_then(|entry| entry.evolution_note.clone()),
            rarities,
            best_rarity: best,
            methods,
            levels,
            time_exclusivity,
            time_exclusive_only: encounters.iter().any(|active| active.time_exclusive_only),
            better_spot_elsewhere,
            uncaught_line_count: self.resolver.uncaught_line_count(species.id, self.status),
            notes: evolution_notes(species.id, self.data, self.resolver, self.status, venues),
            strategy,
        }
    }

    fn aggregate(&self, key: LocationKey, group: &Group<'_>, query: &SpotQuery) -> Option<LocationSpot> {
        let listed: Vec<&(&Species, Vec<ActiveEncounter<'_>>)> = group
            .members
            .iter()
            .filter(|(species, _)| !self.status.is_caught(species.id))
            .collect();
        if listed.is_empty() {
            return None;
        }

        let mut by_rarity: BTreeMap<Rarity, BTreeSet<u32>> = BTreeMap::new();
        let mut by_method: BTreeMap<usize, (String, BTreeSet<u32>)> = BTreeMap::new();
        let mut line_keys = HashSet::new();
        let mut line_members = BTreeSet::new();
        let mut catchable = BTreeSet::new();

        for (species, encounters) in &listed {
            if !self.status.is_open(species.id) {
                continue;
            }
            catchable.insert(species.id);
            for active in encounters {
                let encounter = active.encounter;
                by_rarity
                    .entry(encounter.rarity)
                    .or_default()
                    .insert(species.id);
                if let Some(method) = &encounter.method
                    && let Some(order) = method.order()
                {
                    by_method
                        .entry(order)
                        .or_insert_with(|| (method.label().to_string(), BTreeSet::new()))
                        .1
                        .insert(species.id);
                }
            }
            if line_keys.insert(self.resolver.line_key(species.id)) {
                line_members.extend(
                    self.resolver
                        .resolve_line_ids(species.id)
                        .into_iter()
                        .filter(|member| self.status.is_open(*member)),
                );
            }
        }

        let mut species: Vec<SpotSpecies> = listed
            .iter()
            .map(|(species, encounters)| self.describe(species, encounters))
            .collect();
        let first_method = |entry: &SpotSpecies| {
            group
                .members
                .iter()
                .find(|(known, _)| known.id == entry.id)
                .and_then(|(_, encounters)| encounters.first())
                .and_then(|active| active.encounter.method.as_ref())
                .and_then(|method| method.order())
                .unwrap_or(usize::MAX)
        };
        species.sort_by_key(|entry| {
            (
                first_method(entry),
                self.data.dex_sort_index(entry.id, query.dex_region),
            )
        });

        let (uncaught_by_rarity, uncaught_by_method) = if query.hide_tallies {
            (BTreeMap::new(), Vec::new())
        } else {
            (
                by_rarity
                    .into_iter()
                    .map(|(rarity, ids)| (rarity, ids.len()))
                    .collect(),
                by_method
                    .into_values()
                    .map(|(method, ids)| MethodTally {
                        method,
                        count: ids.len(),
                    })
                    .collect(),
            )
        };

        Some(LocationSpot {
            key,
            has_time_exclusive: species.iter().any(|entry| entry.time_exclusive_only),
            species,
            distinct_uncaught_lines: line_keys.len(),
            catchable_count: catchable.len(),
            total_uncaught_dex_entries: line_members.len(),
            uncaught_by_rarity,
            uncaught_by_method,
        })
    }

    /// Every location with something left to catch right now, ranked.
    #[must_use]
    pub fn find(&self, availability: Availability, query: &SpotQuery) -> Vec<LocationSpot> {
        let mut spots: Vec<LocationSpot> = self
            .group(availability)
            .into_iter()
            .filter(|(key, group)| self.matches_filters(key, group, query))
            .filter_map(|(key, group)| self.aggregate(key, &group, query))
            .collect();
        spots.sort_by(|a, b| rank(a, b, query));
        log::debug!(
            "ranked {} locations at {:?}/{:?}",
            spots.len(),
            availability.season,
            availability.period
        );
        spots
    }
}
