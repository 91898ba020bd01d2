//! Species browser: search, filter and sort the whole dex.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::collection::CollectionStatus;
use crate::config::HelperConfig;
use crate::data::{Rarity, ReferenceData, Region, Species};
use crate::evolution::EvolutionResolver;
use crate::locations::QueryError;
use crate::notes::is_pheno_exclusive;

/// Rarity-column filter: a concrete tier or one of the derived groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RarityFilter {
    Tier(Rarity),
    Legends,
    DexRequired,
    PhenoExclusive,
}

impl FromStr for RarityFilter {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let needle = raw.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match needle.as_str() {
            "legends" | "legend" => Ok(Self::Legends),
            "dex required" => Ok(Self::DexRequired),
            "pheno" | "pheno exclusive" => Ok(Self::PhenoExclusive),
            _ => Rarity::from_label(&needle)
                .map(Self::Tier)
                .ok_or_else(|| QueryError::UnknownRarity(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaughtSort {
    #[default]
    None,
    Ascending,
    Descending,
}

/// Every filter the dex browser understands. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DexQuery {
    pub search: Option<String>,
    pub region: Option<Region>,
    pub rarity: Option<RarityFilter>,
    pub method: Option<String>,
    pub caught: Option<bool>,
    pub can_be_caught: Option<bool>,
    pub caught_on: Option<NaiveDate>,
    pub caught_sort: CaughtSort,
}

/// One species as listed by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexRow {
    pub id: u32,
    pub name: String,
    pub regional_index: Option<u32>,
    pub caught: bool,
    pub caught_at: Option<DateTime<Utc>>,
    pub noted_for: Option<String>,
    pub locations: usize,
}

impl DexRow {
    #[must_use]
    pub fn new(species: &Species, ctx: &DexContext<'_>, region: Option<Region>) -> Self {
        let entry = ctx.status.get(species.id);
        Self {
            id: species.id,
            name: species.name.clone(),
            regional_index: region.and_then(|region| ctx.data.regional_index(species.id, region)),
            caught: entry.is_some_and(|entry| entry.caught),
            caught_at: entry.and_then(|entry| entry.timestamp),
            noted_for: entry.and_then(|entry| entry.evolution_note.clone()),
            locations: species.locations.len(),
        }
    }
}

fn number_matches(term: &str, number: u32) -> bool {
    number.to_string() == term || format!("{number:03}") == term
}

/// Everything the filters need to look at besides the species itself.
pub struct DexContext<'a> {
    pub data: &'a ReferenceData,
    pub resolver: &'a EvolutionResolver,
    pub status: &'a CollectionStatus,
    pub config: &'a HelperConfig,
}

impl DexContext<'_> {
    fn is_legend(&self, species: &Species) -> bool {
        self.resolver.is_no_wild_source(species)
            || self.config.legend_and_required.contains(&species.id)
    }

    fn is_dex_required(&self, species: &Species) -> bool {
        !self.resolver.is_no_wild_source(species)
            || self.config.legend_and_required.contains(&species.id)
    }
}

impl DexQuery {
    fn matches_search(&self, species: &Species, ctx: &DexContext<'_>) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        if term.chars().all(|c| c.is_ascii_digit()) {
            return match self.region {
                Some(region) => ctx
                    .data
                    .regional_index(species.id, region)
                    .is_some_and(|index| number_matches(term, index)),
                None => number_matches(term, species.id),
            };
        }
        species.name.to_lowercase().contains(&term.to_lowercase())
    }

    fn matches_rarity(&self, species: &Species, ctx: &DexContext<'_>) -> bool {
        match self.rarity {
            None => true,
            Some(RarityFilter::Legends) => ctx.is_legend(species),
            Some(RarityFilter::DexRequired) => ctx.is_dex_required(species),
            Some(RarityFilter::PhenoExclusive) => {
                is_pheno_exclusive(species, ctx.data, ctx.resolver)
            }
            Some(RarityFilter::Tier(tier)) => {
                species.locations.iter().any(|loc| loc.rarity == tier)
            }
        }
    }

    fn matches(&self, species: &Species, ctx: &DexContext<'_>) -> bool {
        if !self.matches_search(species, ctx) || !self.matches_rarity(species, ctx) {
            return false;
        }
        if let Some(region) = self.region
            && ctx.data.regional_index(species.id, region).is_none()
        {
            return false;
        }
        if let Some(method) = &self.method {
            let found = species.locations.iter().any(|loc| {
                loc.method
                    .as_ref()
                    .is_some_and(|own| own.label().eq_ignore_ascii_case(method.trim()))
            });
            if !found {
                return false;
            }
        }
        if self
            .caught
            .is_some_and(|wanted| ctx.status.is_caught(species.id) != wanted)
        {
            return false;
        }
        if self
            .can_be_caught
            .is_some_and(|wanted| species.locations.is_empty() == wanted)
        {
            return false;
        }
        if let Some(day) = self.caught_on {
            let caught_that_day = ctx
                .status
                .get(species.id)
                .and_then(|entry| entry.timestamp)
                .is_some_and(|at| at.date_naive() == day);
            if !caught_that_day {
                return false;
            }
        }
        true
    }

    fn order(&self, a: &Species, b: &Species, ctx: &DexContext<'_>) -> Ordering {
        let caught_at = |species: &Species| {
            ctx.status
                .get(species.id)
                .filter(|entry| entry.caught)
                .and_then(|entry| entry.timestamp)
        };
        let by_date = match (self.caught_sort, caught_at(a), caught_at(b)) {
            (CaughtSort::None, _, _) | (_, None, None) => Ordering::Equal,
            (_, Some(_), None) => Ordering::Less,
            (_, None, Some(_)) => Ordering::Greater,
            (CaughtSort::Ascending, Some(left), Some(right)) => left.cmp(&right),
            (CaughtSort::Descending, Some(left), Some(right)) => right.cmp(&left),
        };
        by_date.then_with(|| {
            ctx.data
                .dex_sort_index(a.id, self.region)
                .cmp(&ctx.data.dex_sort_index(b.id, self.region))
                .then(a.id.cmp(&b.id))
        })
    }

    /// Matching species in display order.
    #[must_use]
    pub fn run<'a>(&self, ctx: &DexContext<'a>) -> Vec<&'a Species> {
        let mut found: Vec<&'a Species> = ctx
            .data
            .species()
            .iter()
            .filter(|species| self.matches(species, ctx))
            .collect();
        found.sort_by(|a, b| self.order(a, b, ctx));
        found
    }

    /// Matching species as owned rows.
    #[must_use]
    pub fn rows(&self, ctx: &DexContext<'_>) -> Vec<DexRow> {
        self.run(ctx)
            .into_iter()
            .map(|species| DexRow::new(species, ctx, self.region))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoWildSourceOverrides;
    use chrono::{TimeZone, Utc};

    const MONSTERS: &str = r#"[
        {"id": 1, "name": "Bulbasaur", "types": ["GRASS"],
         "locations": [{"region_name": "Kanto", "location": "Viridian Forest", "rarity": "Rare", "type": "Grass"}],
         "evolutions": [{"id": 2, "name": "Ivysaur", "type": "LEVEL", "val": 16}]},
        {"id": 2, "name": "Ivysaur", "types": ["GRASS"]},
        {"id": 129, "name": "Magikarp", "types": ["WATER"],
         "locations": [{"region_name": "Kanto", "location": "Pallet Town", "rarity": "Very Common", "type": "Old Rod"}]},
        {"id": 150, "name": "Mewtwo", "types": ["PSYCHIC"],
         "locations": [{"region_name": "Kanto", "location": "Cerulean Cave", "rarity": "Unobtainable", "type": "Cave"}]},
        {"id": 201, "name": "Unown", "types": ["PSYCHIC"],
         "locations": [{"region_name": "Johto", "location": "Ruins", "rarity": "Special", "type": "Cave"}]},
        {"id": 644, "name": "Zekrom", "types": ["DRAGON"]}
    ]"#;
    const DEX: &str = r#"[{"id": 1, "kanto": 1}, {"id": 2, "kanto": 2}, {"id": 129, "kanto": 129, "johto": 76},
                          {"id": 150, "kanto": 150}, {"id": 201, "johto": 64}, {"id": 644, "unova": 149}]"#;

    fn ids(found: &[&Species]) -> Vec<u32> {
        found.iter().map(|species| species.id).collect()
    }

    fn with_ctx(status: &CollectionStatus, check: impl FnOnce(&DexContext<'_>)) {
        let data = ReferenceData::from_json(MONSTERS, DEX, "[]").unwrap();
        let resolver = EvolutionResolver::new(&data, NoWildSourceOverrides::default());
        let config = HelperConfig::default_config();
        let status = if status.is_empty() {
            CollectionStatus::new(&data)
        } else {
            status.clone()
        };
        check(&DexContext {
            data: &data,
            resolver: &resolver,
            status: &status,
            config: &config,
        });
    }

    #[test]
    fn search_matches_names_and_padded_numbers() {
        with_ctx(&CollectionStatus::default(), |ctx| {
            let by_name = DexQuery {
                search: Some("saur".into()),
                ..DexQuery::default()
            };
            assert_eq!(ids(&by_name.run(ctx)), vec![1, 2]);

            let padded = DexQuery {
                search: Some("001".into()),
                ..DexQuery::default()
            };
            assert_eq!(ids(&padded.run(ctx)), vec![1]);

            let regional = DexQuery {
                search: Some("76".into()),
                region: Some(Region::Johto),
                ..DexQuery::default()
            };
            assert_eq!(ids(&regional.run(ctx)), vec![129]);
        });
    }

    #[test]
    fn numeric_search_with_region_ignores_national_ids() {
        with_ctx(&CollectionStatus::default(), |ctx| {
            let national = DexQuery {
                search: Some("129".into()),
                ..DexQuery::default()
            };
            assert_eq!(ids(&national.run(ctx)), vec![129]);

            let johto = DexQuery {
                search: Some("129".into()),
                region: Some(Region::Johto),
                ..DexQuery::default()
            };
            assert!(johto.run(ctx).is_empty());

            let unown = DexQuery {
                search: Some("64".into()),
                region: Some(Region::Johto),
                ..DexQuery::default()
            };
            assert_eq!(ids(&unown.run(ctx)), vec![201]);
        });
    }

    #[test]
    fn region_filter_sorts_by_regional_index() {
        with_ctx(&CollectionStatus::default(), |ctx| {
            let johto = DexQuery {
                region: Some(Region::Johto),
                ..DexQuery::default()
            };
            assert_eq!(ids(&johto.run(ctx)), vec![201, 129]);
            let rows = johto.rows(ctx);
            assert_eq!(rows[1].regional_index, Some(76));
            assert!(!rows[1].caught);
        });
    }

    #[test]
    fn derived_rarity_groups() {
        with_ctx(&CollectionStatus::default(), |ctx| {
            let legends = DexQuery {
                rarity: Some(RarityFilter::Legends),
                ..DexQuery::default()
            };
            assert_eq!(ids(&legends.run(ctx)), vec![150, 644]);

            let required = DexQuery {
                rarity: Some("dex-required".parse().unwrap()),
                ..DexQuery::default()
            };
            assert_eq!(ids(&required.run(ctx)), vec![1, 2, 129, 201, 644]);

            let pheno = DexQuery {
                rarity: Some(RarityFilter::PhenoExclusive),
                ..DexQuery::default()
            };
            assert_eq!(ids(&pheno.run(ctx)), vec![201]);

            let very_common = DexQuery {
                rarity: Some("Very Common".parse().unwrap()),
                method: Some("old rod".into()),
                ..DexQuery::default()
            };
            assert_eq!(ids(&very_common.run(ctx)), vec![129]);
            assert!("sometimes".parse::<RarityFilter>().is_err());
        });
    }

    #[test]
    fn caught_filters_and_date_sort() {
        let data = ReferenceData::from_json(MONSTERS, DEX, "[]").unwrap();
        let mut status = CollectionStatus::new(&data);
        let early = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap();
        status.mark_caught(129, early).unwrap();
        status.mark_caught(2, late).unwrap();

        with_ctx(&status, |ctx| {
            let newest_first = DexQuery {
                caught_sort: CaughtSort::Descending,
                ..DexQuery::default()
            };
            assert_eq!(ids(&newest_first.run(ctx))[..3], [2, 129, 1]);

            let caught = DexQuery {
                caught: Some(true),
                caught_sort: CaughtSort::Ascending,
                ..DexQuery::default()
            };
            assert_eq!(ids(&caught.run(ctx)), vec![129, 2]);

            let on_day = DexQuery {
                caught_on: NaiveDate::from_ymd_opt(2024, 3, 10),
                ..DexQuery::default()
            };
            assert_eq!(ids(&on_day.run(ctx)), vec![2]);

            let unreachable = DexQuery {
                can_be_caught: Some(false),
                ..DexQuery::default()
            };
            assert_eq!(ids(&unreachable.run(ctx)), vec![2, 644]);
        });
    }
}
