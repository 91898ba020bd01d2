//! Per-species advisories derived from encounter rarities across a line.

use serde::Serialize;
use std::fmt;

use crate::collection::CollectionStatus;
use crate::config::PreserveVenues;
use crate::data::{Encounter, Rarity, ReferenceData, Species};
use crate::evolution::EvolutionResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteKind {
    Uncatchable,
    LureOnly,
    SpecialOnly,
    PreserveOnly,
}

/// An advisory naming the line members it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvolutionNote {
    pub kind: NoteKind,
    pub names: Vec<String>,
}

impl fmt::Display for EvolutionNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names.join(", ");
        match self.kind {
            NoteKind::Uncatchable => {
                write!(f, "Consider keeping, {names} cannot be caught in the wild.")
            }
            NoteKind::LureOnly => write!(
                f,
                "Note: {names} is Lure-only. Consider keeping for evolving/breeding."
            ),
            NoteKind::SpecialOnly => write!(
                f,
                "Note: {names} is Special-only. Consider keeping for evolving/breeding."
            ),
            NoteKind::PreserveOnly => write!(f, "Note: {names} is preserve-only."),
        }
    }
}

fn is_lure_only(locations: &[Encounter]) -> bool {
    let all_lure = locations.iter().all(|loc| loc.rarity == Rarity::Lure);
    let lure_or_special = locations
        .iter()
        .all(|loc| matches!(loc.rarity, Rarity::Lure | Rarity::Special));
    let has_lure = locations.iter().any(|loc| loc.rarity == Rarity::Lure);
    let has_special = locations.iter().any(|loc| loc.rarity == Rarity::Special);
    all_lure || (lure_or_special && has_lure && has_special)
}

fn is_special_only(locations: &[Encounter]) -> bool {
    locations.iter().all(|loc| loc.rarity == Rarity::Special)
}

/// Every encounter of the species lies inside a preserve venue.
#[must_use]
pub fn is_preserve_exclusive(species: &Species, venues: &PreserveVenues) -> bool {
    !species.locations.is_empty()
        && species
            .locations
            .iter()
            .all(|loc| venues.contains(&loc.location))
}

/// Advisories for the uncaught members of `species_id`'s line.
#[must_use]
pub fn evolution_notes(
    species_id: u32,
    data: &ReferenceData,
    resolver: &EvolutionResolver,
    status: &CollectionStatus,
    venues: &PreserveVenues,
) -> Vec<EvolutionNote> {
    if data.species_by_id(species_id).is_none() {
        return Vec::new();
    }
    let line: Vec<&Species> = resolver
        .resolve_line_ids(species_id)
        .into_iter()
        .filter_map(|id| data.species_by_id(id))
        .collect();

    let mut uncatchable = Vec::new();
    let mut lure_only = Vec::new();
    let mut special_only = Vec::new();
    let mut preserve_only = Vec::new();

    for member in &line {
        if status.is_caught(member.id) {
            continue;
        }
        let is_self = member.id == species_id;
        if !member.has_catchable_encounter() {
            uncatchable.push(member.name.clone());
        } else if is_lure_only(&member.locations) && !is_self {
            lure_only.push(member.name.clone());
        } else if is_special_only(&member.locations) && !is_self {
            special_only.push(member.name.clone());
        }

        if !is_self && is_preserve_exclusive(member, venues) {
            let reachable_elsewhere = line.iter().any(|other| {
                other.id != member.id
                    && other.has_catchable_encounter()
                    && !is_preserve_exclusive(other, venues)
            });
            if reachable_elsewhere {
                preserve_only.push(member.name.clone());
            }
        }
    }

    [
        (NoteKind::Uncatchable, uncatchable),
        (NoteKind::LureOnly, lure_only),
        (NoteKind::SpecialOnly, special_only),
        (NoteKind::PreserveOnly, preserve_only),
    ]
    .into_iter()
    .filter(|(_, names)| !names.is_empty())
    .map(|(kind, names)| EvolutionNote { kind, names })
    .collect()
}

/// For a species seen as Lure or Very Rare, whether a strictly better
/// encounter exists outside preserve venues.
#[must_use]
pub fn better_spot_exists(species: &Species, current: Rarity, venues: &PreserveVenues) -> bool {
    let mut elsewhere = species
        .locations
        .iter()
        .filter(|loc| !venues.contains(&loc.location));
    match current {
        Rarity::Lure => elsewhere.any(|loc| {
            loc.rarity.is_catchable() && !matches!(loc.rarity, Rarity::Special | Rarity::Lure)
        }),
        Rarity::VeryRare => elsewhere.any(|loc| {
            loc.rarity.is_catchable()
                && !matches!(loc.rarity, Rarity::Special | Rarity::Lure | Rarity::VeryRare)
        }),
        _ => false,
    }
}

/// Most common tier among the encounters; `Special` when every one is.
#[must_use]
pub fn best_rarity<'a, I>(encounters: I) -> Option<Rarity>
where
    I: IntoIterator<Item = &'a Encounter>,
{
    let rarities: Vec<Rarity> = encounters.into_iter().map(|loc| loc.rarity).collect();
    if rarities.is_empty() {
        return None;
    }
    if rarities.iter().all(|&rarity| rarity == Rarity::Special) {
        return Some(Rarity::Special);
    }
    rarities
        .into_iter()
        .filter(|rarity| rarity.is_catchable())
        .min()
}

/// Every encounter of the species and of every line member is Special.
#[must_use]
pub fn is_pheno_exclusive(
    species: &Species,
    data: &ReferenceData,
    resolver: &EvolutionResolver,
) -> bool {
    let special_only =
        |member: &Species| !member.locations.is_empty() && is_special_only(&member.locations);
    special_only(species)
        && resolver
            .resolve_line_ids(species.id)
            .into_iter()
            .filter_map(|id| data.species_by_id(id))
            .all(special_only)
}
