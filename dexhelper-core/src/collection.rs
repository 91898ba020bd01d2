//! Per-profile collection status: which species are caught, when, and which
//! were skipped in favour of another member of their line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::ReferenceData;
use crate::evolution::EvolutionResolver;
use crate::profiles::ProfileError;

/// Collection state of one species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub id: u32,
    pub name: String,
    pub caught: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Name of the line member this species was skipped for.
    #[serde(default)]
    pub evolution_note: Option<String>,
}

impl CollectionEntry {
    #[must_use]
    pub fn uncaught(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            caught: false,
            timestamp: None,
            evolution_note: None,
        }
    }

    fn catch(&mut self, now: DateTime<Utc>) {
        self.caught = true;
        self.timestamp = Some(now);
        self.evolution_note = None;
    }

    fn release(&mut self) {
        self.caught = false;
        self.timestamp = None;
        self.evolution_note = None;
    }
}

/// Outcome of merging an imported status map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Progress summary for the collection header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionSummary {
    pub caught: usize,
    pub total: usize,
    pub first_catch: Option<String>,
    pub journey_started: Option<DateTime<Utc>>,
    pub journey_days: Option<i64>,
}

/// Status map keyed by national id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionStatus {
    entries: BTreeMap<u32, CollectionEntry>,
}

impl CollectionStatus {
    /// Every known species, uncaught.
    #[must_use]
    pub fn new(data: &ReferenceData) -> Self {
        let mut status = Self::default();
        status.reconcile(data);
        status
    }

    /// Parse a persisted status map.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a valid status map.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProfileError> {
        serde_json::from_value(value).map_err(ProfileError::Malformed)
    }

    /// Serialize for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> Result<serde_json::Value, ProfileError> {
        serde_json::to_value(self).map_err(ProfileError::Malformed)
    }

    /// Align the map with the species list: add missing species as uncaught,
    /// refresh renamed entries, and drop ids that no longer exist. Returns
    /// whether anything changed.
    pub fn reconcile(&mut self, data: &ReferenceData) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|id, _| data.species_by_id(*id).is_some());
        let mut changed = self.entries.len() != before;

        for species in data.species() {
            match self.entries.get_mut(&species.id) {
                Some(entry) => {
                    if entry.name != species.name || entry.id != species.id {
                        entry.id = species.id;
                        entry.name.clone_from(&species.name);
                        changed = true;
                    }
                    if !entry.caught && entry.timestamp.is_some() {
                        entry.timestamp = None;
                        changed = true;
                    }
                }
                None => {
                    self.entries
                        .insert(species.id, CollectionEntry::uncaught(species.id, &species.name));
                    changed = true;
                }
            }
        }
        if changed {
            log::debug!("collection status reconciled ({} entries)", self.entries.len());
        }
        changed
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&CollectionEntry> {
        self.entries.get(&id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CollectionEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_caught(&self, id: u32) -> bool {
        self.entries.get(&id).is_some_and(|entry| entry.caught)
    }

    #[must_use]
    pub fn is_noted(&self, id: u32) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|entry| entry.evolution_note.is_some())
    }

    /// Neither caught nor noted: still counts toward collection targets.
    #[must_use]
    pub fn is_open(&self, id: u32) -> bool {
        self.entries
            .get(&id)
            .is_some_and(|entry| !entry.caught && entry.evolution_note.is_none())
    }

    fn entry_mut(&mut self, id: u32) -> Result<&mut CollectionEntry, ProfileError> {
        self.entries
            .get_mut(&id)
            .ok_or(ProfileError::UnknownSpecies(id))
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the status map.
    pub fn mark_caught(&mut self, id: u32, now: DateTime<Utc>) -> Result<(), ProfileError> {
        self.entry_mut(id)?.catch(now);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if `id` is not in the status map.
    pub fn mark_uncaught(&mut self, id: u32) -> Result<(), ProfileError> {
        self.entry_mut(id)?.release();
        Ok(())
    }

    /// Flip the caught flag, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the status map.
    pub fn toggle(&mut self, id: u32, now: DateTime<Utc>) -> Result<bool, ProfileError> {
        let entry = self.entry_mut(id)?;
        if entry.caught {
            entry.release();
        } else {
            entry.catch(now);
        }
        Ok(entry.caught)
    }

    /// Mark every uncaught member of the line caught with one timestamp.
    /// Returns the names that changed.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the status map.
    pub fn catch_line(
        &mut self,
        id: u32,
        resolver: &EvolutionResolver,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ProfileError> {
        self.entry_mut(id)?;
        let mut caught = Vec::new();
        for member in resolver.resolve_line_ids(id) {
            if let Some(entry) = self.entries.get_mut(&member)
                && !entry.caught
            {
                entry.catch(now);
                caught.push(entry.name.clone());
            }
        }
        Ok(caught)
    }

    /// Mark `id` caught and note every other uncaught line member as skipped
    /// for it. Returns the noted names.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not in the status map.
    pub fn note_line(
        &mut self,
        id: u32,
        resolver: &EvolutionResolver,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ProfileError> {
        let keeper = {
            let entry = self.entry_mut(id)?;
            entry.catch(now);
            entry.name.clone()
        };
        let mut noted = Vec::new();
        for member in resolver.resolve_line_ids(id) {
            if member == id {
                continue;
            }
            if let Some(entry) = self.entries.get_mut(&member)
                && !entry.caught
            {
                entry.evolution_note = Some(keeper.clone());
                noted.push(entry.name.clone());
            }
        }
        Ok(noted)
    }

    /// Every entry back to uncaught.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.release();
        }
    }

    /// Merge an imported map keyed by id strings. Entries for unknown species
    /// are skipped; a key that disagrees with its entry's id is reported and
    /// the entry's own id wins.
    pub fn import(&mut self, imported: BTreeMap<String, CollectionEntry>) -> ImportReport {
        let mut report = ImportReport::default();
        for (key, mut incoming) in imported {
            if key.trim().parse::<u32>().ok() != Some(incoming.id) {
                log::warn!(
                    "import key {key:?} does not match entry id {}",
                    incoming.id
                );
            }
            let Some(existing) = self.entries.get_mut(&incoming.id) else {
                log::warn!("skipping import of unknown species id {}", incoming.id);
                report.skipped += 1;
                continue;
            };
            if !incoming.caught {
                incoming.timestamp = None;
            }
            incoming.name.clone_from(&existing.name);
            *existing = incoming;
            report.applied += 1;
        }
        report
    }

    /// Merge newly caught species (e.g. scraped from a game log). Already
    /// caught entries only move to a later timestamp. Returns the number of
    /// entries updated.
    pub fn apply_catches(
        &mut self,
        data: &ReferenceData,
        catches: &[(String, DateTime<Utc>)],
    ) -> usize {
        let mut updated = 0;
        for (name, when) in catches {
            let Some(species) = data.species_by_name(name) else {
                log::warn!("ignoring catch of unknown species {name:?}");
                continue;
            };
            let Some(entry) = self.entries.get_mut(&species.id) else {
                continue;
            };
            if !entry.caught {
                entry.catch(*when);
                updated += 1;
            } else if entry.timestamp.is_none_or(|previous| *when > previous) {
                entry.timestamp = Some(*when);
                updated += 1;
            }
        }
        updated
    }

    #[must_use]
    pub fn summary(&self, now: DateTime<Utc>) -> CollectionSummary {
        let caught = self.entries.values().filter(|entry| entry.caught).count();
        let first = self
            .entries
            .values()
            .filter(|entry| entry.caught)
            .filter_map(|entry| entry.timestamp.map(|when| (when, entry)))
            .min_by_key(|(when, entry)| (*when, entry.id));
        CollectionSummary {
            caught,
            total: self.entries.len(),
            first_catch: first.map(|(_, entry)| entry.name.clone()),
            journey_started: first.map(|(when, _)| when),
            journey_days: first.map(|(when, _)| (now - when).num_days()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoWildSourceOverrides;
    use chrono::TimeZone;

    fn fixture() -> ReferenceData {
        let monsters = r#"[
            {"id": 1, "name": "Bulbasaur", "evolutions": [{"id": 2, "name": "Ivysaur", "type": "LEVEL", "val": 16}]},
            {"id": 2, "name": "Ivysaur", "evolutions": [{"id": 3, "name": "Venusaur", "type": "LEVEL", "val": 32}]},
            {"id": 3, "name": "Venusaur"},
            {"id": 4, "name": "Charmander"}
        ]"#;
        ReferenceData::from_json(monsters, "[]", "[]").unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn catch_then_release_restores_blank_entry() {
        let data = fixture();
        let resolver = EvolutionResolver::new(&data, NoWildSourceOverrides::default());
        let mut status = CollectionStatus::new(&data);
        status.note_line(3, &resolver, day(1)).unwrap();
        assert!(status.is_noted(1));

        status.mark_caught(1, day(2)).unwrap();
        status.mark_uncaught(1).unwrap();
        let entry = status.get(1).unwrap();
        assert!(!entry.caught);
        assert_eq!(entry.timestamp, None);
        assert_eq!(entry.evolution_note, None);
        assert!(status.is_open(1));
        assert_eq!(resolver.uncaught_line_count(1, &status), 1);
    }

    #[test]
    fn toggle_flips_and_clears_note() {
        let data = fixture();
        let resolver = EvolutionResolver::new(&data, NoWildSourceOverrides::default());
        let mut status = CollectionStatus::new(&data);
        status.note_line(3, &resolver, day(1)).unwrap();
        assert!(status.toggle(2, day(2)).unwrap());
        assert_eq!(status.get(2).unwrap().evolution_note, None);
        assert!(!status.toggle(2, day(3)).unwrap());
        assert_eq!(status.get(2).unwrap().timestamp, None);
        assert!(status.toggle(40, day(3)).is_err());
    }

    #[test]
    fn note_line_marks_others_with_keeper_name() {
        let data = fixture();
        let resolver = EvolutionResolver::new(&data, NoWildSourceOverrides::default());
        let mut status = CollectionStatus::new(&data);
        let noted = status.note_line(3, &resolver, day(1)).unwrap();
        assert_eq!(noted, vec!["Bulbasaur".to_string(), "Ivysaur".to_string()]);
        assert!(status.is_caught(3));
        assert_eq!(
            status.get(2).unwrap().evolution_note.as_deref(),
            Some("Venusaur")
        );
        assert!(!status.is_open(1));
        assert!(status.is_open(4));
    }

    #[test]
    fn catch_line_shares_timestamp_and_skips_caught() {
        let data = fixture();
        let resolver = EvolutionResolver::new(&data, NoWildSourceOverrides::default());
        let mut status = CollectionStatus::new(&data);
        status.mark_caught(2, day(1)).unwrap();
        let caught = status.catch_line(1, &resolver, day(5)).unwrap();
        assert_eq!(caught, vec!["Bulbasaur".to_string(), "Venusaur".to_string()]);
        assert_eq!(status.get(2).unwrap().timestamp, Some(day(1)));
        assert_eq!(status.get(3).unwrap().timestamp, Some(day(5)));
        assert!(matches!(
            status.catch_line(99, &resolver, day(5)),
            Err(ProfileError::UnknownSpecies(99))
        ));
    }

    #[test]
    fn reconcile_adds_missing_and_drops_unknown() {
        let data = fixture();
        let stored = serde_json::json!({
            "1": {"id": 1, "name": "Bulbasaur", "caught": true, "timestamp": "2025-01-03T00:00:00Z"},
            "77": {"id": 77, "name": "Ponyta", "caught": false}
        });
        let mut status = CollectionStatus::from_value(stored).unwrap();
        assert!(status.reconcile(&data));
        assert_eq!(status.len(), 4);
        assert!(status.get(77).is_none());
        assert!(status.is_caught(1));
        assert_eq!(status.get(1).unwrap().evolution_note, None);
        assert!(!status.reconcile(&data));
    }

    #[test]
    fn apply_catches_only_moves_timestamps_forward() {
        let data = fixture();
        let mut status = CollectionStatus::new(&data);
        status.mark_caught(4, day(10)).unwrap();
        let updated = status.apply_catches(
            &data,
            &[
                ("Charmander".into(), day(3)),
                ("bulbasaur".into(), day(4)),
                ("Missingno".into(), day(4)),
            ],
        );
        assert_eq!(updated, 1);
        assert_eq!(status.get(4).unwrap().timestamp, Some(day(10)));
        assert_eq!(status.apply_catches(&data, &[("Charmander".into(), day(12))]), 1);
        assert_eq!(status.get(4).unwrap().timestamp, Some(day(12)));
    }

    #[test]
    fn import_skips_unknown_ids() {
        let data = fixture();
        let mut status = CollectionStatus::new(&data);
        let mut incoming = BTreeMap::new();
        let mut entry = CollectionEntry::uncaught(3, "Venusaur");
        entry.caught = true;
        entry.timestamp = Some(day(2));
        incoming.insert("3".to_string(), entry);
        incoming.insert("88".to_string(), CollectionEntry::uncaught(88, "Grimer"));
        let report = status.import(incoming);
        assert_eq!(report, ImportReport { applied: 1, skipped: 1 });
        assert!(status.is_caught(3));
    }

    #[test]
    fn summary_reports_journey_start() {
        let data = fixture();
        let mut status = CollectionStatus::new(&data);
        status.mark_caught(4, day(2)).unwrap();
        status.mark_caught(1, day(6)).unwrap();
        let summary = status.summary(day(12));
        assert_eq!(summary.caught, 2);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.first_catch.as_deref(), Some("Charmander"));
        assert_eq!(summary.journey_days, Some(10));

        status.reset();
        assert_eq!(status.summary(day(12)).caught, 0);
    }
}
