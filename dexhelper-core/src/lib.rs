//! Dexhelper Core
//!
//! Platform-agnostic collection logic: capture odds, the accelerated encounter
//! clock, evolution lines and catching-spot ranking.
//! This crate performs no I/O; loaders and profile stores are supplied by the
//! caller.

pub mod capture;
pub mod clock;
pub mod collection;
pub mod config;
pub mod constants;
pub mod data;
pub mod dex;
pub mod evolution;
pub mod locations;
pub mod notes;
pub mod numbers;
pub mod profiles;
pub mod strategy;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde_json::Value;

// Re-export commonly used types
pub use capture::{
    CaptureDevice, CaptureError, Condition, DeviceRule, StatusEffect, capture_probability,
};
pub use clock::{
    ActiveEncounter, Availability, ClockReading, GameClock, NextPeriod, Period, PeriodWatcher,
    Season, SeasonTable, active_encounters,
};
pub use collection::{CollectionEntry, CollectionStatus, CollectionSummary, ImportReport};
pub use config::{ConfigError, HelperConfig, NoWildSourceOverrides, PreserveVenues};
pub use data::{
    DataError, Encounter, EncounterMethod, Evolution, EvolutionTrigger, Rarity, ReferenceData,
    Region, Species,
};
pub use dex::{CaughtSort, DexContext, DexQuery, DexRow, RarityFilter};
pub use evolution::{EvolutionResolver, LineMember};
pub use locations::{
    LocationKey, LocationSpot, QueryError, SpotFinder, SpotOptions, SpotQuery, SpotSort,
};
pub use notes::EvolutionNote;
pub use profiles::{MemoryProfileStore, ProfileBook, ProfileError};
pub use strategy::{SpeciesStrategy, StrategyOption, StrategySelector, TurnEstimate};

use constants::STATUS_KEY;

/// Trait for abstracting reference-data loading
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the species, dex and catch-rate documents
    ///
    /// # Errors
    ///
    /// Returns an error if any document is missing or malformed.
    fn load_reference_data(&self) -> Result<ReferenceData, Self::Error>;

    /// Load the tuning configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or fails validation.
    fn load_config(&self) -> Result<HelperConfig, Self::Error>;
}

/// Key/value persistence scoped to the active profile
pub trait ProfileStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: Value) -> Result<(), Self::Error>;
}

/// Loaded reference data plus the profile store it reads status from.
pub struct DexEngine<L, S>
where
    L: DataLoader,
    S: ProfileStore,
{
    loader: L,
    store: S,
    data: ReferenceData,
    config: HelperConfig,
    resolver: EvolutionResolver,
    clock: GameClock,
}

impl<L, S> DexEngine<L, S>
where
    L: DataLoader,
    S: ProfileStore,
{
    /// Load reference data and configuration through `loader`.
    ///
    /// # Errors
    ///
    /// Returns an error if either document cannot be loaded.
    pub fn new(loader: L, store: S) -> anyhow::Result<Self> {
        let data = loader
            .load_reference_data()
            .context("failed to load reference data")?;
        let config = loader.load_config().context("failed to load configuration")?;
        let resolver = EvolutionResolver::new(&data, config.no_wild_source.clone());
        let clock = GameClock::new(config.seasons.clone());
        Ok(Self {
            loader,
            store,
            data,
            config,
            resolver,
            clock,
        })
    }

    /// Re-read reference data and rebuild every derived index.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails; the previous data stays in place.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let data = self
            .loader
            .load_reference_data()
            .context("failed to reload reference data")?;
        let config = self
            .loader
            .load_config()
            .context("failed to reload configuration")?;
        self.resolver = EvolutionResolver::new(&data, config.no_wild_source.clone());
        self.clock = GameClock::new(config.seasons.clone());
        self.data = data;
        self.config = config;
        Ok(())
    }

    #[must_use]
    pub const fn data(&self) -> &ReferenceData {
        &self.data
    }

    #[must_use]
    pub const fn config(&self) -> &HelperConfig {
        &self.config
    }

    #[must_use]
    pub const fn resolver(&self) -> &EvolutionResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a species by national number or name.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing matches.
    pub fn find_species(&self, query: &str) -> anyhow::Result<&Species> {
        self.data
            .find(query)
            .ok_or_else(|| anyhow!("unknown species {query:?}"))
    }

    /// Collection status of the active profile, reconciled against the
    /// species list. A reconciled map is written back.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds a malformed map.
    pub fn load_status(&self) -> anyhow::Result<CollectionStatus> {
        let stored = self
            .store
            .get(STATUS_KEY)
            .context("failed to read collection status")?;
        let mut status = match stored {
            Some(value) => CollectionStatus::from_value(value)?,
            None => CollectionStatus::default(),
        };
        if status.reconcile(&self.data) {
            self.save_status(&status)?;
        }
        Ok(status)
    }

    /// # Errors
    ///
    /// Returns an error if the status cannot be serialized or stored.
    pub fn save_status(&self, status: &CollectionStatus) -> anyhow::Result<()> {
        self.store
            .set(STATUS_KEY, status.to_value()?)
            .context("failed to write collection status")
    }

    /// Load, change and persist the collection status in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if loading, the change itself, or saving fails.
    pub fn update_status<T>(
        &self,
        change: impl FnOnce(&mut CollectionStatus, &EvolutionResolver) -> Result<T, ProfileError>,
    ) -> anyhow::Result<T> {
        let mut status = self.load_status()?;
        let outcome = change(&mut status, &self.resolver)?;
        self.save_status(&status)?;
        Ok(outcome)
    }

    #[must_use]
    pub fn clock_reading(&self, now: DateTime<Utc>) -> ClockReading {
        self.clock.sample(now)
    }

    /// Ranked catching spots for the current game time.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection status cannot be loaded.
    pub fn best_spots(
        &self,
        now: DateTime<Utc>,
        query: &SpotQuery,
    ) -> anyhow::Result<Vec<LocationSpot>> {
        let status = self.load_status()?;
        let availability = self.clock.sample(now).availability();
        let finder = SpotFinder::new(&self.data, &self.resolver, &status, &self.config);
        Ok(finder.find(availability, query))
    }

    /// Strategy rankings for each currently live encounter of a species.
    ///
    /// # Errors
    ///
    /// Returns an error if the species is unknown.
    pub fn strategies_for(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Vec<SpeciesStrategy>> {
        let species = self.find_species(query)?;
        let availability = self.clock.sample(now).availability();
        let selector = StrategySelector::new(&self.config, &self.data);
        Ok(
            active_encounters(species, availability, &self.config.preserve_venues)
                .into_iter()
                .filter(|active| active.encounter.rarity.is_catchable())
                .filter_map(|active| selector.for_encounter(species, active.encounter))
                .collect(),
        )
    }

    /// Staged evolution line of a species.
    ///
    /// # Errors
    ///
    /// Returns an error if the species is unknown.
    pub fn line(&self, query: &str) -> anyhow::Result<Vec<LineMember>> {
        let species = self.find_species(query)?;
        Ok(self.resolver.resolve_line_details(species.id))
    }

    /// # Errors
    ///
    /// Returns an error if the collection status cannot be loaded.
    pub fn dex(&self, query: &DexQuery) -> anyhow::Result<Vec<DexRow>> {
        let status = self.load_status()?;
        let ctx = DexContext {
            data: &self.data,
            resolver: &self.resolver,
            status: &status,
            config: &self.config,
        };
        Ok(query.rows(&ctx))
    }

    /// Evolution advisories for a species against the active profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the species is unknown or status cannot be loaded.
    pub fn notes_for(&self, query: &str) -> anyhow::Result<Vec<EvolutionNote>> {
        let species = self.find_species(query)?;
        let status = self.load_status()?;
        Ok(notes::evolution_notes(
            species.id,
            &self.data,
            &self.resolver,
            &status,
            &self.config.preserve_venues,
        ))
    }
}
