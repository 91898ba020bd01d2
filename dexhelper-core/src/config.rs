//! Tunable constants for capture math, strategy ranking, and the clock.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{CaptureDevice, DeviceRule, StatusEffect};
use crate::clock::SeasonTable;

/// Errors raised when helper configuration invariants are violated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("at least one capture device must be configured")]
    NoDevices,
    #[error("capture device {0:?} is defined more than once")]
    DuplicateDevice(String),
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: String,
        min: f64,
        value: f64,
    },
    #[error("level table for {device:?} must rise in level and fall in modifier")]
    LevelTableNotMonotone { device: String },
    #[error("month {month} is assigned to {count} seasons (expected exactly one)")]
    SeasonCoverage { month: u32, count: usize },
    #[error("effect status {0:?} is not a configured status")]
    UnknownEffectStatus(String),
    #[error("strategy.top_k must be greater than zero")]
    ZeroTopK,
}

/// Location-name fragments that mark a capture-preserve venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreserveVenues(Vec<String>);

impl PreserveVenues {
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            fragments
                .into_iter()
                .map(|fragment| fragment.into().to_lowercase())
                .collect(),
        )
    }

    /// Whether a location label names a preserve venue.
    #[must_use]
    pub fn contains(&self, location: &str) -> bool {
        let lowered = location.to_lowercase();
        self.0
            .iter()
            .any(|fragment| lowered.contains(&fragment.to_lowercase()))
    }
}

impl Default for PreserveVenues {
    fn default() -> Self {
        Self::new(["safari zone", "great marsh"])
    }
}

/// Strategy ranking knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "StrategyConfig::default_top_k")]
    pub top_k: usize,
    /// Status applied for the "+ effect" strategy variants.
    #[serde(default = "StrategyConfig::default_effect_status")]
    pub effect_status: String,
}

impl StrategyConfig {
    const fn default_top_k() -> usize {
        8
    }

    fn default_effect_status() -> String {
        "Sleep".to_string()
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            top_k: Self::default_top_k(),
            effect_status: Self::default_effect_status(),
        }
    }
}

/// Curated exceptions to the no-wild-source heuristic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoWildSourceOverrides {
    /// Always classified as having no wild source.
    #[serde(default)]
    pub always: Vec<u32>,
    /// Never classified as having no wild source.
    #[serde(default)]
    pub never: Vec<u32>,
}

/// Complete helper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperConfig {
    pub devices: Vec<CaptureDevice>,
    pub statuses: Vec<StatusEffect>,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub seasons: SeasonTable,
    #[serde(default)]
    pub preserve_venues: PreserveVenues,
    #[serde(default)]
    pub no_wild_source: NoWildSourceOverrides,
    /// Legendary species that still count toward dex completion.
    #[serde(default)]
    pub legend_and_required: Vec<u32>,
}

impl HelperConfig {
    /// Load helper configuration from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or if validation fails.
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every configuration invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_devices()?;
        self.validate_statuses()?;
        self.validate_seasons()?;
        if self.strategy.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        Ok(())
    }

    fn validate_devices(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }
        for (index, device) in self.devices.iter().enumerate() {
            if self.devices[..index]
                .iter()
                .any(|earlier| earlier.name.eq_ignore_ascii_case(&device.name))
            {
                return Err(ConfigError::DuplicateDevice(device.name.clone()));
            }
            if device.price < 0.0 {
                return Err(ConfigError::MinViolation {
                    field: format!("devices.{}.price", device.name),
                    min: 0.0,
                    value: device.price,
                });
            }
            if device.modifier <= 0.0 {
                return Err(ConfigError::MinViolation {
                    field: format!("devices.{}.modifier", device.name),
                    min: f64::EPSILON,
                    value: device.modifier,
                });
            }
            if let DeviceRule::LevelScaled { steps, floor } = &device.rule {
                let rising = steps.windows(2).all(|pair| {
                    pair[0].up_to < pair[1].up_to && pair[0].modifier >= pair[1].modifier
                });
                let above_floor = steps.iter().all(|step| step.modifier >= *floor);
                if !rising || !above_floor || *floor <= 0.0 {
                    return Err(ConfigError::LevelTableNotMonotone {
                        device: device.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_statuses(&self) -> Result<(), ConfigError> {
        for status in &self.statuses {
            if status.multiplier <= 0.0 {
                return Err(ConfigError::MinViolation {
                    field: format!("statuses.{}.multiplier", status.label()),
                    min: f64::EPSILON,
                    value: status.multiplier,
                });
            }
        }
        if self.effect_status().is_none() {
            return Err(ConfigError::UnknownEffectStatus(
                self.strategy.effect_status.clone(),
            ));
        }
        Ok(())
    }

    fn validate_seasons(&self) -> Result<(), ConfigError> {
        let table = &self.seasons;
        for month in 1..=12 {
            let count = [&table.spring, &table.summer, &table.autumn, &table.winter]
                .iter()
                .filter(|months| months.contains(&month))
                .count();
            if count != 1 {
                return Err(ConfigError::SeasonCoverage { month, count });
            }
        }
        Ok(())
    }

    /// Look up a device by name, ignoring case.
    #[must_use]
    pub fn device(&self, name: &str) -> Option<&CaptureDevice> {
        self.devices
            .iter()
            .find(|device| device.name.eq_ignore_ascii_case(name))
    }

    /// Look up a status; `None` selects the neutral "no status" entry.
    #[must_use]
    pub fn status(&self, name: Option<&str>) -> Option<&StatusEffect> {
        self.statuses.iter().find(|status| match (&status.name, name) {
            (None, None) => true,
            (Some(own), Some(wanted)) => own.eq_ignore_ascii_case(wanted),
            _ => false,
        })
    }

    /// The status used for "+ effect" strategy variants.
    #[must_use]
    pub fn effect_status(&self) -> Option<&StatusEffect> {
        self.status(Some(&self.strategy.effect_status))
    }

    /// Embedded default configuration.
    #[must_use]
    pub fn default_config() -> Self {
        Self::from_json(include_str!("../../data/config.json")).unwrap_or_else(|err| {
            log::warn!("embedded config rejected ({err}); using minimal fallback");
            Self::fallback()
        })
    }

    fn fallback() -> Self {
        Self {
            devices: vec![CaptureDevice::standard("Poke Ball", 200.0, 1.0)],
            statuses: vec![
                StatusEffect::none(),
                StatusEffect::named("Sleep", 2.0),
            ],
            strategy: StrategyConfig::default(),
            seasons: SeasonTable::default(),
            preserve_venues: PreserveVenues::default(),
            no_wild_source: NoWildSourceOverrides::default(),
            legend_and_required: Vec::new(),
        }
    }
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_is_valid() {
        let config = HelperConfig::default_config();
        assert!(config.devices.len() >= 8);
        assert!(config.device("net ball").is_some());
        assert!((config.effect_status().unwrap().multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.strategy.top_k, 8);
        assert!(config.legend_and_required.contains(&644));
        config.validate().unwrap();
    }

    #[test]
    fn preserve_venues_match_fragments() {
        let venues = PreserveVenues::default();
        assert!(venues.contains("Kanto Safari Zone"));
        assert!(venues.contains("Great Marsh (Day)"));
        assert!(!venues.contains("Route 1"));
    }

    #[test]
    fn rejects_bad_modifier_and_season_gaps() {
        let mut config = HelperConfig::default_config();
        config.devices[0].modifier = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinViolation { .. })
        ));

        let mut config = HelperConfig::default_config();
        config.seasons.winter.retain(|&month| month != 12);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SeasonCoverage { month: 12, count: 0 })
        ));

        let mut config = HelperConfig::default_config();
        config.strategy.effect_status = "Confusion".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownEffectStatus(_))
        ));

        let mut config = HelperConfig::default_config();
        config.strategy.top_k = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTopK)));
    }

    #[test]
    fn rejects_rising_level_table() {
        let json = include_str!("../../data/config.json").replace(
            r#"{ "up_to": 17, "modifier": 3.8 }"#,
            r#"{ "up_to": 17, "modifier": 4.2 }"#,
        );
        let err = HelperConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::LevelTableNotMonotone { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            HelperConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
