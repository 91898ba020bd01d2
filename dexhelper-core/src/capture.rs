//! Capture-probability engine and capture device rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{CAPTURE_SHAKE_SCALE, CAPTURE_THRESHOLD, NEUTRAL_MODIFIER, ONE_VITALITY};
use crate::data::Species;
use crate::numbers::round_to_tenth;

/// Invalid inputs to [`capture_probability`].
#[derive(Debug, Error, PartialEq)]
pub enum CaptureError {
    #[error("max vitality must be positive")]
    ZeroMaxVitality,
    #[error("current vitality must be between 1 and {max} (got {current})")]
    CurrentVitalityOutOfRange { current: u32, max: u32 },
    #[error("{field} must be a finite non-negative number (got {value})")]
    InvalidMultiplier { field: &'static str, value: f64 },
}

/// Success chance in percent, rounded to one decimal place.
///
/// `x = (3·max − 2·current)·rate·device / (3·max) · status`; anything at or
/// above 255 is a guaranteed capture.
///
/// # Errors
///
/// Returns an error if `max_vitality` is zero, `current_vitality` is outside
/// `1..=max_vitality`, or either multiplier is negative or non-finite.
pub fn capture_probability(
    base_rate: u32,
    max_vitality: u32,
    current_vitality: u32,
    device_modifier: f64,
    status_multiplier: f64,
) -> Result<f64, CaptureError> {
    if max_vitality == 0 {
        return Err(CaptureError::ZeroMaxVitality);
    }
    if current_vitality == 0 || current_vitality > max_vitality {
        return Err(CaptureError::CurrentVitalityOutOfRange {
            current: current_vitality,
            max: max_vitality,
        });
    }
    for (field, value) in [
        ("device modifier", device_modifier),
        ("status multiplier", status_multiplier),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(CaptureError::InvalidMultiplier { field, value });
        }
    }

    let max = f64::from(max_vitality);
    let current = f64::from(current_vitality);
    let x = ((3.0 * max - 2.0 * current) * f64::from(base_rate) * device_modifier) / (3.0 * max)
        * status_multiplier;

    if x >= CAPTURE_THRESHOLD {
        return Ok(100.0);
    }
    if x <= 0.0 {
        return Ok(0.0);
    }
    let y = CAPTURE_SHAKE_SCALE / (CAPTURE_THRESHOLD / x).powf(0.25);
    let percent = (y / CAPTURE_SHAKE_SCALE).powi(4) * 100.0;
    Ok(round_to_tenth(percent).clamp(0.0, 100.0))
}

/// One row of a level-scaled modifier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStep {
    pub up_to: u32,
    pub modifier: f64,
}

/// Special behaviour attached to a capture device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceRule {
    #[default]
    Standard,
    /// Full modifier only against one of `types`, neutral otherwise.
    TypeAffinity { types: Vec<String> },
    /// Modifier taken from the first step whose `up_to` covers the level.
    LevelScaled { steps: Vec<LevelStep>, floor: f64 },
    /// Usable only inside preserve venues, at full vitality with no status.
    PreserveOnly,
    /// Only meaningful on the opening turn.
    FirstTurn,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureDevice {
    pub name: String,
    pub price: f64,
    pub modifier: f64,
    /// Usable against a target with a status effect.
    #[serde(rename = "status", default = "default_true")]
    pub allows_status: bool,
    /// Usable against a target with reduced vitality.
    #[serde(rename = "vitality", default = "default_true")]
    pub allows_vitality: bool,
    #[serde(default)]
    pub rule: DeviceRule,
}

impl CaptureDevice {
    #[must_use]
    pub fn standard(name: &str, price: f64, modifier: f64) -> Self {
        Self {
            name: name.to_string(),
            price,
            modifier,
            allows_status: true,
            allows_vitality: true,
            rule: DeviceRule::Standard,
        }
    }

    /// Preserve-only devices apply inside preserve venues, all others outside.
    #[must_use]
    pub const fn usable_at(&self, in_preserve: bool) -> bool {
        matches!(self.rule, DeviceRule::PreserveOnly) == in_preserve
    }

    #[must_use]
    pub const fn is_first_turn_only(&self) -> bool {
        matches!(self.rule, DeviceRule::FirstTurn)
    }

    /// Whether the device can be thrown under `condition`.
    #[must_use]
    pub const fn supports(&self, condition: Condition) -> bool {
        if matches!(self.rule, DeviceRule::PreserveOnly | DeviceRule::FirstTurn) {
            return matches!(condition, Condition::FullVitality);
        }
        (self.allows_vitality || !condition.reduced_vitality())
            && (self.allows_status || !condition.with_status())
    }

    /// Modifier after species- and level-specific rules.
    #[must_use]
    pub fn effective_modifier(&self, species: &Species, level: Option<u32>) -> f64 {
        match &self.rule {
            DeviceRule::TypeAffinity { types } => {
                if types.iter().any(|element| species.has_type(element)) {
                    self.modifier
                } else {
                    NEUTRAL_MODIFIER
                }
            }
            DeviceRule::LevelScaled { steps, floor } => level.map_or(self.modifier, |level| {
                steps
                    .iter()
                    .find(|step| level <= step.up_to)
                    .map_or(*floor, |step| step.modifier)
            }),
            DeviceRule::Standard | DeviceRule::PreserveOnly | DeviceRule::FirstTurn => {
                self.modifier
            }
        }
    }

    /// Probability of this device under `condition`, or `None` when the
    /// device or condition does not apply to the target.
    ///
    /// # Errors
    ///
    /// Propagates [`CaptureError`] for invalid vitality or multipliers.
    pub fn probability(
        &self,
        target: &CaptureTarget<'_>,
        condition: Condition,
        status_multiplier: f64,
    ) -> Result<Option<f64>, CaptureError> {
        if !self.usable_at(target.in_preserve) || !self.supports(condition) {
            return Ok(None);
        }
        let current = if condition.reduced_vitality() {
            ONE_VITALITY.min(target.max_vitality)
        } else {
            target.max_vitality
        };
        let status = if condition.with_status() {
            status_multiplier
        } else {
            NEUTRAL_MODIFIER
        };
        capture_probability(
            target.base_rate,
            target.max_vitality,
            current,
            self.effective_modifier(target.species, target.level),
            status,
        )
        .map(Some)
    }
}

/// A status effect and its capture multiplier. `name: None` is "no status".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: Option<String>,
    pub multiplier: f64,
}

impl StatusEffect {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            name: None,
            multiplier: NEUTRAL_MODIFIER,
        }
    }

    #[must_use]
    pub fn named(name: &str, multiplier: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            multiplier,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("None")
    }
}

/// Vitality/status combination a device is thrown under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Condition {
    FullVitality,
    OneVitality,
    FullVitalityStatus,
    OneVitalityStatus,
}

impl Condition {
    pub const ALL: [Self; 4] = [
        Self::FullVitality,
        Self::OneVitality,
        Self::FullVitalityStatus,
        Self::OneVitalityStatus,
    ];

    #[must_use]
    pub const fn reduced_vitality(self) -> bool {
        matches!(self, Self::OneVitality | Self::OneVitalityStatus)
    }

    #[must_use]
    pub const fn with_status(self) -> bool {
        matches!(self, Self::FullVitalityStatus | Self::OneVitalityStatus)
    }

    /// Turns spent setting up before the first throw, plus the throw itself.
    #[must_use]
    pub const fn base_turns(self) -> u32 {
        match self {
            Self::FullVitality => 1,
            Self::OneVitality | Self::FullVitalityStatus => 2,
            Self::OneVitalityStatus => 3,
        }
    }

    /// Display label such as `"1 HP + Sleep"`.
    #[must_use]
    pub fn describe(self, effect: &str) -> String {
        match self {
            Self::FullVitality => "Full HP".to_string(),
            Self::OneVitality => "1 HP".to_string(),
            Self::FullVitalityStatus => format!("Full HP + {effect}"),
            Self::OneVitalityStatus => format!("1 HP + {effect}"),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe("Status"))
    }
}

/// Everything about the target that capture math needs.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTarget<'a> {
    pub species: &'a Species,
    pub base_rate: u32,
    pub max_vitality: u32,
    pub level: Option<u32>,
    pub in_preserve: bool,
}
