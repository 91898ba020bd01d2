//! Centralized constants for the encounter clock, ranking, and persistence.
//!
//! Capture tuning (device prices, modifiers, statuses) lives in
//! `data/config.json`; the values here are structural and not meant to be
//! tuned per data set.

// Simulated clock ------------------------------------------------------------
/// Real seconds in one simulated day (six real hours).
pub const REAL_SECONDS_PER_GAME_DAY: i64 = 21_600;
/// Simulated seconds that elapse per real second.
pub const CLOCK_ACCELERATION: i64 = 4;
pub const GAME_SECONDS_PER_HOUR: i64 = 3_600;
pub const GAME_HOURS_PER_DAY: u32 = 24;
pub const MORNING_START_HOUR: u32 = 4;
pub const DAY_START_HOUR: u32 = 11;
pub const NIGHT_START_HOUR: u32 = 21;

// Capture math -------------------------------------------------------------
/// Shake-check ceiling of the capture formula.
pub const CAPTURE_THRESHOLD: f64 = 255.0;
pub const CAPTURE_SHAKE_SCALE: f64 = 65_536.0;
pub const NEUTRAL_MODIFIER: f64 = 1.0;
/// Vitality used for the "1 HP" strategy variants.
pub const ONE_VITALITY: u32 = 1;

// Ranking --------------------------------------------------------------------
/// Offset applied to national ids for species missing from a regional dex.
pub const REGIONAL_INDEX_FALLBACK_OFFSET: u32 = 1_000_000;

// Persistence ----------------------------------------------------------------
pub const STATUS_KEY: &str = "pokedexStatus";
pub const DEFAULT_PROFILE: &str = "Default";
