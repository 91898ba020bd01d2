//! Simulated in-game clock and the encounter availability filter.
//!
//! The game runs one simulated day every six real hours. The current period
//! and season decide which encounter definitions are live.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PreserveVenues;
use crate::constants::{
    CLOCK_ACCELERATION, DAY_START_HOUR, GAME_HOURS_PER_DAY, GAME_SECONDS_PER_HOUR,
    MORNING_START_HOUR, NIGHT_START_HOUR, REAL_SECONDS_PER_GAME_DAY,
};
use crate::data::{Encounter, Species};
use crate::numbers::{ceil_f64_to_u32, i64_to_f64};

/// Time-of-day period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Morning,
    Day,
    Night,
}

impl Period {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Day => "Day",
            Self::Night => "Night",
        }
    }

    /// Morning [4,11), Day [11,21), Night [21,4).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        if hour >= NIGHT_START_HOUR || hour < MORNING_START_HOUR {
            Self::Night
        } else if hour >= DAY_START_HOUR {
            Self::Day
        } else {
            Self::Morning
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "day" => Some(Self::Day),
            "night" => Some(Self::Night),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// In-game season, cycled by calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Spring => 0,
            Self::Summer => 1,
            Self::Autumn => 2,
            Self::Winter => 3,
        }
    }

    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Spring),
            1 => Some(Self::Summer),
            2 => Some(Self::Autumn),
            3 => Some(Self::Winter),
            _ => None,
        }
    }

    /// Tag code as it appears in location labels, e.g. `SEASON2`.
    #[must_use]
    pub fn code(self) -> String {
        format!("SEASON{}", self.index())
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
            Self::Winter => "Winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Month (1-12) lists per season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonTable {
    pub spring: Vec<u32>,
    pub summer: Vec<u32>,
    pub autumn: Vec<u32>,
    pub winter: Vec<u32>,
}

impl SeasonTable {
    #[must_use]
    pub fn months(&self, season: Season) -> &[u32] {
        match season {
            Season::Spring => &self.spring,
            Season::Summer => &self.summer,
            Season::Autumn => &self.autumn,
            Season::Winter => &self.winter,
        }
    }

    #[must_use]
    pub fn season_for_month(&self, month: u32) -> Option<Season> {
        Season::ALL
            .into_iter()
            .find(|&season| self.months(season).contains(&month))
    }
}

impl Default for SeasonTable {
    fn default() -> Self {
        Self {
            spring: vec![1, 5, 9],
            summer: vec![2, 6, 10],
            autumn: vec![3, 7, 11],
            winter: vec![4, 8, 12],
        }
    }
}

/// One sample of the simulated clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockReading {
    pub hour: u32,
    pub minute: u32,
    pub period: Period,
    pub season: Season,
}

impl ClockReading {
    #[must_use]
    pub const fn availability(&self) -> Availability {
        Availability {
            season: self.season,
            period: self.period,
        }
    }
}

impl fmt::Display for ClockReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Real time remaining until the next period starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextPeriod {
    pub period: Period,
    pub wait: Duration,
}

impl fmt::Display for NextPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.wait.num_seconds().max(0).div_euclid(60)
            + i64::from(self.wait.num_seconds().rem_euclid(60) > 0);
        let hours = minutes / 60;
        if hours > 0 {
            write!(f, "{} in {hours}h {:02}m", self.period, minutes % 60)
        } else {
            write!(f, "{} in {minutes}m", self.period)
        }
    }
}

/// Derives simulated time from real UTC time.
#[derive(Debug, Clone, Default)]
pub struct GameClock {
    seasons: SeasonTable,
}

impl GameClock {
    #[must_use]
    pub const fn new(seasons: SeasonTable) -> Self {
        Self { seasons }
    }

    /// Simulated seconds elapsed since the start of the current game day.
    #[must_use]
    pub fn game_seconds(now: DateTime<Utc>) -> i64 {
        let real = i64::from(now.num_seconds_from_midnight());
        (real % REAL_SECONDS_PER_GAME_DAY) * CLOCK_ACCELERATION
    }

    #[must_use]
    pub fn season_at(&self, now: DateTime<Utc>) -> Season {
        self.seasons
            .season_for_month(now.month())
            .unwrap_or(Season::Spring)
    }

    #[must_use]
    pub fn sample(&self, now: DateTime<Utc>) -> ClockReading {
        let seconds = Self::game_seconds(now);
        let hour = u32::try_from(seconds / GAME_SECONDS_PER_HOUR).unwrap_or_default();
        let minute = u32::try_from((seconds % GAME_SECONDS_PER_HOUR) / 60).unwrap_or_default();
        ClockReading {
            hour,
            minute,
            period: Period::from_hour(hour),
            season: self.season_at(now),
        }
    }

    /// Real-time countdown to the next period boundary.
    #[must_use]
    pub fn time_until_next_period(now: DateTime<Utc>) -> NextPeriod {
        let seconds = Self::game_seconds(now);
        let boundaries = [
            (MORNING_START_HOUR, Period::Morning),
            (DAY_START_HOUR, Period::Day),
            (NIGHT_START_HOUR, Period::Night),
            (GAME_HOURS_PER_DAY + MORNING_START_HOUR, Period::Morning),
        ];
        let (boundary, period) = boundaries
            .into_iter()
            .map(|(hour, period)| (i64::from(hour) * GAME_SECONDS_PER_HOUR, period))
            .find(|&(boundary, _)| boundary > seconds)
            .unwrap_or((i64::from(MORNING_START_HOUR) * GAME_SECONDS_PER_HOUR, Period::Morning));
        let remaining = i64_to_f64(boundary - seconds) / i64_to_f64(CLOCK_ACCELERATION);
        NextPeriod {
            period,
            wait: Duration::seconds(i64::from(ceil_f64_to_u32(remaining))),
        }
    }
}

/// Current season and period used to gate encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub season: Season,
    pub period: Period,
}

impl Availability {
    #[must_use]
    pub fn is_active(&self, encounter: &Encounter) -> bool {
        let tags = &encounter.tags;
        let season_ok = tags.season.is_none_or(|season| season == self.season);
        let period_ok = tags.periods.is_empty() || tags.periods.contains(&self.period);
        season_ok && period_ok
    }
}

/// An encounter that is live right now, with its time-exclusivity markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEncounter<'a> {
    pub encounter: &'a Encounter,
    pub time_exclusivity: Option<String>,
    pub time_exclusive_only: bool,
}

/// True when the species has no time-unrestricted encounter outside preserve
/// venues.
#[must_use]
pub fn only_time_restricted(species: &Species, venues: &PreserveVenues) -> bool {
    let mut regular = species
        .locations
        .iter()
        .filter(|encounter| !venues.contains(&encounter.location))
        .peekable();
    regular.peek().is_some() && regular.all(|encounter| encounter.tags.is_time_tagged())
}

/// Currently live encounters of `species`, ordered by rarity tier.
#[must_use]
pub fn active_encounters<'a>(
    species: &'a Species,
    availability: Availability,
    venues: &PreserveVenues,
) -> Vec<ActiveEncounter<'a>> {
    let restricted = only_time_restricted(species, venues);
    let mut active: Vec<ActiveEncounter<'a>> = species
        .locations
        .iter()
        .filter(|encounter| availability.is_active(encounter))
        .map(|encounter| {
            let time_exclusivity = encounter.tags.time_label();
            let time_exclusive_only = restricted && time_exclusivity.is_some();
            ActiveEncounter {
                encounter,
                time_exclusivity,
                time_exclusive_only,
            }
        })
        .collect();
    active.sort_by_key(|entry| entry.encounter.rarity);
    active
}

/// Remembers the last sampled period and reports transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodWatcher {
    last: Option<Period>,
}

impl PeriodWatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record a sample. The first sample never counts as a change.
    pub fn observe(&mut self, period: Period) -> bool {
        let changed = self.last.is_some_and(|last| last != period);
        if changed {
            log::debug!("period changed to {period}");
        }
        self.last = Some(period);
        changed
    }

    #[must_use]
    pub const fn last(&self) -> Option<Period> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LocationTags, Rarity, Region};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, minute, 0).unwrap()
    }

    fn encounter(label: &str, rarity: Rarity) -> Encounter {
        Encounter {
            region_id: 0,
            region_name: Region::Kanto,
            location: label.to_string(),
            rarity,
            method: Some("Grass".into()),
            min_level: Some(3),
            max_level: Some(5),
            tags: LocationTags::parse(label),
        }
    }

    #[test]
    fn clock_runs_four_times_faster_on_six_hour_cycle() {
        let clock = GameClock::default();
        let midnight = clock.sample(at(0, 0));
        assert_eq!((midnight.hour, midnight.minute), (0, 0));
        assert_eq!(midnight.period, Period::Night);

        let morning = clock.sample(at(1, 0));
        assert_eq!(morning.to_string(), "04:00");
        assert_eq!(morning.period, Period::Morning);

        let day = clock.sample(at(3, 0));
        assert_eq!(day.hour, 12);
        assert_eq!(day.period, Period::Day);

        let night = clock.sample(at(5, 15));
        assert_eq!(night.hour, 21);
        assert_eq!(night.period, Period::Night);

        assert_eq!(clock.sample(at(6, 0)).hour, 0);
    }

    #[test]
    fn seasons_follow_month_table() {
        let clock = GameClock::default();
        let march = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let may = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let december = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(clock.sample(march).season, Season::Autumn);
        assert_eq!(clock.sample(may).season, Season::Spring);
        assert_eq!(clock.sample(december).season, Season::Winter);
        assert_eq!(Season::Autumn.code(), "SEASON2");
    }

    #[test]
    fn countdown_targets_next_boundary() {
        let next = GameClock::time_until_next_period(at(0, 0));
        assert_eq!(next.period, Period::Morning);
        assert_eq!(next.wait, Duration::hours(1));
        assert_eq!(next.to_string(), "Morning in 1h 00m");

        let soon = GameClock::time_until_next_period(at(5, 0));
        assert_eq!(soon.period, Period::Night);
        assert_eq!(soon.to_string(), "Night in 15m");

        let late = GameClock::time_until_next_period(at(5, 30));
        assert_eq!(late.period, Period::Morning);
        assert_eq!(late.wait, Duration::minutes(90));
    }

    #[test]
    fn night_only_encounter_toggles_with_period() {
        let night_only = encounter("Route 1 (Night)", Rarity::Common);
        let night = Availability {
            season: Season::Spring,
            period: Period::Night,
        };
        let day = Availability {
            period: Period::Day,
            ..night
        };
        assert!(night.is_active(&night_only));
        assert!(!day.is_active(&night_only));
        assert!(night.is_active(&night_only));
    }

    #[test]
    fn season_tag_must_match_current_season() {
        let seasonal = encounter("National Park (SEASON0)", Rarity::Uncommon);
        let spring = Availability {
            season: Season::Spring,
            period: Period::Day,
        };
        let winter = Availability {
            season: Season::Winter,
            ..spring
        };
        assert!(spring.is_active(&seasonal));
        assert!(!winter.is_active(&seasonal));
    }

    #[test]
    fn time_exclusive_only_ignores_preserve_venues() {
        let species = Species {
            id: 1,
            name: "Hoothoot".into(),
            types: vec!["NORMAL".into()],
            stats: crate::data::BaseStats { hp: Some(60) },
            locations: vec![
                encounter("Route 29 (Night)", Rarity::Common),
                encounter("Safari Zone", Rarity::Rare),
            ],
            evolutions: Vec::new(),
            obtainable: true,
        };
        let venues = PreserveVenues::default();
        let night = Availability {
            season: Season::Spring,
            period: Period::Night,
        };
        let active = active_encounters(&species, night, &venues);
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].time_exclusivity.as_deref(), Some("Night"));
        assert!(active[0].time_exclusive_only);
        assert!(!active[1].time_exclusive_only);
    }

    #[test]
    fn watcher_ignores_first_sample() {
        let mut watcher = PeriodWatcher::new();
        assert!(!watcher.observe(Period::Day));
        assert!(!watcher.observe(Period::Day));
        assert!(watcher.observe(Period::Night));
        assert_eq!(watcher.last(), Some(Period::Night));
    }
}
