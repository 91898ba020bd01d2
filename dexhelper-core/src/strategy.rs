//! Strategy selection: every applicable (device, condition) pair for an
//! encounter, ranked by expected spend and by expected turns.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::capture::{CaptureTarget, Condition};
use crate::config::HelperConfig;
use crate::data::{Encounter, ReferenceData, Species};
use crate::numbers::ceil_f64_to_u32;

/// Turns needed to land a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TurnEstimate {
    Exact(u32),
    Range { min: u32, max: u32 },
}

impl fmt::Display for TurnEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(turns) => write!(f, "{turns}"),
            Self::Range { min, max } => write!(f, "{min}-{max}"),
        }
    }
}

/// One ranked (device, condition) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOption {
    pub device: String,
    pub condition: Condition,
    pub condition_label: String,
    pub probability: f64,
    pub expected_cost: f64,
    pub turns: TurnEstimate,
    pub turns_sort_key: f64,
}

/// Both rankings for one species at one encounter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesStrategy {
    pub species_id: u32,
    pub species_name: String,
    pub location: String,
    pub cost_ranking: Vec<StrategyOption>,
    pub speed_ranking: Vec<StrategyOption>,
}

struct Candidate {
    option: StrategyOption,
    first_turn_only: bool,
}

fn is_certain(probability: f64) -> bool {
    (probability - 100.0).abs() < f64::EPSILON
}

fn turn_estimate(condition: Condition, probability: f64) -> (TurnEstimate, f64) {
    let base = condition.base_turns();
    if is_certain(probability) {
        return (TurnEstimate::Exact(base), f64::from(base));
    }
    let extra_throws = 100.0 / probability;
    let max = base - 1 + ceil_f64_to_u32(extra_throws);
    (
        TurnEstimate::Range { min: base, max },
        f64::from(base) - 1.0 + extra_throws,
    )
}

fn speed_order(a: &StrategyOption, b: &StrategyOption) -> Ordering {
    a.turns_sort_key
        .total_cmp(&b.turns_sort_key)
        .then_with(|| b.probability.total_cmp(&a.probability))
        .then_with(|| a.expected_cost.total_cmp(&b.expected_cost))
}

/// Builds strategy rankings from the configured devices and statuses.
#[derive(Debug, Clone, Copy)]
pub struct StrategySelector<'a> {
    config: &'a HelperConfig,
    data: &'a ReferenceData,
}

impl<'a> StrategySelector<'a> {
    #[must_use]
    pub const fn new(config: &'a HelperConfig, data: &'a ReferenceData) -> Self {
        Self { config, data }
    }

    fn target<'s>(&self, species: &'s Species, encounter: &Encounter) -> Option<CaptureTarget<'s>> {
        let Some(max_vitality) = species.stats.hp.filter(|&hp| hp > 0) else {
            log::warn!("skipping {} (id {}): invalid HP", species.name, species.id);
            return None;
        };
        if encounter.max_level.is_none() || encounter.method.is_none() || encounter.location.is_empty()
        {
            log::warn!(
                "skipping {} (id {}): encounter is missing level, method, or location",
                species.name,
                species.id
            );
            return None;
        }
        let Some(base_rate) = self.data.catch_rate(species.id) else {
            log::warn!("skipping {} (id {}): no catch rate", species.name, species.id);
            return None;
        };
        Some(CaptureTarget {
            species,
            base_rate,
            max_vitality,
            level: encounter.max_level,
            in_preserve: self.config.preserve_venues.contains(&encounter.location),
        })
    }

    fn candidates(&self, target: &CaptureTarget<'_>) -> Vec<Candidate> {
        let effect = self.config.effect_status();
        let effect_label = effect.map_or("Status", |status| status.label());
        let mut candidates = Vec::new();

        for device in &self.config.devices {
            for condition in Condition::ALL {
                let multiplier = if condition.with_status() {
                    let Some(status) = effect else {
                        log::warn!(
                            "status {:?} is not configured; skipping {} with {condition}",
                            self.config.strategy.effect_status,
                            device.name
                        );
                        continue;
                    };
                    status.multiplier
                } else {
                    1.0
                };
                let probability = match device.probability(target, condition, multiplier) {
                    Ok(Some(probability)) if probability > 0.0 => probability,
                    Ok(_) => continue,
                    Err(err) => {
                        log::warn!(
                            "skipping {} with {condition} for {}: {err}",
                            device.name,
                            target.species.name
                        );
                        continue;
                    }
                };
                let (turns, turns_sort_key) = turn_estimate(condition, probability);
                candidates.push(Candidate {
                    option: StrategyOption {
                        device: device.name.clone(),
                        condition,
                        condition_label: condition.describe(effect_label),
                        probability,
                        expected_cost: device.price / (probability / 100.0),
                        turns,
                        turns_sort_key,
                    },
                    first_turn_only: device.is_first_turn_only(),
                });
            }
        }
        candidates
    }

    /// Rankings for `species` at one encounter, or `None` when the species or
    /// encounter lacks the data capture math needs.
    #[must_use]
    pub fn for_encounter(&self, species: &Species, encounter: &Encounter) -> Option<SpeciesStrategy> {
        let target = self.target(species, encounter)?;
        let candidates = self.candidates(&target);
        let top_k = self.config.strategy.top_k;

        let mut cost_ranking: Vec<StrategyOption> =
            candidates.iter().map(|c| c.option.clone()).collect();
        cost_ranking.sort_by(|a, b| a.expected_cost.total_cmp(&b.expected_cost));
        cost_ranking.truncate(top_k);

        let mut speed_ranking: Vec<StrategyOption> = candidates
            .into_iter()
            .filter(|c| !c.first_turn_only || is_certain(c.option.probability))
            .map(|c| c.option)
            .collect();
        speed_ranking.sort_by(speed_order);
        speed_ranking.truncate(top_k);

        Some(SpeciesStrategy {
            species_id: species.id,
            species_name: species.name.clone(),
            location: encounter.location.clone(),
            cost_ranking,
            speed_ranking,
        })
    }

    /// Rankings from the first encounter with complete data.
    #[must_use]
    pub fn first_complete<'e, I>(&self, species: &Species, encounters: I) -> Option<SpeciesStrategy>
    where
        I: IntoIterator<Item = &'e Encounter>,
    {
        encounters
            .into_iter()
            .find_map(|encounter| self.for_encounter(species, encounter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> ReferenceData {
        let monsters = r#"[
            {"id": 10, "name": "Caterpie", "types": ["BUG"], "stats": {"hp": 45},
             "locations": [{"region_name": "Kanto", "location": "Viridian Forest", "rarity": "Very Common",
                            "type": "Grass", "min_level": 3, "max_level": 5}]},
            {"id": 113, "name": "Chansey", "types": ["NORMAL"], "stats": {"hp": 250},
             "locations": [{"region_name": "Kanto", "location": "Route 14", "rarity": "Very Rare",
                            "type": "Grass", "min_level": 25, "max_level": 30}]},
            {"id": 128, "name": "Tauros", "types": ["NORMAL"], "stats": {"hp": 75},
             "locations": [{"region_name": "Kanto", "location": "Safari Zone", "rarity": "Rare",
                            "type": "Grass", "min_level": 21, "max_level": 27}]},
            {"id": 132, "name": "Ditto", "types": ["NORMAL"], "stats": {},
             "locations": [{"region_name": "Kanto", "location": "Route 13", "rarity": "Rare",
                            "type": "Grass", "min_level": 20, "max_level": 25}]},
            {"id": 37, "name": "Vulpix", "types": ["FIRE"], "stats": {"hp": 38},
             "locations": [{"region_name": "Kanto", "location": "Route 7", "rarity": "Rare"}]}
        ]"#;
        let rates = r#"[{"id": 10, "rate": 255}, {"id": 113, "rate": 30}, {"id": 128, "rate": 45},
                        {"id": 132, "rate": 35}, {"id": 37, "rate": 190}]"#;
        ReferenceData::from_json(monsters, "[]", rates).unwrap()
    }

    fn strategy(data: &ReferenceData, id: u32) -> Option<SpeciesStrategy> {
        strategy_with_top_k(data, id, 8)
    }

    fn strategy_with_top_k(data: &ReferenceData, id: u32, top_k: usize) -> Option<SpeciesStrategy> {
        let mut config = HelperConfig::default_config();
        config.strategy.top_k = top_k;
        let selector = StrategySelector::new(&config, data);
        let species = data.species_by_id(id).unwrap();
        selector.for_encounter(species, &species.locations[0])
    }

    #[test]
    fn cost_ranking_is_non_decreasing() {
        let data = fixture();
        let result = strategy(&data, 10).unwrap();
        assert_eq!(result.cost_ranking.len(), 8);
        assert!(
            result
                .cost_ranking
                .windows(2)
                .all(|pair| pair[0].expected_cost <= pair[1].expected_cost)
        );
        let cheapest = &result.cost_ranking[0];
        assert_eq!(cheapest.device, "Poke Ball");
        assert_eq!(cheapest.condition, Condition::OneVitalityStatus);
        assert_eq!(cheapest.condition_label, "1 HP + Sleep");
        assert!((cheapest.expected_cost - 200.0).abs() < 1e-9);
    }

    #[test]
    fn speed_ranking_breaks_ties_by_probability_then_cost() {
        let data = fixture();
        let result = strategy(&data, 10).unwrap();
        let speed = &result.speed_ranking;
        assert!(
            speed
                .windows(2)
                .all(|pair| speed_order(&pair[0], &pair[1]) != Ordering::Greater)
        );
        let leaders: Vec<&str> = speed[..3].iter().map(|o| o.device.as_str()).collect();
        assert_eq!(leaders, vec!["Nest Ball", "Quick Ball", "Net Ball"]);
        assert!(speed[..3].iter().all(|o| o.turns == TurnEstimate::Exact(1)));
    }

    #[test]
    fn turn_ranges_use_ceiling_and_continuous_key() {
        let (turns, key) = turn_estimate(Condition::OneVitality, 40.0);
        assert_eq!(turns, TurnEstimate::Range { min: 2, max: 4 });
        assert_eq!(turns.to_string(), "2-4");
        assert!((key - 3.5).abs() < 1e-9);

        let (exact, key) = turn_estimate(Condition::OneVitalityStatus, 100.0);
        assert_eq!(exact, TurnEstimate::Exact(3));
        assert!((key - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn constructed_ties_follow_cascade() {
        let option = |device: &str, probability: f64, cost: f64| StrategyOption {
            device: device.to_string(),
            condition: Condition::FullVitality,
            condition_label: "Full HP".into(),
            probability,
            expected_cost: cost,
            turns: TurnEstimate::Exact(1),
            turns_sort_key: 2.0,
        };
        let mut options = vec![
            option("c", 50.0, 300.0),
            option("b", 60.0, 900.0),
            option("a", 50.0, 100.0),
        ];
        options.sort_by(speed_order);
        let order: Vec<&str> = options.iter().map(|o| o.device.as_str()).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn uncertain_first_turn_device_is_cost_only() {
        let data = fixture();
        let result = strategy_with_top_k(&data, 113, 64).unwrap();
        assert!(result.cost_ranking.iter().any(|o| o.device == "Quick Ball"));
        assert!(result.speed_ranking.iter().all(|o| o.device != "Quick Ball"));
    }

    #[test]
    fn preserve_venue_only_offers_preserve_device() {
        let data = fixture();
        let result = strategy(&data, 128).unwrap();
        assert_eq!(result.cost_ranking.len(), 1);
        assert_eq!(result.cost_ranking[0].device, "Safari Ball");
        assert_eq!(result.cost_ranking[0].condition, Condition::FullVitality);
        assert_eq!(result.speed_ranking.len(), 1);
    }

    #[test]
    fn incomplete_data_is_skipped() {
        let data = fixture();
        assert!(strategy(&data, 132).is_none());
        assert!(strategy(&data, 37).is_none());
    }
}
