//! Evolution-line resolution over the undirected closure of evolution edges.

use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::collection::CollectionStatus;
use crate::config::NoWildSourceOverrides;
use crate::data::{Evolution, ReferenceData, Species};

/// One member of a resolved line, with its distance from the line's root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineMember {
    pub id: u32,
    pub name: String,
    pub evolutions: Vec<Evolution>,
    pub stage: u32,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    evolutions: Vec<Evolution>,
}

/// Resolves evolution lines from adjacency maps prebuilt at load time.
///
/// Stage numbers are cached per species; call [`EvolutionResolver::invalidate`]
/// (or build a new resolver) whenever reference data is reloaded.
#[derive(Debug, Default)]
pub struct EvolutionResolver {
    nodes: HashMap<u32, Node>,
    forward: HashMap<u32, Vec<u32>>,
    reverse: HashMap<u32, Vec<u32>>,
    overrides: NoWildSourceOverrides,
    stage_cache: RefCell<HashMap<u32, u32>>,
}

impl EvolutionResolver {
    #[must_use]
    pub fn new(data: &ReferenceData, overrides: NoWildSourceOverrides) -> Self {
        let mut nodes = HashMap::with_capacity(data.species().len());
        let mut forward: HashMap<u32, Vec<u32>> = HashMap::new();
        let mut reverse: HashMap<u32, Vec<u32>> = HashMap::new();

        for species in data.species() {
            nodes.insert(
                species.id,
                Node {
                    name: species.name.clone(),
                    evolutions: species.evolutions.clone(),
                },
            );
            for evolution in &species.evolutions {
                if data.species_by_id(evolution.id).is_none() {
                    continue;
                }
                forward.entry(species.id).or_default().push(evolution.id);
                reverse.entry(evolution.id).or_default().push(species.id);
            }
        }

        Self {
            nodes,
            forward,
            reverse,
            overrides,
            stage_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Drop memoized stage numbers.
    pub fn invalidate(&self) {
        self.stage_cache.borrow_mut().clear();
    }

    fn neighbours(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        let ahead = self.forward.get(&id).into_iter().flatten();
        let behind = self.reverse.get(&id).into_iter().flatten();
        ahead.chain(behind).copied()
    }

    /// Ids of every species connected to `id`, itself included. Unknown ids
    /// resolve to an empty line.
    #[must_use]
    pub fn resolve_line_ids(&self, id: u32) -> BTreeSet<u32> {
        let mut visited = BTreeSet::new();
        if !self.nodes.contains_key(&id) {
            return visited;
        }
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            queue.extend(self.neighbours(current).filter(|next| !visited.contains(next)));
        }
        visited
    }

    /// Names of every species in the line of `id`.
    #[must_use]
    pub fn resolve_line(&self, id: u32) -> BTreeSet<String> {
        self.resolve_line_ids(id)
            .into_iter()
            .filter_map(|member| self.nodes.get(&member).map(|node| node.name.clone()))
            .collect()
    }

    /// Sorted member names joined with `-`; equal for every member of a line.
    #[must_use]
    pub fn line_key(&self, id: u32) -> String {
        self.resolve_line(id)
            .into_iter()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Line members ordered by stage, then id.
    #[must_use]
    pub fn resolve_line_details(&self, id: u32) -> Vec<LineMember> {
        let members = self.resolve_line_ids(id);
        let uncached = members
            .iter()
            .any(|member| !self.stage_cache.borrow().contains_key(member));
        if uncached {
            self.fill_stages(&members);
        }

        let cache = self.stage_cache.borrow();
        let mut details: Vec<LineMember> = members
            .iter()
            .filter_map(|member| {
                self.nodes.get(member).map(|node| LineMember {
                    id: *member,
                    name: node.name.clone(),
                    evolutions: node.evolutions.clone(),
                    stage: cache.get(member).copied().unwrap_or_default(),
                })
            })
            .collect();
        details.sort_by_key(|member| (member.stage, member.id));
        details
    }

    /// BFS from every member without an incoming edge inside the line.
    fn fill_stages(&self, members: &BTreeSet<u32>) {
        let mut stages: HashMap<u32, u32> = HashMap::with_capacity(members.len());
        let mut queue: VecDeque<u32> = members
            .iter()
            .copied()
            .filter(|member| {
                self.reverse
                    .get(member)
                    .is_none_or(|sources| sources.iter().all(|src| !members.contains(src)))
            })
            .collect();
        for root in &queue {
            stages.insert(*root, 0);
        }

        while let Some(current) = queue.pop_front() {
            let next_stage = stages.get(&current).copied().unwrap_or_default() + 1;
            for next in self.forward.get(&current).into_iter().flatten() {
                if !stages.contains_key(next) {
                    stages.insert(*next, next_stage);
                    queue.push_back(*next);
                }
            }
        }

        let mut cache = self.stage_cache.borrow_mut();
        for member in members {
            cache.insert(*member, stages.get(member).copied().unwrap_or_default());
        }
    }

    /// Legendary-like classification: no catchable encounter and no
    /// evolutionary relatives, subject to the curated override table.
    #[must_use]
    pub fn is_no_wild_source(&self, species: &Species) -> bool {
        if self.overrides.always.contains(&species.id) {
            return true;
        }
        if self.overrides.never.contains(&species.id) {
            return false;
        }
        !species.has_catchable_encounter() && self.resolve_line_ids(species.id).len() == 1
    }

    /// Members of the line that are neither caught nor noted.
    #[must_use]
    pub fn uncaught_line_count(&self, id: u32, status: &CollectionStatus) -> usize {
        self.resolve_line_ids(id)
            .into_iter()
            .filter(|member| status.is_open(*member))
            .count()
    }
}
