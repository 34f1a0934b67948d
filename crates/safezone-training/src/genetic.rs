//! Genetic operators over policy tables.
//!
//! # Algorithm Overview
//!
//! 1. **Evaluate Fitness** - Every member is trained and receives a fitness
//!    (see [`Orchestrator`](crate::orchestrator::Orchestrator)).
//! 2. **Elite Selection** - The best `floor(elitism_fraction × len)` members
//!    become parents.
//! 3. **Crossover** - Every adjacent pair of elites `(mom, dad)` produces one
//!    child. The next generation is `mom, dad, child` for each pair.
//! 4. **Refill** - The driver cycles the new member list back up to the
//!    configured population size before the next evaluation.
//!
//! # Crossover
//!
//! A child holds the union of its parents' keys. For a key only one parent
//! knows, the child inherits that entry. For a key both parents know, the
//! child takes dad's entry with probability `mutation_rate` and mom's
//! otherwise. Entries are copied whole: the action and its value always
//! come from the same parent.
//!
//! ```text
//! mom:   { A: up/2.0,   B: left/7.0 }
//! dad:   {              B: down/5.0,  C: none/1.0 }
//! child: { A: up/2.0,   B: left/7.0 or down/5.0,  C: none/1.0 }
//! ```
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg32;
//! use safezone_training::genetic::{Population, PopulationEvolver};
//!
//! let mut population = Population::empty(4);
//! for (member, fitness) in population.members_mut().iter_mut().zip([4.0, 3.0, 2.0, 1.0]) {
//!     member.fitness = fitness;
//! }
//!
//! let evolver = PopulationEvolver {
//!     elitism_fraction: 0.5,
//!     mutation_rate: 0.2,
//! };
//! let next = evolver.evolve(&population, &mut Pcg32::seed_from_u64(0)).unwrap();
//! assert_eq!(next.len(), 3);
//! ```

use std::collections::{BTreeMap, btree_map};

use rand::Rng;
use safezone_agent::policy::Policy;
use safezone_stats::descriptive::DescriptiveStats;

use crate::config;

/// A candidate policy and the fitness of its last evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub policy: Policy,
    pub fitness: f64,
}

impl Member {
    /// Fitness of a member that has not been evaluated yet.
    pub const UNEVALUATED: f64 = f64::NEG_INFINITY;

    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            fitness: Self::UNEVALUATED,
        }
    }
}

/// An ordered collection of members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    members: Vec<Member>,
}

impl Population {
    /// Creates `count` members with empty policies.
    #[must_use]
    pub fn empty(count: usize) -> Self {
        Self::from_members((0..count).map(|_| Member::new(Policy::new())).collect())
    }

    #[must_use]
    pub fn from_members(members: Vec<Member>) -> Self {
        Self { members }
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut [Member] {
        &mut self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The first member. After [`Self::sort_by_fitness`], the fittest one.
    #[must_use]
    pub fn leader(&self) -> Option<&Member> {
        self.members.first()
    }

    /// Sorts members by fitness, best first.
    pub fn sort_by_fitness(&mut self) {
        self.members.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    #[must_use]
    pub fn is_sorted_by_fitness(&self) -> bool {
        self.members
            .is_sorted_by(|a, b| a.fitness.total_cmp(&b.fitness).is_ge())
    }

    /// Cycles the member list until it holds exactly `size` members.
    ///
    /// Repeated members are independent clones. An empty population stays
    /// empty.
    #[must_use]
    pub fn refilled(&self, size: usize) -> Self {
        let members = self.members.iter().cycle().take(size).cloned().collect();
        Self { members }
    }

    /// Statistics of the members' fitness, or `None` for an empty population.
    #[must_use]
    pub fn fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.members.iter().map(|m| m.fitness))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum EvolutionError {
    #[display("cannot evolve an empty population")]
    EmptyPopulation,
    #[display("{elites} elites out of {population} members, at least 2 are needed for crossover")]
    DegeneratePopulation { elites: usize, population: usize },
}

/// Controls how one generation becomes the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationEvolver {
    /// Fraction of the population kept as parents.
    pub elitism_fraction: f64,
    /// Probability that a shared key takes dad's entry.
    pub mutation_rate: f64,
}

impl PopulationEvolver {
    /// Number of elites selected from a population of `len` members.
    #[must_use]
    pub fn elite_count(&self, len: usize) -> usize {
        config::elite_count(self.elitism_fraction, len)
    }

    /// Builds the next generation from a population sorted best first.
    ///
    /// Parents are kept unchanged, so the result holds `3 × (elites - 1)`
    /// members before refilling.
    ///
    /// # Panics
    ///
    /// Panics if `population` is not sorted by fitness.
    pub fn evolve<R>(
        &self,
        population: &Population,
        rng: &mut R,
    ) -> Result<Population, EvolutionError>
    where
        R: Rng + ?Sized,
    {
        if population.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        assert!(population.is_sorted_by_fitness());

        let elites = self.elite_count(population.len());
        if elites < 2 {
            return Err(EvolutionError::DegeneratePopulation {
                elites,
                population: population.len(),
            });
        }

        let mut next = Vec::with_capacity(3 * (elites - 1));
        let elites = &population.members[..elites];
        for (mom, dad) in elites.iter().zip(&elites[1..]) {
            let child = crossover(&mom.policy, &dad.policy, self.mutation_rate, rng);
            next.extend([mom.clone(), dad.clone(), Member::new(child)]);
        }
        Ok(Population::from_members(next))
    }
}

/// Combines two parents into a child policy.
///
/// Keys are visited in order, so the result is reproducible for a seeded
/// `rng`.
pub fn crossover<R>(mom: &Policy, dad: &Policy, mutation_rate: f64, rng: &mut R) -> Policy
where
    R: Rng + ?Sized,
{
    let mut entries = mom
        .iter()
        .map(|(key, entry)| (*key, *entry))
        .collect::<BTreeMap<_, _>>();
    for (key, dad_entry) in dad {
        match entries.entry(*key) {
            btree_map::Entry::Vacant(e) => {
                e.insert(*dad_entry);
            }
            btree_map::Entry::Occupied(mut e) => {
                if rng.random_bool(mutation_rate) {
                    e.insert(*dad_entry);
                }
            }
        }
    }
    Policy::from_entries(entries)
}
