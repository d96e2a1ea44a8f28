//! Fitness-weighted selection and couple-based reproduction.
//!
//! # Algorithm
//!
//! Given the evaluated agents of one generation:
//! 1. Rank them by fitness, best first. The sort is stable, so equal scores
//!    keep population order.
//! 2. Carry the top `round(elite_fraction * pop_size)` genotypes over unchanged.
//! 3. Give every ranked agent the integer weight
//!    `round((fitness - min_fitness) * inequity_factor) + 1`. The worst agent
//!    still has weight 1, and a larger inequity factor turns the same fitness
//!    lead into a larger weight.
//! 4. Fill a parent pool of `pop_size` slots by drawing without replacement
//!    from the multiset in which each agent appears `weight` times.
//! 5. Until the generation is full: the pool's first parent mates with a
//!    uniformly drawn other pool member and the couple has
//!    `round(child_fraction_per_couple * remaining) + 1` children (crossover,
//!    then mutation). The first parent then leaves the pool. The partner
//!    stays and can be drawn again. The last brood is cut to fit.
//!
//! If the pool runs dry before the generation is full, [`UnderflowPolicy`]
//! decides between drawing a fresh pool and failing with
//! [`GaError::PopulationUnderflow`].

use crate::error::GaError;
use crate::{Genotype, Phenotype};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// What to do when the parent pool is exhausted before the next generation
/// reaches its target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderflowPolicy {
    /// Draw a fresh parent pool from the same ranked set and carry on.
    #[default]
    Resample,
    /// Stop with [`GaError::PopulationUnderflow`].
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReproductionParams {
    pub pop_size: usize,
    pub elite_fraction: f64,
    pub inequity_factor: f64,
    pub child_fraction_per_couple: f64,
    pub max_mutations: usize,
    pub underflow: UnderflowPolicy,
}

/// Compare two f64 values, treating NaN as less than all other values.
/// This ensures NaN fitness individuals sort to the end (lowest priority).
fn cmp_f64_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Sorts by fitness descending. Stable: ties keep their incoming order.
pub fn rank<G: Genotype>(mut results: Vec<Phenotype<G>>) -> Vec<Phenotype<G>> {
    results.sort_by(|a, b| cmp_f64_nan_last(b.fitness, a.fitness));
    results
}

/// Number of elites for a population of `pop_size`, never more than `pop_size`.
pub fn elite_count(elite_fraction: f64, pop_size: usize) -> usize {
    ((elite_fraction * pop_size as f64).round() as usize).min(pop_size)
}

/// Children for the next couple when `remaining` slots are still open.
pub fn couple_size(child_fraction_per_couple: f64, remaining: usize) -> usize {
    (child_fraction_per_couple * remaining as f64).round() as usize + 1
}

/// Selection weight of every ranked agent, each at least 1.
///
/// NaN fitness gets the minimum weight; float-to-integer conversion saturates
/// for very large leads.
pub fn selection_weights<G: Genotype>(ranked: &[Phenotype<G>], inequity_factor: f64) -> Vec<u64> {
    let min = ranked
        .iter()
        .map(|p| p.fitness)
        .filter(|f| !f.is_nan())
        .reduce(f64::min);
    ranked
        .iter()
        .map(|p| match min {
            Some(min) if !p.fitness.is_nan() => {
                (((p.fitness - min) * inequity_factor).round() as u64).saturating_add(1)
            }
            _ => 1,
        })
        .collect()
}

/// Draws up to `pool_size` indices without replacement from the multiset in
/// which index `i` appears `weights[i]` times, in draw order.
pub fn sample_parent_pool<R: Rng>(
    weights: &[u64],
    pool_size: usize,
    rng: &mut R,
) -> VecDeque<usize> {
    let mut counts: Vec<u128> = weights.iter().map(|&w| w as u128).collect();
    let mut total: u128 = counts.iter().sum();
    let mut pool = VecDeque::with_capacity(pool_size);

    while pool.len() < pool_size && total > 0 {
        let mut ticket = rng.random_range(0..total);
        for (idx, count) in counts.iter_mut().enumerate() {
            if ticket < *count {
                *count -= 1;
                total -= 1;
                pool.push_back(idx);
                break;
            }
            ticket -= *count;
        }
    }
    pool
}

/// Builds the next generation of exactly `params.pop_size` genotypes.
///
/// `results` need not be sorted. `generation` is only used to label errors.
pub fn next_generation<G, R>(
    results: Vec<Phenotype<G>>,
    params: &ReproductionParams,
    generation: u64,
    rng: &mut R,
) -> Result<Vec<G>, GaError>
where
    G: Genotype,
    R: Rng,
{
    let pop_size = params.pop_size;
    if pop_size == 0 {
        return Ok(Vec::new());
    }
    if results.is_empty() {
        return Err(GaError::PopulationUnderflow {
            generation,
            produced: 0,
            needed: pop_size,
        });
    }

    let ranked = rank(results);
    let elites = elite_count(params.elite_fraction, pop_size).min(ranked.len());
    let mut next_gen: Vec<G> = ranked[..elites]
        .iter()
        .map(|p| p.genotype.clone())
        .collect();

    let weights = selection_weights(&ranked, params.inequity_factor);
    let mut pool = sample_parent_pool(&weights, pop_size, rng);

    while next_gen.len() < pop_size {
        if pool.is_empty() {
            match params.underflow {
                UnderflowPolicy::Fail => {
                    return Err(GaError::PopulationUnderflow {
                        generation,
                        produced: next_gen.len(),
                        needed: pop_size,
                    });
                }
                UnderflowPolicy::Resample => {
                    log::debug!(
                        "generation {generation}: parent pool exhausted at {}/{pop_size}, resampling",
                        next_gen.len()
                    );
                    pool = sample_parent_pool(&weights, pop_size, rng);
                }
            }
        }
        let Some(&first) = pool.front() else {
            return Err(GaError::PopulationUnderflow {
                generation,
                produced: next_gen.len(),
                needed: pop_size,
            });
        };
        let partner = if pool.len() > 1 {
            pool[rng.random_range(1..pool.len())]
        } else {
            first
        };

        let remaining = pop_size - next_gen.len();
        let brood = couple_size(params.child_fraction_per_couple, remaining).min(remaining);
        let (a, b) = (&ranked[first].genotype, &ranked[partner].genotype);
        for _ in 0..brood {
            let child = a.crossover(b, rng).mutate(rng, params.max_mutations);
            next_gen.push(child);
        }
        pool.pop_front();
    }

    Ok(next_gen)
}
