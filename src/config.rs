//! Run configuration.
//!
//! Every field is validated by [`EvolutionConfig::validate`] before a run
//! starts. Optional sections fall back to their defaults when absent from a
//! config file.

use crate::algorithms::weighted::{ReproductionParams, UnderflowPolicy};
use crate::episode::Scoring;
use crate::error::GaError;
use crate::genome::GENOME_LEN;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Seed of the world layout and of every episode's start position
    pub seed: u64,
    /// Interior side length of the square world
    pub board_size: usize,
    /// Probability that an interior cell starts with food (0.0 - 1.0)
    pub food_density: f64,
    pub population_size: usize,
    pub turns_per_episode: usize,
    /// Upper bound on point mutations per child, at most the genome length;
    /// the integer part is used
    pub mutation_rate_cap: f64,
    /// Share of the population carried over unchanged (0.0 - 1.0)
    pub elite_fraction: f64,
    /// How strongly a fitness lead turns into selection weight
    pub inequity_factor: f64,
    /// Share of the unfilled population each couple produces, in (0.0, 1.0]
    pub child_fraction_per_couple: f64,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default)]
    pub underflow: UnderflowPolicy,
    /// Seeds the reproduction RNG; a fresh OS-derived seed is used when unset
    #[serde(default)]
    pub breeding_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            seed: 512,
            board_size: 5,
            food_density: 0.3,
            population_size: 10,
            turns_per_episode: 100,
            mutation_rate_cap: 3.0,
            elite_fraction: 0.1,
            inequity_factor: 1.0,
            child_fraction_per_couple: 0.2,
            scoring: Scoring::default(),
            underflow: UnderflowPolicy::default(),
            breeding_seed: None,
        }
    }
}

impl EvolutionConfig {
    pub fn validate(&self) -> Result<(), GaError> {
        if self.board_size < 1 {
            return Err(GaError::config("board_size", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.food_density) {
            return Err(GaError::config(
                "food_density",
                format!("must be within [0, 1], got {}", self.food_density),
            ));
        }
        if self.population_size < 1 {
            return Err(GaError::config("population_size", "must be at least 1"));
        }
        if !(0.0..=GENOME_LEN as f64).contains(&self.mutation_rate_cap) {
            return Err(GaError::config(
                "mutation_rate_cap",
                format!(
                    "must be within [0, {GENOME_LEN}], got {}",
                    self.mutation_rate_cap
                ),
            ));
        }
        if !(0.0..=1.0).contains(&self.elite_fraction) {
            return Err(GaError::config(
                "elite_fraction",
                format!("must be within [0, 1], got {}", self.elite_fraction),
            ));
        }
        if !(self.inequity_factor.is_finite() && self.inequity_factor >= 0.0) {
            return Err(GaError::config(
                "inequity_factor",
                format!("must be finite and >= 0, got {}", self.inequity_factor),
            ));
        }
        if !(self.child_fraction_per_couple > 0.0 && self.child_fraction_per_couple <= 1.0) {
            return Err(GaError::config(
                "child_fraction_per_couple",
                format!(
                    "must be within (0, 1], got {}",
                    self.child_fraction_per_couple
                ),
            ));
        }
        self.scoring.validate()
    }

    /// Point-mutation cap per child.
    pub fn max_mutations(&self) -> usize {
        self.mutation_rate_cap.floor() as usize
    }

    pub fn reproduction(&self) -> ReproductionParams {
        ReproductionParams {
            pop_size: self.population_size,
            elite_fraction: self.elite_fraction,
            inequity_factor: self.inequity_factor,
            child_fraction_per_couple: self.child_fraction_per_couple,
            max_mutations: self.max_mutations(),
            underflow: self.underflow,
        }
    }
}
