//! The generation loop.
//!
//! [`GenerationState`] is everything that survives from one generation to the
//! next, and [`GenerationState::advance`] is a pure transition from one state
//! to the next. [`ForagingGa`] binds a state to its configuration and world and
//! drives it until cancelled.

use crate::algorithms::weighted::{self, ReproductionParams};
use crate::config::EvolutionConfig;
use crate::episode::ForagingTask;
use crate::error::GaError;
use crate::evaluation::evaluate_population;
use crate::genome::{GENOME_LEN, Genome};
use crate::world::World;
use crate::{Evaluator, Evolver, Genotype};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64; // Specific, serializable generator
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-generation statistics, one log row each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: u64,
    /// Best score of this generation; `None` if every episode faulted
    pub current_best: Option<f64>,
    /// Best score of any generation so far, this one included
    pub all_time_best: Option<f64>,
    pub mean_fitness: Option<f64>,
    /// Mean genotype distance of the evaluated agents to the best of them
    pub diversity: f32,
    pub evaluated: usize,
    pub faults: usize,
}

/// Resumable state of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationState {
    /// Index of the generation `population` belongs to
    pub generation: u64,
    /// Top score of the most recently evaluated generation
    pub current_best: Option<f64>,
    pub all_time_best: Option<f64>,
    pub population: Vec<Genome>,
    rng: Pcg64,
}

impl GenerationState {
    /// Generation zero with `size` random founders.
    ///
    /// Without a `breeding_seed`, founders and all later reproduction draw from
    /// an OS-seeded generator.
    pub fn founders(size: usize, breeding_seed: Option<u64>) -> Self {
        let mut rng = match breeding_seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_rng(&mut rand::rng()),
        };
        let population = (0..size).map(|_| Genome::random_with(&mut rng)).collect();
        Self::from_parts(population, rng)
    }

    /// Generation zero with a given population.
    pub fn with_population(population: Vec<Genome>, breeding_seed: Option<u64>) -> Self {
        let rng = match breeding_seed {
            Some(seed) => Pcg64::seed_from_u64(seed),
            None => Pcg64::from_rng(&mut rand::rng()),
        };
        Self::from_parts(population, rng)
    }

    fn from_parts(population: Vec<Genome>, rng: Pcg64) -> Self {
        Self {
            generation: 0,
            current_best: None,
            all_time_best: None,
            population,
            rng,
        }
    }

    /// Fails on the first genome that is not [`GENOME_LEN`] symbols long.
    pub fn check_population(&self) -> Result<(), GaError> {
        match self
            .population
            .iter()
            .enumerate()
            .find(|(_, g)| g.len() != GENOME_LEN)
        {
            Some((agent, genome)) => Err(GaError::GenomeLengthMismatch {
                agent,
                found: genome.len(),
                expected: GENOME_LEN,
            }),
            None => Ok(()),
        }
    }

    /// Evaluates this generation, breeds the next and returns it with the
    /// statistics of this one. `self` is left untouched, so a failed step can
    /// be retried or abandoned without losing state.
    pub fn advance<E: Evaluator<Genome>>(
        &self,
        evaluator: &E,
        params: &ReproductionParams,
    ) -> Result<(GenerationState, GenerationReport), GaError> {
        self.check_population()?;

        let evaluation = evaluate_population(&self.population, evaluator, self.generation);
        let current_best = evaluation.best_fitness();
        let mean_fitness = evaluation.mean_fitness();
        let all_time_best = match (self.all_time_best, current_best) {
            (Some(previous), Some(current)) => Some(previous.max(current)),
            (previous, current) => previous.or(current),
        };

        let ranked = weighted::rank(evaluation.scored);
        let diversity = match ranked.first() {
            Some(best) => {
                ranked
                    .iter()
                    .map(|p| p.genotype.distance(&best.genotype))
                    .sum::<f32>()
                    / ranked.len() as f32
            }
            None => 0.0,
        };
        let report = GenerationReport {
            generation: self.generation,
            current_best,
            all_time_best,
            mean_fitness,
            diversity,
            evaluated: ranked.len(),
            faults: evaluation.faults.len(),
        };

        let mut rng = self.rng.clone();
        let population = weighted::next_generation(ranked, params, self.generation, &mut rng)?;

        let next = GenerationState {
            generation: self.generation + 1,
            current_best,
            all_time_best,
            population,
            rng,
        };
        Ok((next, report))
    }
}

/// A configured foraging run.
#[derive(Debug, Clone)]
pub struct ForagingGa {
    config: EvolutionConfig,
    task: ForagingTask,
    state: GenerationState,
}

impl ForagingGa {
    /// Validates `config`, builds the world and draws the founders.
    pub fn new(config: EvolutionConfig) -> Result<Self, GaError> {
        config.validate()?;
        let state = GenerationState::founders(config.population_size, config.breeding_seed);
        Self::resume(config, state)
    }

    /// Continues from a saved state.
    pub fn resume(config: EvolutionConfig, state: GenerationState) -> Result<Self, GaError> {
        config.validate()?;
        if state.population.len() != config.population_size {
            return Err(GaError::config(
                "population_size",
                format!(
                    "is {} but the saved population has {} agents",
                    config.population_size,
                    state.population.len()
                ),
            ));
        }
        state.check_population()?;

        let world = World::generate(config.seed, config.board_size, config.food_density)?;
        let task = ForagingTask::new(world, config.turns_per_episode, config.scoring);
        Ok(Self {
            config,
            task,
            state,
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.task.world
    }

    pub fn task(&self) -> &ForagingTask {
        &self.task
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn into_state(self) -> GenerationState {
        self.state
    }

    /// Steps until `cancel` is set or `max_generations` more generations have
    /// run, calling `on_generation` after each one. `cancel` is only checked
    /// between generations. Returns the number of generations completed.
    pub fn run_until<F>(
        &mut self,
        cancel: &AtomicBool,
        max_generations: Option<u64>,
        mut on_generation: F,
    ) -> Result<u64, GaError>
    where
        F: FnMut(&GenerationReport, &GenerationState),
    {
        let mut completed = 0;
        while !cancel.load(Ordering::Relaxed) && max_generations.is_none_or(|max| completed < max) {
            let report = self.step()?;
            completed += 1;
            on_generation(&report, &self.state);
        }
        Ok(completed)
    }
}

impl Evolver<Genome> for ForagingGa {
    fn step(&mut self) -> Result<GenerationReport, GaError> {
        let (next, report) = self.state.advance(&self.task, &self.config.reproduction())?;
        self.state = next;
        log::info!(
            "generation {}: best {} (all-time {}), {} faults",
            report.generation,
            fmt_score(report.current_best),
            fmt_score(report.all_time_best),
            report.faults
        );
        Ok(report)
    }

    fn population(&self) -> &[Genome] {
        &self.state.population
    }
}

fn fmt_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.2}"))
}
