//! Population evaluation.
//!
//! Every agent is an independent unit of work. With the `parallel` feature the
//! episodes fan out over rayon's global pool (one worker per available core);
//! the call returns only when all of them are done. Results keep population
//! order, so ranking ties resolve the same way however the work was scheduled.

use crate::error::AgentFault;
use crate::{Evaluator, Genotype, Phenotype};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Outcome of evaluating one generation.
#[derive(Debug, Clone)]
pub struct Evaluation<G: Genotype> {
    /// Successfully evaluated agents, in population order.
    pub scored: Vec<Phenotype<G>>,
    /// Agents whose episode faulted; they take no part in ranking.
    pub faults: Vec<AgentFault>,
}

impl<G: Genotype> Evaluation<G> {
    pub fn best_fitness(&self) -> Option<f64> {
        self.scored
            .iter()
            .map(|p| p.fitness)
            .filter(|f| !f.is_nan())
            .reduce(f64::max)
    }

    /// Mean over the finite scores only.
    pub fn mean_fitness(&self) -> Option<f64> {
        let (sum, count) = self
            .scored
            .iter()
            .map(|p| p.fitness)
            .filter(|f| f.is_finite())
            .fold((0.0, 0usize), |(s, n), f| (s + f, n + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

/// Evaluates every member of `population` with `evaluator`.
///
/// A faulting episode is reported in [`Evaluation::faults`] with its agent
/// index and `generation`; the rest of the batch is unaffected.
pub fn evaluate_population<G, E>(population: &[G], evaluator: &E, generation: u64) -> Evaluation<G>
where
    G: Genotype,
    E: Evaluator<G>,
{
    #[cfg(feature = "parallel")]
    let outcomes: Vec<_> = population
        .par_iter()
        .map(|genotype| evaluator.evaluate(genotype))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<_> = population
        .iter()
        .map(|genotype| evaluator.evaluate(genotype))
        .collect();

    let mut scored = Vec::with_capacity(population.len());
    let mut faults = Vec::new();
    for (agent, (genotype, outcome)) in population.iter().zip(outcomes).enumerate() {
        match outcome {
            Ok(fitness) => scored.push(Phenotype {
                agent,
                genotype: genotype.clone(),
                fitness,
            }),
            Err(fault) => {
                let fault = AgentFault {
                    generation,
                    agent,
                    fault,
                };
                log::warn!("episode excluded from ranking: {fault}");
                faults.push(fault);
            }
        }
    }

    Evaluation { scored, faults }
}
