use rand::Rng;
use serde::{Deserialize, Serialize};

/// The 'DNA' of an individual.
/// Defined by how it changes, not what it does.
pub trait Genotype: Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// A new child: a prefix of `self` joined to the suffix of `other`.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// A copy with up to `max_mutations` point mutations applied.
    fn mutate<R: Rng>(&self, rng: &mut R, max_mutations: usize) -> Self;

    /// Distance metric for diversity tracking.
    fn distance(&self, other: &Self) -> f32;
}

/// An evaluated individual: one Episode Result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "G: Genotype")]
pub struct Phenotype<G: Genotype> {
    /// Index of the agent in the population it was evaluated from.
    pub agent: usize,
    pub genotype: G,
    pub fitness: f64,
}

/// Turns DNA into behaviour and scores it.
pub trait Evaluator<G: Genotype>: Send + Sync {
    /// Runs one independent evaluation of `genotype`.
    fn evaluate(&self, genotype: &G) -> Result<f64, error::EpisodeFault>;
}

/// The master engine trait.
pub trait Evolver<G: Genotype> {
    /// Advances one generation: evaluate, select, reproduce.
    fn step(&mut self) -> Result<evolution::GenerationReport, error::GaError>;
    fn population(&self) -> &[G];
}

pub mod algorithms {
    pub mod weighted;
}
pub mod config;
pub mod episode;
pub mod error;
pub mod evaluation;
pub mod evolution;
pub mod genome;
pub mod persistence;
pub mod world;

pub use config::EvolutionConfig;
pub use episode::{Episode, EpisodeOutcome, ForagingTask, Scoring};
pub use error::{AgentFault, EpisodeFault, GaError, GenomeError};
pub use evolution::{ForagingGa, GenerationReport, GenerationState};
pub use genome::{Action, GENOME_LEN, Genome};
pub use world::{Cell, Position, World};
