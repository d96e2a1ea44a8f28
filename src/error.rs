//! Error taxonomy for the evolutionary core.
//!
//! Only algorithmic failures live here. File and console faults belong to the
//! [`persistence`](crate::persistence) layer and its own error type.

use thiserror::Error;

/// Errors raised when building a [`Genome`](crate::genome::Genome) from raw symbols.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenomeError {
    #[error("genome has {found} symbols, expected {expected}", expected = crate::genome::GENOME_LEN)]
    LengthMismatch { found: usize },
    #[error("symbol {symbol:?} at position {position} is not an action in 0..=5")]
    InvalidSymbol { position: usize, symbol: char },
}

/// A condition that stopped a single episode.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EpisodeFault {
    #[error("agent observed or moved outside the grid at ({row}, {col}) on turn {turn}")]
    OutOfBounds { turn: usize, row: isize, col: isize },
}

/// An [`EpisodeFault`] tagged with enough context to reproduce it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("generation {generation}, agent {agent}: {fault}")]
pub struct AgentFault {
    pub generation: u64,
    pub agent: usize,
    #[source]
    pub fault: EpisodeFault,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GaError {
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("genome of agent {agent} has {found} symbols, expected {expected}")]
    GenomeLengthMismatch {
        agent: usize,
        found: usize,
        expected: usize,
    },

    #[error(transparent)]
    InvalidGenome(#[from] GenomeError),

    #[error("generation {generation}: reproduction produced {produced} of {needed} agents")]
    PopulationUnderflow {
        generation: u64,
        produced: usize,
        needed: usize,
    },

    #[error(transparent)]
    EpisodeExecutionFault(#[from] AgentFault),
}

impl GaError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}
