//! Lookup-table genomes.
//!
//! A [`Genome`] maps each of the `3^5 = 243` possible neighbourhoods (north,
//! east, south, west, centre; each empty, food or wall) to one of six
//! [`Action`]s. Its text form is the 243-digit string of action codes.

use crate::Genotype;
use crate::error::GenomeError;
use rand::Rng;
use rand::prelude::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of encodable neighbourhoods, and so the length of every genome.
pub const GENOME_LEN: usize = 243;

/// Actions that mutation may write. [`Action::Stay`] is deliberately absent.
pub const MUTATION_ALPHABET: [Action; 5] = [
    Action::North,
    Action::East,
    Action::South,
    Action::West,
    Action::Eat,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Action {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
    Stay = 4,
    Eat = 5,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::North,
        Action::East,
        Action::South,
        Action::West,
        Action::Stay,
        Action::Eat,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// `(row, col)` step for the four moves; `None` for stay and eat.
    pub fn offset(self) -> Option<(isize, isize)> {
        match self {
            Action::North => Some((-1, 0)),
            Action::East => Some((0, 1)),
            Action::South => Some((1, 0)),
            Action::West => Some((0, -1)),
            Action::Stay | Action::Eat => None,
        }
    }
}

/// A fixed-length action table.
///
/// Never modified in place: crossover and mutation return new genomes.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Genome(Box<[Action]>);

impl Genome {
    /// A founder genome drawn from the thread-local OS-seeded RNG, so founders
    /// are uncorrelated with any seeded world.
    pub fn random() -> Self {
        Self::random_with(&mut rand::rng())
    }

    /// Every symbol uniform over all six actions.
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Genome(
            (0..GENOME_LEN)
                .map(|_| Action::ALL[rng.random_range(0..Action::ALL.len())])
                .collect(),
        )
    }

    /// A genome that answers every neighbourhood with `action`.
    pub fn uniform(action: Action) -> Self {
        Genome(vec![action; GENOME_LEN].into_boxed_slice())
    }

    pub fn from_actions(actions: Vec<Action>) -> Result<Self, GenomeError> {
        if actions.len() != GENOME_LEN {
            return Err(GenomeError::LengthMismatch {
                found: actions.len(),
            });
        }
        Ok(Genome(actions.into_boxed_slice()))
    }

    pub fn from_codes(codes: &[u8]) -> Result<Self, GenomeError> {
        if codes.len() != GENOME_LEN {
            return Err(GenomeError::LengthMismatch { found: codes.len() });
        }
        codes
            .iter()
            .enumerate()
            .map(|(position, &code)| {
                Action::from_code(code).ok_or(GenomeError::InvalidSymbol {
                    position,
                    symbol: char::from_digit(code as u32, 36).unwrap_or('?'),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|actions| Genome(actions.into_boxed_slice()))
    }

    /// Action for an encoded neighbourhood.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below [`GENOME_LEN`]. Every encoded
    /// neighbourhood is.
    pub fn decode(&self, index: usize) -> Action {
        self.0[index]
    }

    pub fn actions(&self) -> &[Action] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Single-point crossover: the first `point` actions from `self`, the rest
    /// from `other`. `point` is clamped to the genome length.
    pub fn crossover_at(&self, other: &Genome, point: usize) -> Genome {
        let point = point.min(GENOME_LEN);
        let mut child = self.0[..point].to_vec();
        child.extend_from_slice(&other.0[point..]);
        Genome(child.into_boxed_slice())
    }

    /// Overwrites a uniform `0..=max_mutations` number of random positions with
    /// actions from [`MUTATION_ALPHABET`]. Positions may repeat.
    pub fn mutated<R: Rng + ?Sized>(&self, rng: &mut R, max_mutations: usize) -> Genome {
        let count = rng.random_range(0..=max_mutations);
        let mut child = self.0.to_vec();
        for _ in 0..count {
            let position = rng.random_range(0..GENOME_LEN);
            if let Some(action) = MUTATION_ALPHABET.choose(rng) {
                child[position] = *action;
            }
        }
        Genome(child.into_boxed_slice())
    }

    /// Number of positions at which the two genomes disagree.
    pub fn hamming(&self, other: &Genome) -> usize {
        self.0.iter().zip(other.0.iter()).filter(|(a, b)| a != b).count()
    }
}

impl Genotype for Genome {
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let point = rng.random_range(0..GENOME_LEN);
        self.crossover_at(other, point)
    }

    fn mutate<R: Rng>(&self, rng: &mut R, max_mutations: usize) -> Self {
        self.mutated(rng, max_mutations)
    }

    fn distance(&self, other: &Self) -> f32 {
        self.hamming(other) as f32
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for action in self.0.iter() {
            write!(f, "{}", action.code())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Genome({self})")
    }
}

impl FromStr for Genome {
    type Err = GenomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let count = s.chars().count();
        if count != GENOME_LEN {
            return Err(GenomeError::LengthMismatch { found: count });
        }
        s.chars()
            .enumerate()
            .map(|(position, symbol)| {
                symbol
                    .to_digit(10)
                    .and_then(|d| Action::from_code(d as u8))
                    .ok_or(GenomeError::InvalidSymbol { position, symbol })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|actions| Genome(actions.into_boxed_slice()))
    }
}

impl TryFrom<String> for Genome {
    type Error = GenomeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Genome> for String {
    fn from(genome: Genome) -> Self {
        genome.to_string()
    }
}
