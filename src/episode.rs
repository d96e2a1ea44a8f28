//! Episode simulation: one genome foraging in one world for a fixed number of
//! turns.
//!
//! Each turn the agent observes north, east, south, west and its own cell,
//! encodes them as a base-3 number (north most significant) and performs the
//! action its genome stores at that index:
//!
//! - moves bump into walls for `-penalty` and stay put, otherwise move;
//! - stay does nothing;
//! - eat on food scores `+reward` and empties the cell, eat on an empty cell
//!   costs `-penalty`.
//!
//! An [`Episode`] owns its world, so food eaten in one episode never affects
//! another.

use crate::error::{EpisodeFault, GaError};
use crate::genome::{Action, Genome};
use crate::world::{Cell, Position, World};
use crate::Evaluator;
use rand::Rng;
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score magnitudes for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scoring {
    /// Gained per food eaten
    pub reward: f64,
    /// Lost per wall bump or eat on an empty cell
    pub penalty: f64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            reward: 1.0,
            penalty: 0.1,
        }
    }
}

impl Scoring {
    pub fn validate(&self) -> Result<(), GaError> {
        if !(self.reward.is_finite() && self.reward >= 0.0) {
            return Err(GaError::config(
                "scoring.reward",
                format!("must be finite and >= 0, got {}", self.reward),
            ));
        }
        if !(self.penalty.is_finite() && self.penalty >= 0.0) {
            return Err(GaError::config(
                "scoring.penalty",
                format!("must be finite and >= 0, got {}", self.penalty),
            ));
        }
        Ok(())
    }
}

/// Start cell for every episode run in `world`.
///
/// Uniform over the interior, drawn from a generator seeded with the world's
/// seed, so all agents evaluated against one world start in the same place.
pub fn start_position(world: &World) -> Position {
    let mut rng = Pcg64::seed_from_u64(world.seed());
    let row = rng.random_range(1..=world.size());
    let col = rng.random_range(1..=world.size());
    Position::new(row, col)
}

/// Base-3 index of a `[north, east, south, west, centre]` observation.
pub fn encode_neighborhood(cells: [Cell; 5]) -> usize {
    cells.iter().fold(0, |acc, cell| acc * 3 + cell.digit())
}

/// Result of a finished episode.
#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub score: f64,
    pub position: Position,
    /// The episode's private world after all food it consumed was removed.
    pub world: World,
}

/// Running state of a single episode.
#[derive(Debug, Clone)]
pub struct Episode<'g> {
    genome: &'g Genome,
    world: World,
    scoring: Scoring,
    position: Position,
    score: f64,
    turn: usize,
}

impl<'g> Episode<'g> {
    /// Starts an episode on `world`, which the episode takes ownership of.
    pub fn new(genome: &'g Genome, world: World, scoring: Scoring) -> Self {
        let position = start_position(&world);
        Self {
            genome,
            world,
            scoring,
            position,
            score: 0.0,
            turn: 0,
        }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    fn observe(&self) -> Result<[Cell; 5], EpisodeFault> {
        let (row, col) = (self.position.row as isize, self.position.col as isize);
        let around = [(-1, 0), (0, 1), (1, 0), (0, -1), (0, 0)];
        let mut cells = [Cell::Empty; 5];
        for (slot, (dr, dc)) in cells.iter_mut().zip(around) {
            *slot = self
                .world
                .cell(row + dr, col + dc)
                .ok_or(EpisodeFault::OutOfBounds {
                    turn: self.turn,
                    row: row + dr,
                    col: col + dc,
                })?;
        }
        Ok(cells)
    }

    /// Plays one turn and returns the action taken.
    pub fn step(&mut self) -> Result<Action, EpisodeFault> {
        let around = self.observe()?;
        let action = self.genome.decode(encode_neighborhood(around));

        match action {
            Action::North | Action::East | Action::South | Action::West => {
                if let Some((dr, dc)) = action.offset() {
                    let row = self.position.row as isize + dr;
                    let col = self.position.col as isize + dc;
                    match self.world.cell(row, col) {
                        Some(Cell::Wall) => self.score -= self.scoring.penalty,
                        Some(_) => self.position = Position::new(row as usize, col as usize),
                        None => {
                            return Err(EpisodeFault::OutOfBounds {
                                turn: self.turn,
                                row,
                                col,
                            });
                        }
                    }
                }
            }
            Action::Stay => {}
            Action::Eat => match around[4] {
                Cell::Food => {
                    self.world.take_food(self.position);
                    self.score += self.scoring.reward;
                }
                Cell::Empty => self.score -= self.scoring.penalty,
                Cell::Wall => {}
            },
        }

        self.turn += 1;
        Ok(action)
    }

    /// Plays `turns` turns and returns the final state.
    pub fn run(mut self, turns: usize) -> Result<EpisodeOutcome, EpisodeFault> {
        for _ in 0..turns {
            self.step()?;
        }
        Ok(EpisodeOutcome {
            score: self.score,
            position: self.position,
            world: self.world,
        })
    }
}

impl fmt::Display for Episode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Turn {} Score {:.1}", self.turn, self.score)?;
        self.world.render(f, Some(self.position))
    }
}

/// The foraging problem: every genome runs for `turns` turns on its own copy
/// of `world`.
#[derive(Debug, Clone)]
pub struct ForagingTask {
    pub world: World,
    pub turns: usize,
    pub scoring: Scoring,
}

impl ForagingTask {
    pub fn new(world: World, turns: usize, scoring: Scoring) -> Self {
        Self {
            world,
            turns,
            scoring,
        }
    }

    pub fn episode<'g>(&self, genome: &'g Genome) -> Episode<'g> {
        Episode::new(genome, self.world.clone(), self.scoring)
    }
}

impl Evaluator<Genome> for ForagingTask {
    fn evaluate(&self, genotype: &Genome) -> Result<f64, EpisodeFault> {
        self.episode(genotype).run(self.turns).map(|outcome| outcome.score)
    }
}
