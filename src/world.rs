//! Bordered square grid worlds.
//!
//! A world of size `N` is stored as an `(N + 2) × (N + 2)` row-major grid: the
//! `N × N` interior holds [`Cell::Empty`] or [`Cell::Food`], and a one-cell ring of
//! [`Cell::Wall`] surrounds it. Generation is a pure function of
//! `(seed, size, food_density)`.

use crate::error::GaError;
use rand::distr::{Bernoulli, Distribution};
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tri-state content of a grid cell.
///
/// The discriminants are the base-3 digits used to encode a neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cell {
    Empty = 0,
    Food = 1,
    Wall = 2,
}

impl Cell {
    pub fn digit(self) -> usize {
        self as usize
    }

    fn glyph(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Food => '.',
            Cell::Wall => '#',
        }
    }
}

/// A `(row, col)` coordinate in the bordered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

#[derive(Serialize, Deserialize)]
struct WorldData {
    seed: u64,
    size: usize,
    food_density: f64,
    cells: Vec<Cell>,
}

/// A generated grid world.
///
/// Cells are private so the wall ring cannot be broken from outside; episodes
/// consume food through [`World::take_food`] on their own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    seed: u64,
    size: usize,
    food_density: f64,
    cells: Vec<Cell>,
}

impl World {
    /// Builds the world for `(seed, size, food_density)`.
    ///
    /// Interior cells are independent Bernoulli draws (food with probability
    /// `food_density`) from a [`Pcg64`] seeded with `seed`, laid out row-major.
    pub fn generate(seed: u64, size: usize, food_density: f64) -> Result<Self, GaError> {
        if size < 1 {
            return Err(GaError::config("board_size", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&food_density) {
            return Err(GaError::config(
                "food_density",
                format!("must be within [0, 1], got {food_density}"),
            ));
        }
        let food = Bernoulli::new(food_density)
            .map_err(|e| GaError::config("food_density", e.to_string()))?;
        let mut rng = Pcg64::seed_from_u64(seed);

        let side = size + 2;
        let mut cells = vec![Cell::Wall; side * side];
        for row in 1..=size {
            for col in 1..=size {
                if food.sample(&mut rng) {
                    cells[row * side + col] = Cell::Food;
                } else {
                    cells[row * side + col] = Cell::Empty;
                }
            }
        }

        log::debug!("generated world seed={seed} size={size} food_density={food_density}");
        Ok(Self {
            seed,
            size,
            food_density,
            cells,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Interior side length `N`.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn food_density(&self) -> f64 {
        self.food_density
    }

    /// Side length of the bordered grid, `N + 2`.
    pub fn side(&self) -> usize {
        self.size + 2
    }

    /// The cell at `(row, col)`, or `None` outside the bordered grid.
    pub fn cell(&self, row: isize, col: isize) -> Option<Cell> {
        let side = self.side() as isize;
        if row < 0 || col < 0 || row >= side || col >= side {
            return None;
        }
        self.cells.get(row as usize * self.side() + col as usize).copied()
    }

    pub fn cell_at(&self, pos: Position) -> Option<Cell> {
        self.cell(pos.row as isize, pos.col as isize)
    }

    /// Replaces food at `pos` with an empty cell. Returns whether food was there.
    pub fn take_food(&mut self, pos: Position) -> bool {
        if pos.row >= self.side() || pos.col >= self.side() {
            return false;
        }
        let idx = pos.row * self.side() + pos.col;
        if self.cells[idx] == Cell::Food {
            self.cells[idx] = Cell::Empty;
            true
        } else {
            false
        }
    }

    pub fn food_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Food).count()
    }

    /// Rows of the bordered grid, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.side())
    }

    /// Writes the grid, marking `agent` with `X`.
    pub fn render(&self, f: &mut impl fmt::Write, agent: Option<Position>) -> fmt::Result {
        for (row, cells) in self.rows().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let glyph = match agent {
                    Some(p) if p.row == row && p.col == col => 'X',
                    _ => cell.glyph(),
                };
                write!(f, "{glyph} ")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

    fn check_layout(&self) -> Result<(), String> {
        let side = self.side();
        if self.cells.len() != side * side {
            return Err(format!(
                "expected {} cells for size {}, found {}",
                side * side,
                self.size,
                self.cells.len()
            ));
        }
        for (idx, cell) in self.cells.iter().enumerate() {
            let (row, col) = (idx / side, idx % side);
            let border = row == 0 || col == 0 || row == side - 1 || col == side - 1;
            if border != (*cell == Cell::Wall) {
                return Err(format!("cell ({row}, {col}) breaks the wall border"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, None)
    }
}

impl Serialize for World {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("World", 4)?;
        state.serialize_field("seed", &self.seed)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("food_density", &self.food_density)?;
        state.serialize_field("cells", &self.cells)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for World {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = WorldData::deserialize(deserializer)?;
        let world = World {
            seed: data.seed,
            size: data.size,
            food_density: data.food_density,
            cells: data.cells,
        };
        world.check_layout().map_err(serde::de::Error::custom)?;
        Ok(world)
    }
}
