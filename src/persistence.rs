//! Files around a run: YAML configuration, binary checkpoints and the CSV
//! score log.
//!
//! Nothing in the evolutionary core depends on this module; it only snapshots
//! [`GenerationState`] between steps and records [`GenerationReport`]s.

use crate::config::EvolutionConfig;
use crate::error::GaError;
use crate::evolution::{GenerationReport, GenerationState};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"FRGA";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("score log error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("invalid contents: {0}")]
    Invalid(#[from] GaError),
}

/// Reads and validates a YAML config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EvolutionConfig, PersistenceError> {
    let contents = fs::read_to_string(path)?;
    let config: EvolutionConfig = serde_yaml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(
    config: &EvolutionConfig,
    path: P,
) -> Result<(), PersistenceError> {
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml)?;
    Ok(())
}

/// Everything needed to resume a run exactly where it stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Version for compatibility checking
    pub version: u32,
    pub config: EvolutionConfig,
    pub state: GenerationState,
}

impl Checkpoint {
    /// Current checkpoint version
    pub const VERSION: u32 = 1;

    pub fn new(config: EvolutionConfig, state: GenerationState) -> Self {
        Self {
            version: Self::VERSION,
            config,
            state,
        }
    }

    /// Writes to a sibling temp file first and renames it over `path`, so an
    /// interrupted save leaves the previous checkpoint intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(MAGIC)?;
            bincode::serialize_into(&mut writer, self)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PersistenceError::InvalidFormat(
                "invalid magic bytes".to_string(),
            ));
        }

        let checkpoint: Checkpoint = bincode::deserialize_from(reader)?;
        if checkpoint.version != Self::VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::VERSION,
                found: checkpoint.version,
            });
        }
        checkpoint.config.validate()?;
        checkpoint.state.check_population()?;
        Ok(checkpoint)
    }
}

/// One CSV row: the generation's statistics and the parameters it ran under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub generation: u64,
    pub current_best: Option<f64>,
    pub all_time_best: Option<f64>,
    pub mean_fitness: Option<f64>,
    pub diversity: f32,
    pub evaluated: usize,
    pub faults: usize,
    pub seed: u64,
    pub board_size: usize,
    pub food_density: f64,
    pub population_size: usize,
    pub turns_per_episode: usize,
    pub mutation_rate_cap: f64,
    pub elite_fraction: f64,
    pub inequity_factor: f64,
    pub child_fraction_per_couple: f64,
}

impl ScoreRow {
    pub fn new(report: &GenerationReport, config: &EvolutionConfig) -> Self {
        Self {
            generation: report.generation,
            current_best: report.current_best,
            all_time_best: report.all_time_best,
            mean_fitness: report.mean_fitness,
            diversity: report.diversity,
            evaluated: report.evaluated,
            faults: report.faults,
            seed: config.seed,
            board_size: config.board_size,
            food_density: config.food_density,
            population_size: config.population_size,
            turns_per_episode: config.turns_per_episode,
            mutation_rate_cap: config.mutation_rate_cap,
            elite_fraction: config.elite_fraction,
            inequity_factor: config.inequity_factor,
            child_fraction_per_couple: config.child_fraction_per_couple,
        }
    }
}

/// Append-only per-generation CSV log.
pub struct ScoreLog {
    writer: csv::Writer<File>,
}

impl ScoreLog {
    /// Opens `path` for appending; the header is written only to a new or
    /// empty file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(fresh)
            .from_writer(file);
        Ok(Self { writer })
    }

    pub fn append(
        &mut self,
        report: &GenerationReport,
        config: &EvolutionConfig,
    ) -> Result<(), PersistenceError> {
        self.writer.serialize(ScoreRow::new(report, config))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Saves the checkpoint for `state`, then appends `report` to `log`.
///
/// An interruption between the two writes leaves the log one row behind the
/// checkpoint, never ahead of it, so a resumed run never logs a generation
/// twice.
pub fn record_generation<P: AsRef<Path>>(
    checkpoint_path: P,
    log: &mut ScoreLog,
    config: &EvolutionConfig,
    report: &GenerationReport,
    state: &GenerationState,
) -> Result<(), PersistenceError> {
    Checkpoint::new(config.clone(), state.clone()).save(checkpoint_path)?;
    log.append(report, config)
}

/// Reads every row of a score log.
pub fn read_score_log<P: AsRef<Path>>(path: P) -> Result<Vec<ScoreRow>, PersistenceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<ScoreRow>, _>>()?;
    Ok(rows)
}
