//! forage - CLI entry point
//!
//! Evolves grid-foraging agents and replays the best of them.

use clap::{Parser, Subcommand};
use forage_genetics::persistence::{self, Checkpoint, ScoreLog};
use forage_genetics::{EvolutionConfig, ForagingGa, Genome};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "forage")]
#[command(version)]
#[command(about = "Evolves lookup-table foragers on a bordered grid world")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "forage.yaml")]
        output: PathBuf,
    },

    /// Evolve a population, checkpointing after every generation
    Run {
        /// Configuration file (YAML); defaults are used when absent
        #[arg(short, long, default_value = "forage.yaml")]
        config: PathBuf,

        /// Checkpoint file written after each generation
        #[arg(long, default_value = "forage.ckpt")]
        checkpoint: PathBuf,

        /// Continue from the checkpoint instead of starting over
        #[arg(long)]
        resume: bool,

        /// Per-generation CSV score log
        #[arg(short, long, default_value = "scores.csv")]
        log: PathBuf,

        /// Stop after this many generations (runs until Ctrl-C otherwise)
        #[arg(short, long)]
        generations: Option<u64>,
    },

    /// Replay one agent of a checkpoint turn by turn
    Replay {
        /// Checkpoint file to read
        #[arg(long, default_value = "forage.ckpt")]
        checkpoint: PathBuf,

        /// Agent index within the saved population (0 is the best elite)
        #[arg(short, long, default_value = "0")]
        agent: usize,

        /// Explicit genome (243 digits) to replay instead of a saved agent
        #[arg(long)]
        genome: Option<String>,

        /// Pause between turns, in milliseconds
        #[arg(long, default_value = "200")]
        delay_ms: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { output } => {
            persistence::save_config(&EvolutionConfig::default(), &output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Run {
            config,
            checkpoint,
            resume,
            log,
            generations,
        } => run(&config, &checkpoint, resume, &log, generations)?,
        Commands::Replay {
            checkpoint,
            agent,
            genome,
            delay_ms,
        } => replay(&checkpoint, agent, genome, delay_ms)?,
    }
    Ok(())
}

fn run(
    config_path: &Path,
    checkpoint_path: &Path,
    resume: bool,
    log_path: &Path,
    generations: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let mut ga = if resume {
        let saved = Checkpoint::load(checkpoint_path)?;
        log::info!(
            "resuming from {} at generation {}",
            checkpoint_path.display(),
            saved.state.generation
        );
        ForagingGa::resume(saved.config, saved.state)?
    } else {
        let config = if config_path.exists() {
            persistence::load_config(config_path)?
        } else {
            log::info!("{} not found, using defaults", config_path.display());
            EvolutionConfig::default()
        };
        ForagingGa::new(config)?
    };
    log::info!(
        "world seed={} size={} food={}",
        ga.world().seed(),
        ga.world().size(),
        ga.world().food_count()
    );

    let mut score_log = ScoreLog::open(log_path)?;
    let config = ga.config().clone();
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            log::info!("interrupt received, stopping after the current generation");
            cancel.store(true, Ordering::Relaxed);
        })?;
    }

    let mut io_failure = None;
    let completed = ga.run_until(&cancel, generations, |report, state| {
        let saved =
            persistence::record_generation(checkpoint_path, &mut score_log, &config, report, state);
        if let Err(e) = saved {
            log::error!("stopping after generation {}: {e}", report.generation);
            io_failure = Some(e);
            cancel.store(true, Ordering::Relaxed);
        }
    })?;
    log::info!(
        "{completed} generations completed, next is {}",
        ga.state().generation
    );

    match io_failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn replay(
    checkpoint_path: &Path,
    agent: usize,
    genome: Option<String>,
    delay_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let saved = Checkpoint::load(checkpoint_path)?;
    let genome: Genome = match genome {
        Some(text) => text.parse()?,
        None => saved
            .state
            .population
            .get(agent)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "no agent {agent} in a population of {}",
                    saved.state.population.len()
                )
            })?,
    };
    let ga = ForagingGa::resume(saved.config, saved.state)?;

    let mut episode = ga.task().episode(&genome);
    println!("{episode}");
    for _ in 0..ga.config().turns_per_episode {
        episode.step()?;
        thread::sleep(Duration::from_millis(delay_ms));
        println!("{episode}");
    }
    println!("Final score {:.1}", episode.score());
    Ok(())
}
