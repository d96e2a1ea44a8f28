use forage_genetics::{EvolutionConfig, Evolver, ForagingGa};

fn main() {
    let config = EvolutionConfig {
        board_size: 8,
        population_size: 60,
        turns_per_episode: 120,
        elite_fraction: 0.05,
        inequity_factor: 2.0,
        breeding_seed: Some(42),
        ..EvolutionConfig::default()
    };
    let mut ga = ForagingGa::new(config).expect("default-derived config is valid");
    let food = ga.world().food_count();
    println!("World with {food} food cells:\n{}", ga.world());

    for generation in 0..300 {
        let report = ga.step().expect("generation failed");

        if generation % 25 == 0 {
            println!(
                "Gen {}: best {:.1} (all-time {:.1}, mean {:.2}, diversity {:.1})",
                report.generation,
                report.current_best.unwrap_or(f64::NAN),
                report.all_time_best.unwrap_or(f64::NAN),
                report.mean_fitness.unwrap_or(f64::NAN),
                report.diversity,
            );
        }

        if report.current_best == Some(food as f64) {
            println!("🎯 Every food cell eaten at Gen {}!", report.generation);
            break;
        }
    }

    let best = &ga.population()[0];
    let mut episode = ga.task().episode(best);
    for _ in 0..ga.config().turns_per_episode {
        if episode.step().is_err() {
            break;
        }
    }
    println!("Best agent after its episode:\n{episode}");
    println!("Genome: {best}");
}
