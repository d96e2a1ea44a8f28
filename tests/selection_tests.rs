use forage_genetics::algorithms::weighted::{
    ReproductionParams, UnderflowPolicy, couple_size, elite_count, next_generation, rank,
    sample_parent_pool, selection_weights,
};
use forage_genetics::{Action, GaError, Genome, Genotype, Phenotype};
use rand::Rng;
use rand::prelude::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// --- Mock Infrastructure ---

/// Tracks lineage: `id` of the first parent, `partner` of the second, and
/// whether it was bred at all.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
struct TestDNA {
    id: usize,
    partner: Option<usize>,
    bred: bool,
}

impl TestDNA {
    fn founder(id: usize) -> Self {
        Self {
            id,
            partner: None,
            bred: false,
        }
    }
}

impl Genotype for TestDNA {
    fn crossover<R: Rng>(&self, other: &Self, _rng: &mut R) -> Self {
        TestDNA {
            id: self.id,
            partner: Some(other.id),
            bred: true,
        }
    }
    fn mutate<R: Rng>(&self, _rng: &mut R, _max_mutations: usize) -> Self {
        self.clone()
    }
    fn distance(&self, other: &Self) -> f32 {
        (self.id as f32 - other.id as f32).abs()
    }
}

fn scored(fitness: &[f64]) -> Vec<Phenotype<TestDNA>> {
    fitness
        .iter()
        .enumerate()
        .map(|(agent, &fitness)| Phenotype {
            agent,
            genotype: TestDNA::founder(agent),
            fitness,
        })
        .collect()
}

fn params(pop_size: usize) -> ReproductionParams {
    ReproductionParams {
        pop_size,
        elite_fraction: 0.0,
        inequity_factor: 1.0,
        child_fraction_per_couple: 0.2,
        max_mutations: 0,
        underflow: UnderflowPolicy::Fail,
    }
}

// ============================================================================
// Ranking and weights
// ============================================================================

#[test]
fn test_rank_is_descending_and_stable() {
    let ranked = rank(scored(&[1.0, 3.0, 1.0, 3.0, 2.0]));
    let order: Vec<usize> = ranked.iter().map(|p| p.agent).collect();
    assert_eq!(order, vec![1, 3, 4, 0, 2]);
}

#[test]
fn test_rank_puts_nan_last() {
    let ranked = rank(scored(&[f64::NAN, -5.0, 2.0]));
    let order: Vec<usize> = ranked.iter().map(|p| p.agent).collect();
    assert_eq!(order, vec![2, 1, 0]);
}

#[test]
fn test_weights_follow_the_rounding_formula() {
    let ranked = rank(scored(&[3.0, 1.0, 1.0]));
    assert_eq!(selection_weights(&ranked, 2.0), vec![5, 1, 1]);
    assert_eq!(selection_weights(&ranked, 0.0), vec![1, 1, 1]);

    // 0.25 * 2 = 0.5 rounds half away from zero
    let ranked = rank(scored(&[0.25, 0.0]));
    assert_eq!(selection_weights(&ranked, 2.0), vec![2, 1]);

    let ranked = rank(scored(&[-0.3, -1.0]));
    assert_eq!(selection_weights(&ranked, 10.0), vec![8, 1]);
}

#[test]
fn test_weights_are_at_least_one_for_any_inequity() {
    let mut rng = Pcg64::seed_from_u64(1);
    for inequity in [0.0, 0.01, 1.0, 37.5, 1e12, 1e300] {
        let fitness: Vec<f64> = (0..30).map(|_| rng.random_range(-50.0..50.0)).collect();
        let ranked = rank(scored(&fitness));
        let weights = selection_weights(&ranked, inequity);
        assert!(weights.iter().all(|&w| w >= 1), "inequity {inequity}");
        assert_eq!(*weights.last().unwrap(), 1);
    }
    let ranked = rank(scored(&[f64::NAN, 1.0]));
    assert!(selection_weights(&ranked, 5.0).iter().all(|&w| w >= 1));
}

#[test]
fn test_elite_and_couple_sizes() {
    assert_eq!(elite_count(0.25, 4), 1);
    assert_eq!(elite_count(0.0, 10), 0);
    assert_eq!(elite_count(1.0, 7), 7);
    assert_eq!(elite_count(0.1, 10), 1);

    assert_eq!(couple_size(1.0, 5), 6);
    assert_eq!(couple_size(0.2, 10), 3);
    assert_eq!(couple_size(0.01, 10), 1);
}

// ============================================================================
// Parent pool
// ============================================================================

#[test]
fn test_parent_pool_respects_multiplicities() {
    let mut rng = Pcg64::seed_from_u64(2);
    for _ in 0..50 {
        let pool = sample_parent_pool(&[3, 1, 2], 100, &mut rng);
        assert_eq!(pool.len(), 6);
        let count = |i| pool.iter().filter(|&&p| p == i).count();
        assert_eq!((count(0), count(1), count(2)), (3, 1, 2));
    }
}

#[test]
fn test_parent_pool_stops_at_requested_size() {
    let mut rng = Pcg64::seed_from_u64(3);
    let pool = sample_parent_pool(&[10, 10, 10], 4, &mut rng);
    assert_eq!(pool.len(), 4);
    assert!(pool.iter().all(|&i| i < 3));
}

#[test]
fn test_parent_pool_favours_heavier_candidates() {
    let mut rng = Pcg64::seed_from_u64(4);
    let mut firsts = [0usize; 2];
    for _ in 0..2000 {
        let pool = sample_parent_pool(&[9, 1], 1, &mut rng);
        firsts[pool[0]] += 1;
    }
    assert!(firsts[0] > firsts[1] * 4, "{firsts:?}");
}

// ============================================================================
// Next generation
// ============================================================================

#[test]
fn test_next_generation_always_has_pop_size_agents() {
    let mut rng = Pcg64::seed_from_u64(5);
    for pop_size in [1, 2, 3, 5, 10, 33] {
        for elite_fraction in [0.0, 0.1, 0.5, 1.0] {
            for child_fraction in [0.01, 0.3, 1.0] {
                let fitness: Vec<f64> =
                    (0..pop_size).map(|_| rng.random_range(-5.0..5.0)).collect();
                let p = ReproductionParams {
                    elite_fraction,
                    child_fraction_per_couple: child_fraction,
                    underflow: UnderflowPolicy::Resample,
                    ..params(pop_size)
                };
                let next = next_generation(scored(&fitness), &p, 0, &mut rng).unwrap();
                assert_eq!(next.len(), pop_size);
            }
        }
    }
}

#[test]
fn test_single_agent_population() {
    let mut rng = Pcg64::seed_from_u64(6);
    let next = next_generation(scored(&[4.0]), &params(1), 0, &mut rng).unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, 0);
    assert_eq!(next[0].partner, Some(0), "sole parent mates with itself");
}

#[test]
fn test_quarter_elite_fraction_keeps_exactly_one_elite() {
    let mut rng = Pcg64::seed_from_u64(7);
    let p = ReproductionParams {
        elite_fraction: 0.25,
        ..params(4)
    };
    let next = next_generation(scored(&[1.0, 9.0, 4.0, 2.0]), &p, 0, &mut rng).unwrap();
    assert_eq!(next.len(), 4);

    let elites: Vec<&TestDNA> = next.iter().filter(|g| !g.bred).collect();
    assert_eq!(elites.len(), 1);
    assert_eq!(*elites[0], TestDNA::founder(1));
    assert_eq!(next[0], TestDNA::founder(1), "elites lead the new generation");
}

#[test]
fn test_full_child_fraction_fills_generation_with_one_couple() {
    let mut rng = Pcg64::seed_from_u64(8);
    let p = ReproductionParams {
        child_fraction_per_couple: 1.0,
        ..params(5)
    };
    for _ in 0..20 {
        let next = next_generation(scored(&[0.0; 5]), &p, 0, &mut rng).unwrap();
        assert_eq!(next.len(), 5);
        let couples: HashSet<(usize, Option<usize>)> =
            next.iter().map(|g| (g.id, g.partner)).collect();
        assert_eq!(couples.len(), 1, "{next:?}");
    }
}

#[test]
fn test_small_child_fraction_uses_several_couples() {
    let mut rng = Pcg64::seed_from_u64(9);
    let p = ReproductionParams {
        child_fraction_per_couple: 0.1,
        ..params(5)
    };
    let next = next_generation(scored(&[0.0; 5]), &p, 0, &mut rng).unwrap();
    // equal weights make the pool five distinct agents
    let first_parents: HashSet<usize> = next.iter().map(|g| g.id).collect();
    assert!(first_parents.len() >= 2, "{next:?}");
}

#[test]
fn test_partner_is_another_pool_member() {
    let mut rng = Pcg64::seed_from_u64(10);
    // broods of 3, 2 and 1: the pool never shrinks to a single member
    let p = ReproductionParams {
        child_fraction_per_couple: 0.3,
        ..params(6)
    };
    for _ in 0..20 {
        let next = next_generation(scored(&[0.0; 6]), &p, 0, &mut rng).unwrap();
        for child in &next {
            assert_ne!(Some(child.id), child.partner);
        }
    }
}

// ============================================================================
// Underflow boundary
// ============================================================================

#[test]
fn test_exhausted_pool_fails_under_fail_policy() {
    let mut rng = Pcg64::seed_from_u64(11);
    let p = ReproductionParams {
        child_fraction_per_couple: 0.01,
        ..params(10)
    };
    // two equal candidates: pool of 2, one child per couple
    let result = next_generation(scored(&[1.0, 1.0]), &p, 17, &mut rng);
    assert_eq!(
        result,
        Err(GaError::PopulationUnderflow {
            generation: 17,
            produced: 2,
            needed: 10
        })
    );
}

#[test]
fn test_exhausted_pool_is_refilled_under_resample_policy() {
    let mut rng = Pcg64::seed_from_u64(12);
    let p = ReproductionParams {
        child_fraction_per_couple: 0.01,
        underflow: UnderflowPolicy::Resample,
        ..params(10)
    };
    let next = next_generation(scored(&[1.0, 1.0]), &p, 0, &mut rng).unwrap();
    assert_eq!(next.len(), 10);
    assert!(next.iter().all(|g| g.bred && g.id < 2));
}

#[test]
fn test_empty_ranking_always_underflows() {
    let mut rng = Pcg64::seed_from_u64(13);
    for underflow in [UnderflowPolicy::Fail, UnderflowPolicy::Resample] {
        let p = ReproductionParams {
            underflow,
            ..params(3)
        };
        let result = next_generation(Vec::<Phenotype<TestDNA>>::new(), &p, 4, &mut rng);
        assert_eq!(
            result,
            Err(GaError::PopulationUnderflow {
                generation: 4,
                produced: 0,
                needed: 3
            })
        );
    }
}

#[test]
fn test_elites_capped_by_surviving_agents() {
    let mut rng = Pcg64::seed_from_u64(14);
    let p = ReproductionParams {
        elite_fraction: 1.0,
        underflow: UnderflowPolicy::Resample,
        ..params(6)
    };
    let next = next_generation(scored(&[3.0, 2.0]), &p, 0, &mut rng).unwrap();
    assert_eq!(next.len(), 6);
    assert_eq!(next.iter().filter(|g| !g.bred).count(), 2);
}

// ============================================================================
// With real genomes
// ============================================================================

#[test]
fn test_genome_elites_survive_unchanged() {
    let mut rng = Pcg64::seed_from_u64(15);
    let best = Genome::uniform(Action::Eat);
    let results = vec![
        Phenotype {
            agent: 0,
            genotype: Genome::uniform(Action::Stay),
            fitness: -1.0,
        },
        Phenotype {
            agent: 1,
            genotype: best.clone(),
            fitness: 3.0,
        },
        Phenotype {
            agent: 2,
            genotype: Genome::uniform(Action::North),
            fitness: 0.5,
        },
    ];
    let p = ReproductionParams {
        elite_fraction: 0.34,
        max_mutations: 5,
        ..params(3)
    };
    let next = next_generation(results, &p, 0, &mut rng).unwrap();
    assert_eq!(next.len(), 3);
    assert_eq!(next[0], best);
}
