//! # dnasim
//!
//! Artificial-life simulator where every organism is driven by a small
//! mutating program ("DNA") interpreted once per tick.
//!
//! ## Features
//!
//! - **Instruction VM**: 32-slot genomes forming a random graph of
//!   terminal and non-terminal opcodes
//! - **Resource field**: stacked `Energy`/`Waste` tokens with Poisson regeneration
//! - **Reproducible**: every stream derives from one seed
//! - **Configurable**: YAML configuration files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dnasim::{Config, Simulation};
//!
//! let config = Config::default();
//! let mut sim = Simulation::new_with_seed(config, 42);
//!
//! sim.run(1000);
//!
//! println!("Population: {}", sim.population());
//! println!("{}", sim.stats.summary());
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use dnasim::Config;
//!
//! let mut config = Config::default();
//! config.organisms.initial_population = 200;
//! config.evolution.mutation_rate = 0.1;
//! assert!(config.validate().is_ok());
//! ```

pub mod commands;
pub mod config;
pub mod dump;
pub mod genome;
pub mod geometry;
pub mod grid;
pub mod organism;
pub mod random;
pub mod simulation;
pub mod stats;

// Re-export main types
pub use config::Config;
pub use genome::{Genome, Instruction, Op, GENOME_LEN};
pub use geometry::{Rect, Vec2};
pub use grid::{ResourceField, Token};
pub use organism::{Fate, Organism};
pub use random::RandomSource;
pub use simulation::Simulation;

use rayon::prelude::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, population: usize) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.organisms.initial_population = population;
    config.spawn.max_population = config.spawn.max_population.max(population);

    let mut sim = Simulation::new_with_seed(config, 0);

    let start = Instant::now();
    sim.run(steps);
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps,
        initial_population: population,
        final_population: sim.population(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
        max_generation: sim.stats.generation_max,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub max_generation: u32,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Max generation: {}", self.max_generation)?;
        Ok(())
    }
}

/// Outcome of one seeded run in a sweep
#[derive(Debug, Clone)]
pub struct SweepResult {
    pub seed: u64,
    pub final_population: usize,
    pub max_generation: u32,
    pub lineages: usize,
    pub extinct_at: Option<u64>,
}

/// Run one independent simulation per seed in parallel.
///
/// Each simulation is single-threaded and owned by one task, so results are
/// identical to running the seeds one after another.
pub fn sweep(config: &Config, seeds: &[u64], steps: u64) -> Vec<SweepResult> {
    seeds
        .par_iter()
        .map(|&seed| {
            let mut sim = Simulation::new_with_seed(config.clone(), seed);
            let mut extinct_at = None;
            let dt = sim.config.world.dt;
            for _ in 0..steps {
                sim.step(dt);
                if sim.is_extinct() && extinct_at.is_none() {
                    extinct_at = Some(sim.tick);
                }
            }
            SweepResult {
                seed,
                final_population: sim.population(),
                max_generation: sim.stats.generation_max,
                lineages: sim.stats.lineage_count,
                extinct_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_quick_simulation() {
        let mut sim = Simulation::new_with_seed(Config::default(), 1);
        sim.run(100);
        assert_eq!(sim.tick, 100);
    }

    #[test]
    fn test_benchmark() {
        let result = benchmark(50, 20);

        assert_eq!(result.steps, 50);
        assert!(result.steps_per_second > 0.0);
    }

    #[test]
    fn test_sweep_matches_sequential_runs() {
        let mut config = Config::default();
        config.organisms.initial_population = 20;
        let results = sweep(&config, &[1, 2, 3], 100);

        assert_eq!(results.len(), 3);
        for result in &results {
            let mut sim = Simulation::new_with_seed(config.clone(), result.seed);
            sim.run(100);
            assert_eq!(sim.population(), result.final_population);
        }
    }
}
