//! dnasim - CLI Entry Point
//!
//! Headless driver for the DNA-programmed artificial-life simulator.

use clap::{Parser, Subcommand};
use dnasim::commands::{AdminCommand, CommandOutcome, CommandSchedule};
use dnasim::{benchmark, sweep, Config, Simulation};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "dnasim")]
#[command(version)]
#[command(about = "Artificial-life simulator driven by mutating instruction programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks to simulate
        #[arg(short, long, default_value = "10000")]
        steps: u64,

        /// Output directory for the stats history
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Remove every organism in the reset zone after this tick (repeatable)
        #[arg(long = "reset-at")]
        reset_at: Vec<u64>,

        /// Write a debug dump after this tick (repeatable)
        #[arg(long = "dump-at")]
        dump_at: Vec<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of ticks
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Initial population size
        #[arg(short, long, default_value = "500")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Run one simulation per seed in parallel and compare outcomes
    Sweep {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of ticks per run
        #[arg(short, long, default_value = "2000")]
        steps: u64,

        /// First seed
        #[arg(long, default_value = "0")]
        first_seed: u64,

        /// Number of seeds
        #[arg(short, long, default_value = "8")]
        runs: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            output,
            seed,
            reset_at,
            dump_at,
            quiet,
        } => {
            let config = load_config(&config)?;
            init_logging(&config.logging.log_level);

            let mut schedule = CommandSchedule::new();
            for tick in reset_at {
                schedule = schedule.at(tick, AdminCommand::ResetRegion(None));
            }
            for tick in dump_at {
                schedule = schedule.at(tick, AdminCommand::Dump);
            }

            run_simulation(config, steps, output, seed, schedule, quiet)
        }

        Commands::Benchmark { steps, population } => {
            init_logging("warn");
            run_benchmark(steps, population)
        }

        Commands::Init { output } => generate_config(output),

        Commands::Sweep {
            config,
            steps,
            first_seed,
            runs,
        } => {
            let config = load_config(&config)?;
            init_logging(&config.logging.log_level);
            run_sweep(config, steps, first_seed, runs)
        }
    }
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_config(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Loading config from: {:?}", path);
        Ok(Config::from_file(path)?)
    } else {
        println!("Using default configuration");
        Ok(Config::default())
    }
}

fn run_simulation(
    config: Config,
    steps: u64,
    output: PathBuf,
    seed: Option<u64>,
    schedule: CommandSchedule,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&output)?;

    let mut sim = if let Some(s) = seed {
        Simulation::new_with_seed(config.clone(), s)
    } else {
        Simulation::new(config.clone())
    };
    log::info!("Using seed: {}", sim.seed());

    println!("Starting simulation");
    println!("  Initial population: {}", sim.population());
    println!("  Grid size: {}x{}", config.world.dim_x, config.world.dim_y);
    println!("  Steps: {}", steps);
    println!();

    let start = Instant::now();
    let stats_interval = config.logging.stats_interval;
    let dt = config.world.dt;

    for _ in 0..steps {
        sim.step(dt);

        if !quiet && stats_interval > 0 && sim.tick % stats_interval == 0 {
            println!("{}", sim.stats.summary());
        }

        for command in schedule.due(sim.tick) {
            match sim.apply(command) {
                Ok(CommandOutcome::Removed(n)) => {
                    if !quiet {
                        println!("  Reset zone cleared: {} organisms removed", n);
                    }
                }
                Ok(CommandOutcome::Dumped(path)) => {
                    if !quiet {
                        println!("  Dump written: {:?}", path);
                    }
                }
                Err(e) => eprintln!("  Dump error: {}", e),
            }
        }

        // spontaneous generation can repopulate an empty world
        if sim.is_extinct() && config.spawn.rate <= 0.0 {
            println!("\nPopulation extinct at tick {}", sim.tick);
            break;
        }
    }

    let elapsed = start.elapsed();
    let ticks_per_sec = sim.tick as f64 / elapsed.as_secs_f64();

    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Ticks: {}", sim.tick);
    println!("Speed: {:.1} ticks/s", ticks_per_sec);
    println!("Final population: {}", sim.population());
    println!("Max generation: {}", sim.stats.generation_max);
    if let Some(&(tick, generation)) = sim
        .stats_history
        .generation_series()
        .iter()
        .find(|&&(_, g)| g == sim.stats.generation_max)
    {
        println!("Generation {} first recorded at tick {}", generation, tick);
    }
    println!("Lineages: {}", sim.lineage_tracker.surviving_count());
    if let Some((id, lineage)) = sim.lineage_tracker.dominant_lineage() {
        println!(
            "Dominant lineage: {} ({} organisms, founded at tick {})",
            id, lineage.current_population, lineage.founder_tick
        );
    }

    let stats_path = output.join("stats_history.json");
    sim.stats_history.save(&stats_path)?;
    println!("Stats history: {:?}", stats_path);

    Ok(())
}

fn run_benchmark(steps: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== dnasim Benchmark ===");
    println!("Steps: {}", steps);
    println!("Population: {}", population);
    println!();

    let result = benchmark(steps, population);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}

fn run_sweep(
    config: Config,
    steps: u64,
    first_seed: u64,
    runs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let seeds: Vec<u64> = (first_seed..first_seed + runs).collect();
    log::info!("Sweeping {} seeds for {} ticks", seeds.len(), steps);

    let start = Instant::now();
    let results = sweep(&config, &seeds, steps);

    println!("=== Sweep Results ===");
    println!("{:>8} {:>10} {:>8} {:>9} {:>10}", "seed", "population", "max_gen", "lineages", "extinct");
    for r in &results {
        let extinct = r
            .extinct_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>8} {:>10} {:>8} {:>9} {:>10}",
            r.seed, r.final_population, r.max_generation, r.lineages, extinct
        );
    }
    println!();
    println!("Time: {:.2}s", start.elapsed().as_secs_f64());

    Ok(())
}
