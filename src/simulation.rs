//! Simulation engine - main tick loop.

use crate::commands::{AdminCommand, CommandOutcome};
use crate::config::Config;
use crate::dump::{self, DumpError};
use crate::genome::Genome;
use crate::geometry::{Rect, Vec2};
use crate::grid::{ResourceField, Token};
use crate::organism::{Fate, Organism, OrganismId};
use crate::random::RandomSource;
use crate::stats::{LineageTracker, Stats, StatsHistory};
use rand::Rng;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// The simulated world: one resource field plus the live population
pub struct Simulation {
    /// Live organisms in traversal order
    organisms: VecDeque<Organism>,

    // Environment
    field: ResourceField,

    // State
    pub tick: u64,
    pub time: f64,

    // Configuration
    pub config: Config,

    // Statistics
    pub stats: Stats,
    pub stats_history: StatsHistory,
    pub lineage_tracker: LineageTracker,

    // ID generation
    next_organism_id: OrganismId,

    // Field regeneration and spontaneous spawning draw from this stream
    rng: RandomSource,
    seed: u64,

    /// Time left until the next spontaneous spawn attempt
    spawn_clock: f64,
}

impl Simulation {
    /// Create a new simulation with a random seed
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new simulation with a specific seed for reproducibility
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut sim = Self::empty(config, seed);
        let initial = sim.config.organisms.initial_population;
        sim.spawn_initial(initial);
        sim.stats.update(&sim.organisms, &sim.field);
        sim
    }

    /// Simulation with a seeded field and no organisms
    pub fn empty(config: Config, seed: u64) -> Self {
        let world = &config.world;
        let field = ResourceField::new(world.bounds, world.dim_x, world.dim_y, world.regen_rate);

        Self {
            organisms: VecDeque::new(),
            field,
            tick: 0,
            time: 0.0,
            stats: Stats::new(),
            stats_history: StatsHistory::new(config.logging.stats_interval),
            lineage_tracker: LineageTracker::new(),
            next_organism_id: 0,
            rng: RandomSource::with_mode(seed, config.random.fork_mode),
            seed,
            spawn_clock: 0.0,
            config,
        }
    }

    /// Spawn `count` random organisms on random cells
    pub fn spawn_initial(&mut self, count: usize) {
        for _ in 0..count {
            let position = self.field.random_position(&mut self.rng);
            self.spawn_at(position);
        }
        log::debug!("Spawned {} initial organisms", count);
    }

    /// Fresh random organism founding a new lineage at `position`
    fn spawn_at(&mut self, position: Vec2) {
        let genome = Genome::random(&mut self.rng);
        let rng = self.rng.fork();
        let angle = self.rng.range(0.0, std::f64::consts::TAU);
        let lineage_id = self.lineage_tracker.register_lineage(self.tick);

        let org = Organism::new(
            0,
            lineage_id,
            genome,
            rng,
            position,
            angle,
            self.config.organisms.initial_energy,
        );
        self.add(org);
    }

    /// Insert an organism at the front of the traversal order, assigning it a fresh id
    pub fn add(&mut self, mut organism: Organism) {
        organism.id = self.allocate_id();
        self.organisms.push_front(organism);
    }

    fn allocate_id(&mut self) -> OrganismId {
        let id = self.next_organism_id;
        self.next_organism_id += 1;
        id
    }

    /// Advance the world by `dt`.
    ///
    /// Every organism present when the call starts is stepped exactly once, in
    /// traversal order. Children born during the pass are staged and only join
    /// the population after it, so they are first stepped next tick.
    pub fn step(&mut self, dt: f64) {
        let was_alive = !self.organisms.is_empty();

        // Phase 1: step the snapshot of the live collection
        let current = std::mem::take(&mut self.organisms);
        let mut survivors = VecDeque::with_capacity(current.len());
        let mut nursery = Vec::new();
        let mut starvations = 0;
        let mut divisions = 0;

        for mut org in current {
            match org.step(dt, &mut self.field, &self.config) {
                Fate::Alive => survivors.push_back(org),
                Fate::Starved => starvations += 1,
                Fate::Divided(children) => {
                    divisions += 1;
                    let [a, b] = *children;
                    nursery.push(a);
                    nursery.push(b);
                }
            }
        }

        // Phase 2: merge staged children at the front
        self.organisms = survivors;
        for child in nursery {
            self.add(child);
        }

        // Phase 3: resource regeneration
        self.field.step(dt, &mut self.rng);

        // Phase 4: spontaneous generation
        let spawns = self.spawn_spontaneous(dt);

        self.tick += 1;
        self.time += dt;

        // Phase 5: statistics
        self.stats.tick = self.tick;
        self.stats.time = self.time;
        self.stats.divisions = divisions;
        self.stats.starvations = starvations;
        self.stats.spawns = spawns;
        self.stats.update(&self.organisms, &self.field);

        let interval = self.config.logging.stats_interval;
        if interval > 0 && self.tick % interval == 0 {
            self.stats_history.record(self.stats.clone());
            self.lineage_tracker.update(&self.organisms);
        }

        if divisions > 0 || starvations > 0 {
            log::debug!(
                "tick {}: {} divisions, {} starvations, population {}",
                self.tick,
                divisions,
                starvations,
                self.organisms.len()
            );
        }
        if was_alive && self.organisms.is_empty() {
            log::warn!("Population extinct at tick {}", self.tick);
        }
    }

    /// Second Poisson process: sample cells and turn `Energy` tokens into organisms
    fn spawn_spontaneous(&mut self, dt: f64) -> usize {
        let rate = self.config.spawn.rate;
        if rate <= 0.0 {
            return 0;
        }

        let mut spawned = 0;
        self.spawn_clock -= dt;
        while self.spawn_clock < 0.0 {
            let position = self.field.random_position(&mut self.rng);
            let depth = self.field.depth_at(position);

            match self.field.take(position) {
                Some(Token::Energy)
                    if depth >= self.config.spawn.min_depth
                        && self.organisms.len() < self.config.spawn.max_population =>
                {
                    self.spawn_at(position);
                    spawned += 1;
                }
                Some(token) => self.field.put(position, token),
                None => {}
            }

            self.spawn_clock += self.rng.exponential(rate);
        }
        spawned
    }

    /// Run for `steps` ticks of the configured `dt`
    pub fn run(&mut self, steps: u64) {
        let dt = self.config.world.dt;
        for _ in 0..steps {
            self.step(dt);
        }
    }

    /// Run with a callback after every tick
    pub fn run_with_callback<F>(&mut self, steps: u64, mut callback: F)
    where
        F: FnMut(&Simulation, u64),
    {
        let dt = self.config.world.dt;
        for i in 0..steps {
            self.step(dt);
            callback(self, i);
        }
    }

    /// Remove every organism inside `region`, returning their buffered tokens
    /// to the field. Returns how many were removed.
    pub fn remove_in_region(&mut self, region: Rect) -> usize {
        let before = self.organisms.len();
        let field = &mut self.field;
        self.organisms.retain_mut(|org| {
            if region.contains(org.position) {
                org.flush(field);
                false
            } else {
                true
            }
        });
        let removed = before - self.organisms.len();
        log::info!("Reset region removed {} organisms", removed);
        removed
    }

    /// Text dump of every live organism in traversal order
    pub fn render_dump(&self) -> String {
        dump::render(&self.organisms)
    }

    /// Write a dump to a new timestamped file inside `dir`
    pub fn dump_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, DumpError> {
        dump::write_dump(dir.as_ref(), &self.render_dump())
    }

    /// Execute an administrative command
    pub fn apply(&mut self, command: &AdminCommand) -> Result<CommandOutcome, DumpError> {
        match command {
            AdminCommand::ResetRegion(region) => {
                let region = region.unwrap_or(self.config.admin.reset_zone);
                Ok(CommandOutcome::Removed(self.remove_in_region(region)))
            }
            AdminCommand::Dump => {
                let path = self.dump_to(&self.config.admin.dump_dir)?;
                Ok(CommandOutcome::Dumped(path))
            }
        }
    }

    /// Live organisms in traversal order
    pub fn organisms(&self) -> impl Iterator<Item = &Organism> {
        self.organisms.iter()
    }

    /// The resource field
    pub fn field(&self) -> &ResourceField {
        &self.field
    }

    /// Current population count
    pub fn population(&self) -> usize {
        self.organisms.len()
    }

    /// Check if population is extinct
    pub fn is_extinct(&self) -> bool {
        self.organisms.is_empty()
    }

    /// Tokens in the field plus all organism buffers
    pub fn total_tokens(&self) -> usize {
        self.field.total_tokens() + self.organisms.iter().map(Organism::buffered).sum::<usize>()
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{Instruction, Op};

    fn test_config() -> Config {
        let mut config = Config::default();
        config.organisms.initial_population = 0;
        config.world.regen_rate = 0.0;
        config.spawn.rate = 0.0;
        config.evolution.mutation_rate = 0.0;
        config
    }

    fn organism_with(genome: Genome, position: Vec2, energy: f64) -> Organism {
        Organism::new(0, 0, genome, RandomSource::new(1), position, 0.0, energy)
    }

    #[test]
    fn test_simulation_creation() {
        let mut config = Config::default();
        config.organisms.initial_population = 25;
        let sim = Simulation::new(config);

        assert_eq!(sim.population(), 25);
        assert_eq!(sim.tick, 0);
        assert_eq!(sim.stats.population, 25);
    }

    #[test]
    fn test_add_goes_to_front() {
        let mut sim = Simulation::empty(test_config(), 1);
        let idle = Genome::uniform(Instruction::new(Op::Idle, 0));
        sim.add(organism_with(idle.clone(), Vec2::default(), 5.0));
        sim.add(organism_with(idle, Vec2::default(), 5.0));

        let ids: Vec<_> = sim.organisms().map(|o| o.id).collect();
        assert_eq!(ids, vec![1, 0]);
    }

    #[test]
    fn test_division_adds_children_without_stepping_them() {
        let mut sim = Simulation::empty(test_config(), 2);
        let divider = Genome::uniform(Instruction::new(Op::Divide { child_ip: 0 }, 0));
        let idle = Genome::uniform(Instruction::new(Op::Idle, 0));

        sim.add(organism_with(idle, Vec2::default(), 50.0));
        sim.add(organism_with(divider.clone(), Vec2::default(), 40.0));
        sim.add(organism_with(divider, Vec2::new(2.0, 2.0), 40.0));

        sim.step(0.1);

        // two divisions: -2 parents, +4 children
        assert_eq!(sim.population(), 5);
        assert_eq!(sim.stats.divisions, 2);
        for child in sim.organisms().filter(|o| o.generation == 1) {
            // untouched by the pass that created them
            assert_eq!(child.age, 0);
            assert!((child.energy - (40.0 - 0.002) / 2.0).abs() < 1e-12);
        }
        // children sit in front of the surviving idle organism
        let generations: Vec<_> = sim.organisms().map(|o| o.generation).collect();
        assert_eq!(generations, vec![1, 1, 1, 1, 0]);
    }

    #[test]
    fn test_contested_token_goes_to_first_stepped() {
        let mut sim = Simulation::empty(test_config(), 3);
        let absorb = Genome::uniform(Instruction::new(Op::Absorb, 0));
        let p = Vec2::new(0.0, 0.0);

        sim.add(organism_with(absorb.clone(), p, 10.0)); // id 0, stepped second
        sim.add(organism_with(absorb, p, 10.0)); // id 1, stepped first

        sim.step(0.1);

        let by_id = |id| sim.organisms().find(|o| o.id == id).unwrap().buffered();
        assert_eq!(by_id(1), 1);
        assert_eq!(by_id(0), 0);
    }

    #[test]
    fn test_starvation_removes_and_conserves_tokens() {
        let mut sim = Simulation::empty(test_config(), 4);
        let mut org = organism_with(
            Genome::uniform(Instruction::new(Op::Idle, 0)),
            Vec2::new(1.0, 1.0),
            1.001,
        );
        org.buffer = vec![Token::Energy, Token::Waste];
        let before = sim.total_tokens() + 2;
        sim.add(org);

        sim.step(0.1);

        assert!(sim.is_extinct());
        assert_eq!(sim.stats.starvations, 1);
        assert_eq!(sim.total_tokens(), before);
    }

    #[test]
    fn test_spawn_consumes_energy_tokens() {
        let mut config = test_config();
        config.spawn.rate = 50.0;
        let mut sim = Simulation::empty(config, 5);
        let tokens_before = sim.field().total_tokens();

        sim.step(1.0);

        let spawned = sim.stats.spawns;
        assert!(spawned > 0);
        assert_eq!(sim.population(), spawned);
        assert_eq!(sim.field().total_tokens(), tokens_before - spawned);
        assert_eq!(sim.lineage_tracker.lineages.len(), spawned);
    }

    #[test]
    fn test_spawn_respects_min_depth() {
        let mut config = test_config();
        config.spawn.rate = 50.0;
        config.spawn.min_depth = 2;
        let mut sim = Simulation::empty(config, 6);
        let tokens_before = sim.field().total_tokens();

        sim.step(1.0);

        // every cell holds a single token, so nothing qualifies
        assert_eq!(sim.population(), 0);
        assert_eq!(sim.field().total_tokens(), tokens_before);
    }

    #[test]
    fn test_spawn_respects_population_cap() {
        let mut config = test_config();
        config.spawn.rate = 200.0;
        config.spawn.max_population = 3;
        let mut sim = Simulation::empty(config, 7);

        sim.step(1.0);
        assert_eq!(sim.population(), 3);
    }

    #[test]
    fn test_remove_in_region() {
        let mut sim = Simulation::empty(test_config(), 8);
        let idle = Genome::uniform(Instruction::new(Op::Idle, 0));
        let mut inside = organism_with(idle.clone(), Vec2::new(1.0, 1.0), 5.0);
        inside.buffer.push(Token::Waste);
        sim.add(inside);
        sim.add(organism_with(idle, Vec2::new(10.0, 10.0), 5.0));
        let tokens = sim.total_tokens();

        let removed = sim.remove_in_region(Rect::new(Vec2::new(-4.0, -4.0), Vec2::new(4.0, 4.0)));

        assert_eq!(removed, 1);
        assert_eq!(sim.population(), 1);
        assert_eq!(sim.total_tokens(), tokens);
    }

    #[test]
    fn test_apply_reset_uses_configured_zone() {
        let mut sim = Simulation::empty(test_config(), 9);
        let idle = Genome::uniform(Instruction::new(Op::Idle, 0));
        sim.add(organism_with(idle, Vec2::new(0.0, 0.0), 5.0));

        let outcome = sim.apply(&AdminCommand::ResetRegion(None)).unwrap();
        assert_eq!(outcome, CommandOutcome::Removed(1));
    }

    #[test]
    fn test_apply_dump_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config();
        config.admin.dump_dir = dir.path().to_path_buf();
        let mut sim = Simulation::empty(config, 10);
        sim.add(organism_with(
            Genome::uniform(Instruction::new(Op::Idle, 0)),
            Vec2::default(),
            5.0,
        ));

        match sim.apply(&AdminCommand::Dump).unwrap() {
            CommandOutcome::Dumped(path) => {
                let text = std::fs::read_to_string(path).unwrap();
                assert!(text.contains("31: IDLE() --> 0"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_zero_stats_interval_disables_history() {
        let mut config = Config::default();
        config.organisms.initial_population = 10;
        config.logging.stats_interval = 0;
        let mut sim = Simulation::new_with_seed(config, 11);

        sim.run(20);

        assert_eq!(sim.tick, 20);
        assert!(sim.stats_history.snapshots.is_empty());
        assert_eq!(sim.stats.tick, 20);
    }

    #[test]
    fn test_simulation_run() {
        let config = Config::default();
        let mut sim = Simulation::new_with_seed(config, 77);

        sim.run(100);

        assert_eq!(sim.tick, 100);
        assert!((sim.time - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_reproducibility() {
        let config = Config::default();

        let mut a = Simulation::new_with_seed(config.clone(), 42);
        let mut b = Simulation::new_with_seed(config, 42);

        a.run(200);
        b.run(200);

        assert_eq!(a.population(), b.population());
        assert_eq!(a.render_dump(), b.render_dump());
        assert_eq!(a.field().total_tokens(), b.field().total_tokens());
    }
}
