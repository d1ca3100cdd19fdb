//! Statistics tracking for the simulation.

use crate::grid::{ResourceField, Token};
use crate::organism::{LineageId, Organism};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Statistics snapshot for a simulation tick
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Ticks completed
    pub tick: u64,
    /// Simulated time (sum of `dt`)
    pub time: f64,
    /// Live organisms
    pub population: usize,
    /// Divisions this tick
    pub divisions: usize,
    /// Starvations this tick
    pub starvations: usize,
    /// Spontaneous spawns this tick
    pub spawns: usize,
    /// Mean energy across organisms
    pub energy_mean: f64,
    /// Maximum generation alive
    pub generation_max: u32,
    /// Distinct lineages alive
    pub lineage_count: usize,
    /// Tokens held in organism buffers
    pub buffered_tokens: usize,
    /// `Energy` tokens lying in the field
    pub energy_tokens: usize,
    /// `Waste` tokens lying in the field
    pub waste_tokens: usize,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh population and field aggregates
    pub fn update<'a, I>(&mut self, organisms: I, field: &ResourceField)
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        let mut population = 0usize;
        let mut energy_sum = 0.0f64;
        let mut generation_max = 0u32;
        let mut buffered = 0usize;
        let mut lineages = HashSet::new();

        for org in organisms {
            population += 1;
            energy_sum += org.energy;
            generation_max = generation_max.max(org.generation);
            buffered += org.buffered();
            lineages.insert(org.lineage_id);
        }

        self.population = population;
        self.energy_mean = if population > 0 {
            energy_sum / population as f64
        } else {
            0.0
        };
        self.generation_max = generation_max;
        self.lineage_count = lineages.len();
        self.buffered_tokens = buffered;
        self.energy_tokens = field.count(Token::Energy);
        self.waste_tokens = field.count(Token::Waste);
    }

    /// Every token in the world: field plus buffers
    pub fn total_tokens(&self) -> usize {
        self.energy_tokens + self.waste_tokens + self.buffered_tokens
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:7} | Pop:{:5} | Gen:{:4} | Lin:{:4} | Energy:{:6.2} | Div:{:3} Starve:{:3} Spawn:{:2} | Tok E:{} W:{} B:{}",
            self.tick,
            self.population,
            self.generation_max,
            self.lineage_count,
            self.energy_mean,
            self.divisions,
            self.starvations,
            self.spawns,
            self.energy_tokens,
            self.waste_tokens,
            self.buffered_tokens,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded stats snapshots
    pub snapshots: Vec<Stats>,
    /// Recording interval in ticks
    pub interval: u64,
}

impl StatsHistory {
    /// Create new history with recording interval
    pub fn new(interval: u64) -> Self {
        Self {
            snapshots: Vec::new(),
            interval,
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    /// Population over ticks
    pub fn population_series(&self) -> Vec<(u64, usize)> {
        self.snapshots
            .iter()
            .map(|s| (s.tick, s.population))
            .collect()
    }

    /// Generation max over ticks
    pub fn generation_series(&self) -> Vec<(u64, u32)> {
        self.snapshots
            .iter()
            .map(|s| (s.tick, s.generation_max))
            .collect()
    }

    /// Save history to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Lineage tracker for evolutionary analysis
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageTracker {
    pub lineages: HashMap<LineageId, LineageStats>,
    pub next_lineage_id: LineageId,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageStats {
    pub founder_tick: u64,
    pub current_population: usize,
    pub max_generation: u32,
    pub extinct: bool,
}

impl LineageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new lineage founded by a spontaneously spawned organism
    pub fn register_lineage(&mut self, tick: u64) -> LineageId {
        let id = self.next_lineage_id;
        self.next_lineage_id += 1;

        self.lineages.insert(
            id,
            LineageStats {
                founder_tick: tick,
                current_population: 1,
                max_generation: 0,
                extinct: false,
            },
        );

        id
    }

    /// Recount lineage populations
    pub fn update<'a, I>(&mut self, organisms: I)
    where
        I: IntoIterator<Item = &'a Organism>,
    {
        for stats in self.lineages.values_mut() {
            stats.current_population = 0;
        }

        for org in organisms {
            if let Some(stats) = self.lineages.get_mut(&org.lineage_id) {
                stats.current_population += 1;
                stats.max_generation = stats.max_generation.max(org.generation);
            }
        }

        for stats in self.lineages.values_mut() {
            if stats.current_population == 0 {
                stats.extinct = true;
            }
        }
    }

    /// Surviving lineages count
    pub fn surviving_count(&self) -> usize {
        self.lineages.values().filter(|s| !s.extinct).count()
    }

    /// Lineage with the highest current population
    pub fn dominant_lineage(&self) -> Option<(LineageId, &LineageStats)> {
        self.lineages
            .iter()
            .filter(|(_, s)| !s.extinct)
            .max_by_key(|(_, s)| s.current_population)
            .map(|(&id, stats)| (id, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{Genome, Instruction, Op};
    use crate::geometry::{Rect, Vec2};
    use crate::random::RandomSource;

    fn organism(id: u64, lineage: LineageId, energy: f64) -> Organism {
        Organism::new(
            id,
            lineage,
            Genome::uniform(Instruction::new(Op::Idle, 0)),
            RandomSource::new(id),
            Vec2::default(),
            0.0,
            energy,
        )
    }

    #[test]
    fn test_stats_update() {
        let field = ResourceField::new(
            Rect::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)),
            2,
            2,
            0.0,
        );
        let mut organisms = vec![organism(1, 0, 4.0), organism(2, 0, 6.0), organism(3, 1, 8.0)];
        organisms[2].generation = 5;
        organisms[1].buffer.push(Token::Waste);

        let mut stats = Stats::new();
        stats.update(&organisms, &field);

        assert_eq!(stats.population, 3);
        assert_eq!(stats.lineage_count, 2);
        assert_eq!(stats.generation_max, 5);
        assert!((stats.energy_mean - 6.0).abs() < 1e-12);
        assert_eq!(stats.energy_tokens, 4);
        assert_eq!(stats.total_tokens(), 5);
    }

    #[test]
    fn test_stats_history() {
        let mut history = StatsHistory::new(10);

        for i in 0..5 {
            let mut stats = Stats::new();
            stats.tick = i * 10;
            stats.population = (i + 1) as usize * 100;
            stats.generation_max = i as u32;
            history.record(stats);
        }

        let series = history.population_series();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0], (0, 100));
        assert_eq!(series[4], (40, 500));

        let generations = history.generation_series();
        assert_eq!(generations.len(), 5);
        assert_eq!(generations[3], (30, 3));
    }

    #[test]
    fn test_history_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = StatsHistory::new(5);
        history.record(Stats {
            tick: 5,
            population: 12,
            ..Stats::default()
        });
        history.save(&path).unwrap();

        let loaded = StatsHistory::load(&path).unwrap();
        assert_eq!(loaded.population_series(), vec![(5, 12)]);
    }

    #[test]
    fn test_lineage_tracker() {
        let mut tracker = LineageTracker::new();

        let id1 = tracker.register_lineage(0);
        let id2 = tracker.register_lineage(0);
        assert_eq!(id1, 0);
        assert_eq!(id2, 1);
        assert_eq!(tracker.surviving_count(), 2);

        let organisms = vec![organism(1, id2, 5.0)];
        tracker.update(&organisms);
        assert_eq!(tracker.surviving_count(), 1);
        assert_eq!(tracker.dominant_lineage().map(|(id, _)| id), Some(id2));
    }
}
