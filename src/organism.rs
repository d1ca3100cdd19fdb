//! Organism state and the instruction interpreter that drives it.

use crate::config::Config;
use crate::genome::{Genome, Op, GENOME_LEN};
use crate::geometry::Vec2;
use crate::grid::{ResourceField, Token};
use crate::random::RandomSource;

/// Unique organism identifier
pub type OrganismId = u64;

/// Lineage/family identifier
pub type LineageId = u32;

/// Result of advancing an organism by one tick
#[derive(Debug)]
pub enum Fate {
    /// Still alive, tick complete
    Alive,
    /// Energy fell below the death threshold
    Starved,
    /// Died by dividing into these two children
    Divided(Box<[Organism; 2]>),
}

impl Fate {
    #[inline]
    pub fn is_death(&self) -> bool {
        !matches!(self, Fate::Alive)
    }
}

/// An organism in the simulation
#[derive(Clone, Debug)]
pub struct Organism {
    // Identity
    pub id: OrganismId,
    pub lineage_id: LineageId,
    pub generation: u32,

    // Program
    pub genome: Genome,
    pub ip: usize,
    rng: RandomSource,

    // Physical state
    pub position: Vec2,
    pub angle: f64,
    pub energy: f64,
    /// Working buffer, top of stack is the last element
    pub buffer: Vec<Token>,

    /// Ticks survived
    pub age: u32,
}

impl Organism {
    /// Create a generation-0 organism starting at slot 0
    pub fn new(
        id: OrganismId,
        lineage_id: LineageId,
        genome: Genome,
        rng: RandomSource,
        position: Vec2,
        angle: f64,
        energy: f64,
    ) -> Self {
        Self {
            id,
            lineage_id,
            generation: 0,
            genome,
            ip: 0,
            rng,
            position,
            angle,
            energy,
            buffer: Vec::new(),
            age: 0,
        }
    }

    /// Heading as a unit vector
    #[inline]
    pub fn heading(&self) -> Vec2 {
        Vec2::from_angle(self.angle)
    }

    /// Return every buffered token to the field at the current position
    pub fn flush(&mut self, field: &mut ResourceField) {
        for token in self.buffer.drain(..) {
            field.put(self.position, token);
        }
    }

    /// Advance one tick.
    ///
    /// Executes instructions until a terminal op runs or the organism dies.
    /// Every iteration pays `thinking_cost` first, so a program made only of
    /// non-terminal ops still ends by starvation.
    pub fn step(&mut self, dt: f64, field: &mut ResourceField, config: &Config) -> Fate {
        let params = &config.organisms;

        loop {
            self.energy -= params.thinking_cost;
            if self.energy < params.death_threshold {
                self.flush(field);
                return Fate::Starved;
            }

            debug_assert!(self.ip < GENOME_LEN);
            let instruction = self.genome[self.ip];
            self.ip = instruction.next;

            match instruction.op {
                Op::Idle => {}
                Op::Forward { speed } => {
                    self.position += (dt * speed) * self.heading();
                    self.position = field.clamp(self.position);
                    self.energy -= speed.abs() * dt;
                }
                Op::Rotate { speed } => {
                    self.angle += dt * speed;
                }
                Op::Absorb => {
                    if let Some(token) = field.take(self.position) {
                        self.buffer.push(token);
                    }
                }
                Op::Excrete => {
                    if let Some(token) = self.buffer.pop() {
                        field.put(self.position, token);
                    }
                }
                Op::Metabolize => match self.buffer.pop() {
                    Some(Token::Energy) => {
                        field.put(self.position, Token::Waste);
                        self.energy += params.metabolize_reward;
                    }
                    Some(other) => field.put(self.position, other),
                    None => {}
                },
                Op::Metabolize2 => {
                    if self.buffer.len() >= 2 {
                        let first = self.buffer.pop();
                        let second = self.buffer.pop();
                        if let (Some(first), Some(second)) = (first, second) {
                            if first == Token::Waste && second == Token::Waste {
                                field.put(self.position, Token::Energy);
                                self.energy += params.recycle_reward;
                            } else {
                                field.put(self.position, second);
                                self.buffer.push(first);
                            }
                        }
                    }
                }
                Op::CmpEnergy { threshold, target } => {
                    if self.energy >= threshold {
                        self.ip = target;
                    }
                }
                Op::RandomBranch {
                    probability,
                    target,
                } => {
                    if self.rng.unit() < probability {
                        self.ip = target;
                    }
                }
                Op::Divide { child_ip } => {
                    self.flush(field);
                    let children = self.divide(child_ip, config);
                    return Fate::Divided(Box::new(children));
                }
            }

            if instruction.op.is_terminal() {
                self.age += 1;
                return Fate::Alive;
            }
        }
    }

    /// Split into two mutated children sharing the remaining energy equally.
    /// The first resumes at the current `ip`, the second at `child_ip`.
    fn divide(&mut self, child_ip: usize, config: &Config) -> [Organism; 2] {
        let (rng_a, rng_b) = self.rng.fork_pair();
        let energy = (self.energy - config.organisms.division_cost).max(0.0) / 2.0;
        let rate = config.evolution.mutation_rate;

        let make_child = |mut rng: RandomSource, ip: usize| {
            let mut genome = self.genome.clone();
            genome.mutate(&mut rng, rate);
            Organism {
                id: self.id,
                lineage_id: self.lineage_id,
                generation: self.generation + 1,
                genome,
                ip,
                rng,
                position: self.position,
                angle: self.angle,
                energy,
                buffer: Vec::new(),
                age: 0,
            }
        };

        [make_child(rng_a, self.ip), make_child(rng_b, child_ip)]
    }

    /// Total tokens this organism holds
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
