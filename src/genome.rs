//! DNA: a fixed 32-slot program of instructions.
//!
//! The program is not sequential code. Every instruction names its own default
//! successor, so a genome is a random directed graph over its slots, and the
//! branching opcodes add a second edge.

use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Number of instruction slots in every genome
pub const GENOME_LEN: usize = 32;

/// Largest absolute speed a freshly generated FORWARD can carry
pub const MAX_SPEED: f64 = 2.0;
/// Largest absolute angular speed a freshly generated ROTATE can carry
pub const MAX_TURN: f64 = std::f64::consts::PI;
/// Upper bound for freshly generated CMP_ENERGY thresholds
pub const MAX_THRESHOLD: f64 = 30.0;

/// Number of distinct opcodes
const OPCODE_COUNT: usize = 10;

/// Operation and operands of one instruction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Op {
    Idle,
    Forward { speed: f64 },
    Rotate { speed: f64 },
    Absorb,
    Excrete,
    Metabolize,
    Metabolize2,
    Divide { child_ip: usize },
    CmpEnergy { threshold: f64, target: usize },
    RandomBranch { probability: f64, target: usize },
}

impl Op {
    /// Whether executing this op ends the organism's tick
    #[inline]
    pub fn is_terminal(&self) -> bool {
        match self {
            Op::Idle
            | Op::Forward { .. }
            | Op::Absorb
            | Op::Metabolize
            | Op::Metabolize2
            | Op::Divide { .. } => true,
            Op::Rotate { .. } | Op::Excrete | Op::CmpEnergy { .. } | Op::RandomBranch { .. } => {
                false
            }
        }
    }

    /// Upper-case mnemonic used in dumps
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Idle => "IDLE",
            Op::Forward { .. } => "FORWARD",
            Op::Rotate { .. } => "ROTATE",
            Op::Absorb => "ABSORB",
            Op::Excrete => "EXCRETE",
            Op::Metabolize => "METABOLIZE",
            Op::Metabolize2 => "METABOLIZE2",
            Op::Divide { .. } => "DIVIDE",
            Op::CmpEnergy { .. } => "CMP_ENERGY",
            Op::RandomBranch { .. } => "RANDOM_BRANCH",
        }
    }

    /// Draw a uniformly random opcode with random operands
    pub fn random(rng: &mut RandomSource) -> Self {
        match rng.int_range(0, OPCODE_COUNT) {
            0 => Op::Idle,
            1 => Op::Forward {
                speed: rng.range(-MAX_SPEED, MAX_SPEED),
            },
            2 => Op::Rotate {
                speed: rng.range(-MAX_TURN, MAX_TURN),
            },
            3 => Op::Absorb,
            4 => Op::Excrete,
            5 => Op::Metabolize,
            6 => Op::Metabolize2,
            7 => Op::Divide {
                child_ip: random_slot(rng),
            },
            8 => Op::CmpEnergy {
                threshold: rng.range(0.0, MAX_THRESHOLD),
                target: random_slot(rng),
            },
            _ => Op::RandomBranch {
                probability: rng.unit(),
                target: random_slot(rng),
            },
        }
    }

    /// Nudge the operands. Returns false for ops without operands.
    fn perturb(&mut self, rng: &mut RandomSource) -> bool {
        match self {
            Op::Forward { speed } | Op::Rotate { speed } => {
                *speed += rng.range(-0.5, 0.5);
            }
            Op::Divide { child_ip } => *child_ip = random_slot(rng),
            Op::CmpEnergy { threshold, target } => {
                if rng.unit() < 0.5 {
                    *threshold = (*threshold + rng.range(-2.0, 2.0)).max(0.0);
                } else {
                    *target = random_slot(rng);
                }
            }
            Op::RandomBranch {
                probability,
                target,
            } => {
                if rng.unit() < 0.5 {
                    *probability = (*probability + rng.range(-0.1, 0.1)).clamp(0.0, 1.0);
                } else {
                    *target = random_slot(rng);
                }
            }
            Op::Idle | Op::Absorb | Op::Excrete | Op::Metabolize | Op::Metabolize2 => {
                return false
            }
        }
        true
    }

    /// Slot index this op can jump to, if any
    fn jump_target(&self) -> Option<usize> {
        match *self {
            Op::Divide { child_ip } => Some(child_ip),
            Op::CmpEnergy { target, .. } | Op::RandomBranch { target, .. } => Some(target),
            _ => None,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.mnemonic())?;
        match self {
            Op::Forward { speed } | Op::Rotate { speed } => write!(f, "{:.4}", speed)?,
            Op::Divide { child_ip } => write!(f, "{}", child_ip)?,
            Op::CmpEnergy { threshold, target } => write!(f, "{:.4}, {}", threshold, target)?,
            Op::RandomBranch {
                probability,
                target,
            } => write!(f, "{:.4}, {}", probability, target)?,
            _ => {}
        }
        write!(f, ")")
    }
}

#[inline]
fn random_slot(rng: &mut RandomSource) -> usize {
    rng.int_range(0, GENOME_LEN)
}

/// One genome slot: an op plus its default successor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: Op,
    pub next: usize,
}

impl Instruction {
    pub const fn new(op: Op, next: usize) -> Self {
        Self { op, next }
    }

    /// Random op with a random successor
    pub fn random(rng: &mut RandomSource) -> Self {
        Self {
            op: Op::random(rng),
            next: random_slot(rng),
        }
    }

    /// Apply one point mutation in place
    pub fn mutate(&mut self, rng: &mut RandomSource) {
        match rng.int_range(0, 3) {
            0 => self.next = random_slot(rng),
            1 => {
                if !self.op.perturb(rng) {
                    self.next = random_slot(rng);
                }
            }
            _ => *self = Self::random(rng),
        }
    }

    /// Whether every index field lies inside the genome
    pub fn is_valid(&self) -> bool {
        self.next < GENOME_LEN && self.op.jump_target().map_or(true, |t| t < GENOME_LEN)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.op, self.next)
    }
}

/// Cosmetic colour carried along a lineage; has no behavioural effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Tag {
    pub fn random(rng: &mut RandomSource) -> Self {
        Self {
            r: rng.int_range(0, 256) as u8,
            g: rng.int_range(0, 256) as u8,
            b: rng.int_range(0, 256) as u8,
        }
    }

    /// Small random walk in colour space
    fn drift(&mut self, rng: &mut RandomSource) {
        for channel in [&mut self.r, &mut self.g, &mut self.b] {
            let delta = rng.int_range(0, 17) as i16 - 8;
            *channel = (*channel as i16 + delta).clamp(0, 255) as u8;
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A complete program plus its display tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    instructions: [Instruction; GENOME_LEN],
    pub tag: Tag,
}

impl Genome {
    /// Build a genome from explicit instructions.
    ///
    /// Panics if any index field falls outside the genome.
    pub fn from_instructions(instructions: [Instruction; GENOME_LEN], tag: Tag) -> Self {
        for (i, instruction) in instructions.iter().enumerate() {
            assert!(
                instruction.is_valid(),
                "instruction {} has an index outside [0, {}): {}",
                i,
                GENOME_LEN,
                instruction
            );
        }
        Self { instructions, tag }
    }

    /// Every slot holds `instruction`
    pub fn uniform(instruction: Instruction) -> Self {
        Self::from_instructions([instruction; GENOME_LEN], Tag::default())
    }

    /// Replace one slot, keeping the rest
    pub fn with(mut self, slot: usize, instruction: Instruction) -> Self {
        assert!(slot < GENOME_LEN, "slot {} outside genome", slot);
        assert!(instruction.is_valid(), "invalid instruction {}", instruction);
        self.instructions[slot] = instruction;
        self
    }

    /// Fully random program
    pub fn random(rng: &mut RandomSource) -> Self {
        let instructions = std::array::from_fn(|_| Instruction::random(rng));
        Self {
            instructions,
            tag: Tag::random(rng),
        }
    }

    /// Point-mutate each slot with probability `rate` and drift the tag
    pub fn mutate(&mut self, rng: &mut RandomSource, rate: f64) {
        for instruction in &mut self.instructions {
            if rng.unit() < rate {
                instruction.mutate(rng);
            }
        }
        self.tag.drift(rng);
    }

    /// Whether every slot only references slots inside the genome
    pub fn is_valid(&self) -> bool {
        self.instructions.iter().all(Instruction::is_valid)
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction; GENOME_LEN] {
        &self.instructions
    }

    /// Number of slots that differ from `other`
    pub fn distance(&self, other: &Genome) -> usize {
        self.instructions
            .iter()
            .zip(other.instructions.iter())
            .filter(|(a, b)| a != b)
            .count()
    }
}

impl Index<usize> for Genome {
    type Output = Instruction;

    #[inline]
    fn index(&self, slot: usize) -> &Instruction {
        &self.instructions[slot]
    }
}
