//! Administrative commands accepted by the simulation between ticks.

use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Commands sent by a driver (CLI schedule, UI, ...) to the simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AdminCommand {
    /// Remove every organism inside a rectangle; `None` uses the configured reset zone
    ResetRegion(Option<Rect>),
    /// Write every live organism to a new timestamped dump file
    Dump,
}

/// What a command did
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Number of organisms removed
    Removed(usize),
    /// Path of the dump file written
    Dumped(PathBuf),
}

/// Tick-indexed schedule of commands for headless runs
#[derive(Debug, Clone, Default)]
pub struct CommandSchedule {
    entries: Vec<(u64, AdminCommand)>,
}

impl CommandSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `command` to run after tick `tick` completes
    pub fn at(mut self, tick: u64, command: AdminCommand) -> Self {
        self.entries.push((tick, command));
        self
    }

    /// Commands due once `tick` ticks have completed, in insertion order
    pub fn due(&self, tick: u64) -> impl Iterator<Item = &AdminCommand> {
        self.entries
            .iter()
            .filter(move |(t, _)| *t == tick)
            .map(|(_, c)| c)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
