//! Human-readable debug dump of every live organism.
//!
//! One record per organism in live order: position, heading, energy, buffer,
//! instruction pointer and the full program. Records are separated by a blank
//! line and a rule. Each dump goes to its own timestamped file.

use crate::organism::Organism;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const RULE: &str = "----------------------------------------";

/// Errors that can occur while writing a dump
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("dump I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render one organism record
pub fn render_organism(out: &mut String, org: &Organism) {
    let buffer: Vec<String> = org.buffer.iter().map(|t| t.to_string()).collect();

    // writing into a String cannot fail
    let _ = writeln!(
        out,
        "organism {} (lineage {}, generation {}, tag {})",
        org.id, org.lineage_id, org.generation, org.genome.tag
    );
    let _ = writeln!(out, "position: {} {}", org.position.x, org.position.y);
    let _ = writeln!(out, "angle: {}", org.angle);
    let _ = writeln!(out, "energy: {}", org.energy);
    let _ = writeln!(out, "buffer: [{}]", buffer.join(", "));
    let _ = writeln!(out, "ip: {}", org.ip);
    for (i, instruction) in org.genome.instructions().iter().enumerate() {
        let _ = writeln!(out, "{:2}: {}", i, instruction);
    }
}

/// Render all records in iteration order
pub fn render<'a, I>(organisms: I) -> String
where
    I: IntoIterator<Item = &'a Organism>,
{
    let mut out = String::new();
    for org in organisms {
        render_organism(&mut out, org);
        out.push('\n');
        out.push_str(RULE);
        out.push('\n');
    }
    out
}

/// Timestamped file name for a new dump
fn dump_file_name(attempt: u32) -> String {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
    if attempt == 0 {
        format!("dump-{}.txt", stamp)
    } else {
        format!("dump-{}-{}.txt", stamp, attempt)
    }
}

/// Write `contents` to a fresh timestamped file in `dir`, never overwriting
pub fn write_dump(dir: &Path, contents: &str) -> Result<PathBuf, DumpError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| DumpError::Io { path, source }
    };

    std::fs::create_dir_all(dir).map_err(io_err(dir))?;

    let mut attempt = 0;
    let (path, mut file) = loop {
        let path = dir.join(dump_file_name(attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => break (path, file),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(io_err(&path)(e)),
        }
    };

    file.write_all(contents.as_bytes()).map_err(io_err(&path))?;
    log::info!("State dumped to {}", path.display());
    Ok(path)
}
