use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;

use super::{compute_hash, Entry};

/// Why verification rejected a log file. Any variant means tampering or
/// corruption; the chain gives no finer-grained attribution than the first
/// entry that fails.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("failed to read audit log: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {0}: invalid log entry format")]
    Malformed(usize),

    #[error("line {0}: hash chain broken (prev hash mismatch)")]
    BrokenChain(usize),

    #[error("line {0}: hash mismatch (entry tampered)")]
    Tampered(usize),
}

/// Scan a log file top to bottom, checking that every entry links to its
/// predecessor and that every stored hash recomputes.
pub fn verify_log_integrity(path: &Path) -> Result<(), ChainError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut prev_hash = String::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let entry: Entry =
            serde_json::from_str(&line).map_err(|_| ChainError::Malformed(i + 1))?;

        if entry.prev_hash != prev_hash {
            return Err(ChainError::BrokenChain(i + 1));
        }
        if entry.hash != compute_hash(&entry) {
            return Err(ChainError::Tampered(i + 1));
        }
        prev_hash = entry.hash;
    }

    Ok(())
}
