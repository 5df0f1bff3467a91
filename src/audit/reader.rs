use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::Entry;

/// Read at most the last `n` entries, oldest first. Skips chain validation
/// and malformed lines; a missing file yields an empty list. This is the
/// cheap read path for the dashboard tail, not an integrity check.
pub fn read_last_entries(path: &Path, n: usize) -> Vec<Entry> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };

    let mut entries: Vec<Entry> = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str(&line).ok())
        .collect();

    if entries.len() > n {
        entries.drain(..entries.len() - n);
    }
    entries
}
