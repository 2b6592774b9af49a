use std::path::Path;

use log::info;

use super::composition::{DatasetSource, FoodCompositionRecord};
use super::ingest::{ingest_file, IngestError};

/// In-memory index over the merged reference datasets. Built once at startup,
/// read-only afterwards; safe to share behind an `Arc` without locking.
#[derive(Debug, Default)]
pub struct FoodCompositionIndex {
    records: Vec<FoodCompositionRecord>,
}

impl FoodCompositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FoodCompositionRecord>) -> Self {
        Self { records }
    }

    /// Ingests both reference datasets. Skipped entirely when the index is
    /// already populated, so a duplicate startup cannot double-load.
    pub fn load_from_paths(
        &mut self,
        ifct_path: &Path,
        anuvaad_path: &Path,
    ) -> Result<usize, IngestError> {
        if !self.records.is_empty() {
            info!("Nutrition database already loaded. Skipping initialization.");
            return Ok(0);
        }

        info!("Loading nutrition database from CSV files...");
        let mut records = ingest_file(ifct_path, DatasetSource::Ifct2017)?;
        records.extend(ingest_file(anuvaad_path, DatasetSource::AnuvaadIndb2024)?);

        let loaded = records.len();
        self.records = records;
        Ok(loaded)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Case-insensitive exact name match; first match wins when duplicates
    /// exist across datasets.
    pub fn find_exact(&self, name: &str) -> Option<&FoodCompositionRecord> {
        self.records
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive substring match against stored names, returned in
    /// insertion order. Callers typically take the first hit.
    pub fn find_containing(&self, fragment: &str) -> Vec<&FoodCompositionRecord> {
        let fragment = fragment.to_lowercase();
        if fragment.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&fragment))
            .collect()
    }
}

/// Normalizes a free-text food name for substring matching: lowercase, strip
/// parenthetical qualifiers, drop preparation words, collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    const PREPARATION_WORDS: [&str; 5] = ["whole", "raw", "cooked", "fresh", "dried"];

    let lower = name.to_lowercase();

    let mut depth = 0usize;
    let mut stripped = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }

    stripped
        .split_whitespace()
        .filter(|token| !PREPARATION_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
