use std::fs;
use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use super::composition::{DatasetSource, FoodCompositionRecord};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read dataset file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Parses a numeric dataset field. Blank, "-" and non-numeric values all
/// resolve to 0.0 rather than an error, matching the reference datasets'
/// convention for missing measurements.
pub fn parse_grams(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }
    trimmed.parse::<f64>().unwrap_or(0.0)
}

/// Splits one CSV line into fields, honoring double-quoted fields with
/// embedded commas and doubled-quote escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Maps one IFCT2017 row to a record. Energy arrives in kJ and is converted
/// to kcal (1 kcal = 4.184 kJ), rounded to 2 decimals.
fn parse_ifct_row(fields: &[String]) -> Option<FoodCompositionRecord> {
    if fields.len() < 21 {
        return None;
    }

    let energy_kj = parse_grams(&fields[20]);
    let scientific = fields[2].trim();

    Some(FoodCompositionRecord {
        code: fields[0].trim().to_string(),
        name: fields[1].trim().to_string(),
        scientific_name: if scientific.is_empty() {
            None
        } else {
            Some(scientific.to_string())
        },
        energy_kcal: (energy_kj / 4.184 * 100.0).round() / 100.0,
        protein: parse_grams(&fields[6]),
        total_fat: parse_grams(&fields[10]),
        carbohydrate: parse_grams(&fields[18]),
        total_fiber: parse_grams(&fields[12]),
        source: DatasetSource::Ifct2017,
    })
}

/// Maps one Anuvaad INDB 2024.11 row to a record. Energy is already in kcal.
/// Columns: 0 food_code, 1 food_name, 4 energy_kcal, 5 carb_g, 6 protein_g,
/// 7 fat_g, 9 fibre_g.
fn parse_anuvaad_row(fields: &[String]) -> Option<FoodCompositionRecord> {
    if fields.len() < 10 {
        return None;
    }

    Some(FoodCompositionRecord {
        code: fields[0].trim().to_string(),
        name: fields[1].trim().to_string(),
        scientific_name: None,
        energy_kcal: parse_grams(&fields[4]),
        protein: parse_grams(&fields[6]),
        total_fat: parse_grams(&fields[7]),
        carbohydrate: parse_grams(&fields[5]),
        total_fiber: parse_grams(&fields[9]),
        source: DatasetSource::AnuvaadIndb2024,
    })
}

/// Parses the body of a dataset (header already removed) into records,
/// skipping malformed rows individually. A bad row never aborts the load.
pub fn parse_dataset(contents: &str, source: DatasetSource) -> Vec<FoodCompositionRecord> {
    let mut records = Vec::new();

    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let parsed = match source {
            DatasetSource::Ifct2017 => parse_ifct_row(&fields),
            DatasetSource::AnuvaadIndb2024 => parse_anuvaad_row(&fields),
        };
        match parsed {
            Some(record) => records.push(record),
            None => {
                let name = fields.get(1).map(String::as_str).unwrap_or("Unknown");
                warn!("Skipping malformed {} row for food: {}", source.as_str(), name);
            }
        }
    }

    records
}

/// Reads and parses one dataset file from disk.
pub fn ingest_file(
    path: &Path,
    source: DatasetSource,
) -> Result<Vec<FoodCompositionRecord>, IngestError> {
    let contents = fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    let records = parse_dataset(&contents, source);
    info!(
        "Successfully loaded {} food items from {}",
        records.len(),
        source.as_str()
    );
    Ok(records)
}
