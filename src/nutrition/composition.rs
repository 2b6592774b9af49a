use serde::{Deserialize, Serialize};

/// One row of a food-composition reference dataset: a food name and its
/// nutrition per 100g. Records are immutable once ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodCompositionRecord {
    pub code: String,
    pub name: String,
    pub scientific_name: Option<String>,
    pub energy_kcal: f64,
    pub protein: f64,
    pub total_fat: f64,
    pub carbohydrate: f64,
    pub total_fiber: f64,
    pub source: DatasetSource,
}

/// Which reference dataset a record was ingested from. Both datasets coexist
/// in the index; near-duplicate foods across them are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetSource {
    #[serde(rename = "IFCT2017")]
    Ifct2017,
    #[serde(rename = "Anuvaad_INDB_2024")]
    AnuvaadIndb2024,
}

impl DatasetSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetSource::Ifct2017 => "IFCT2017",
            DatasetSource::AnuvaadIndb2024 => "Anuvaad_INDB_2024",
        }
    }
}
