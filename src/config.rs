use std::env;
use std::path::PathBuf;

use anyhow::Result;

/// Runtime configuration, read once from the environment at startup.
/// The Gemini key is optional here so offline commands (dataset lookups)
/// work without it; the analyze path requires it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ifct_csv_path: PathBuf,
    pub anuvaad_csv_path: PathBuf,
    pub meal_db_path: PathBuf,
    pub stage_timeout_secs: u64,
    pub max_concurrent_dishes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            ifct_csv_path: env::var("IFCT_CSV_PATH")
                .unwrap_or_else(|_| "data/ifct2017_compositions.csv".to_string())
                .into(),
            anuvaad_csv_path: env::var("ANUVAAD_CSV_PATH")
                .unwrap_or_else(|_| "data/Anuvaad_INDB_2024.11.csv".to_string())
                .into(),
            meal_db_path: env::var("MEAL_DB_PATH")
                .unwrap_or_else(|_| "meals.db".to_string())
                .into(),
            stage_timeout_secs: env::var("STAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            max_concurrent_dishes: env::var("MAX_CONCURRENT_DISHES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        })
    }
}
