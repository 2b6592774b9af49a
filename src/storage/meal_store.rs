use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::pipeline::types::{FoodItem, MealAnalysisResult, NutritionSummary};

/// Lifecycle of a meal record: Uploaded -> Processing -> {Analyzed | Failed}.
/// Analyzed and Failed are terminal; re-analysis requires a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealStatus {
    Uploaded,
    Processing,
    Analyzed,
    Failed,
}

impl MealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealStatus::Uploaded => "UPLOADED",
            MealStatus::Processing => "PROCESSING",
            MealStatus::Analyzed => "ANALYZED",
            MealStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MealStatus::Analyzed | MealStatus::Failed)
    }

    pub fn can_transition_to(&self, next: MealStatus) -> bool {
        matches!(
            (self, next),
            (MealStatus::Uploaded, MealStatus::Processing)
                | (MealStatus::Processing, MealStatus::Analyzed)
                | (MealStatus::Processing, MealStatus::Failed)
        )
    }
}

impl FromStr for MealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(MealStatus::Uploaded),
            "PROCESSING" => Ok(MealStatus::Processing),
            "ANALYZED" => Ok(MealStatus::Analyzed),
            "FAILED" => Ok(MealStatus::Failed),
            other => Err(format!("unknown meal status: {}", other)),
        }
    }
}

/// Durable record of one uploaded meal image and its analysis outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealRecord {
    pub id: String,
    pub file_name: String,
    pub mime_type: String,
    pub status: MealStatus,
    pub detected_foods: Option<Vec<FoodItem>>,
    pub nutrition_summary: Option<NutritionSummary>,
    pub uploaded_at: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("meal record not found: {0}")]
    NotFound(String),
    #[error("illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition { from: MealStatus, to: MealStatus },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt meal record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Persistence collaborator for meal records. The pipeline drives status
/// transitions through this trait; the core never touches the schema
/// directly.
#[async_trait]
pub trait MealRecordStore: Send + Sync {
    async fn insert_uploaded(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> Result<MealRecord, StoreError>;

    async fn mark_processing(&self, id: &str) -> Result<(), StoreError>;

    async fn mark_analyzed(&self, id: &str, result: &MealAnalysisResult) -> Result<(), StoreError>;

    async fn mark_failed(&self, id: &str, message: &str) -> Result<(), StoreError>;

    async fn find(&self, id: &str) -> Result<Option<MealRecord>, StoreError>;
}

/// SQLite-backed meal record store. Analysis payloads are stored as JSON
/// columns; timestamps as RFC 3339 text.
#[derive(Clone)]
pub struct SqliteMealStore {
    conn: Arc<Connection>,
}

type MealRow = (
    String,         // id
    String,         // file_name
    String,         // mime_type
    String,         // status
    Option<String>, // detected_foods JSON
    Option<String>, // nutrition_summary JSON
    String,         // uploaded_at
    Option<String>, // analyzed_at
    Option<String>, // error_message
);

impl SqliteMealStore {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path).await?;
        let store = Self {
            conn: Arc::new(conn),
        };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        let store = Self {
            conn: Arc::new(conn),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE IF NOT EXISTS meal_images (
                        id TEXT PRIMARY KEY,
                        file_name TEXT NOT NULL,
                        mime_type TEXT NOT NULL,
                        status TEXT NOT NULL,
                        detected_foods TEXT,
                        nutrition_summary TEXT,
                        uploaded_at TEXT NOT NULL,
                        analyzed_at TEXT,
                        error_message TEXT
                    );",
                )
            })
            .await?;

        info!("Meal store initialized successfully");
        Ok(())
    }

    async fn fetch_row(&self, id: String) -> Result<Option<MealRow>, StoreError> {
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, file_name, mime_type, status, detected_foods,
                            nutrition_summary, uploaded_at, analyzed_at, error_message
                     FROM meal_images WHERE id = ?",
                )?;
                let mut rows = stmt.query([&id])?;

                if let Some(row) = rows.next()? {
                    Ok(Some((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    )))
                } else {
                    Ok(None)
                }
            })
            .await?;

        Ok(row)
    }

    fn record_from_row(row: MealRow) -> Result<MealRecord, StoreError> {
        let (
            id,
            file_name,
            mime_type,
            status,
            foods,
            summary,
            uploaded_at,
            analyzed_at,
            error_message,
        ) = row;

        let corrupt = |reason: String| StoreError::Corrupt {
            id: id.clone(),
            reason,
        };

        let status = MealStatus::from_str(&status).map_err(&corrupt)?;
        let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);
        let analyzed_at = match analyzed_at {
            Some(ts) => Some(
                DateTime::parse_from_rfc3339(&ts)
                    .map_err(|e| corrupt(e.to_string()))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };
        let detected_foods = foods.map(|json| serde_json::from_str(&json)).transpose()?;
        let nutrition_summary = summary.map(|json| serde_json::from_str(&json)).transpose()?;

        Ok(MealRecord {
            id,
            file_name,
            mime_type,
            status,
            detected_foods,
            nutrition_summary,
            uploaded_at,
            analyzed_at,
            error_message,
        })
    }

    /// Applies one status transition, enforcing the state machine: no
    /// transition leaves Analyzed or Failed.
    async fn transition(
        &self,
        id: &str,
        to: MealStatus,
        detected_foods: Option<String>,
        nutrition_summary: Option<String>,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let current = self
            .fetch_row(id.to_string())
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let from = MealStatus::from_str(&current.3).map_err(|reason| StoreError::Corrupt {
            id: id.to_string(),
            reason,
        })?;
        if !from.can_transition_to(to) {
            return Err(StoreError::IllegalTransition { from, to });
        }

        let analyzed_at = (to == MealStatus::Analyzed).then(|| Utc::now().to_rfc3339());
        let id = id.to_string();
        let status = to.as_str().to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE meal_images
                     SET status = ?1, detected_foods = ?2, nutrition_summary = ?3,
                         analyzed_at = ?4, error_message = ?5
                     WHERE id = ?6",
                    [
                        Some(status),
                        detected_foods,
                        nutrition_summary,
                        analyzed_at,
                        error_message,
                        Some(id),
                    ],
                )
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl MealRecordStore for SqliteMealStore {
    async fn insert_uploaded(
        &self,
        file_name: &str,
        mime_type: &str,
    ) -> Result<MealRecord, StoreError> {
        let record = MealRecord {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            status: MealStatus::Uploaded,
            detected_foods: None,
            nutrition_summary: None,
            uploaded_at: Utc::now(),
            analyzed_at: None,
            error_message: None,
        };

        let id = record.id.clone();
        let file_name = record.file_name.clone();
        let mime_type = record.mime_type.clone();
        let uploaded_at = record.uploaded_at.to_rfc3339();
        let status = MealStatus::Uploaded.as_str().to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO meal_images (id, file_name, mime_type, status, uploaded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    [&id, &file_name, &mime_type, &status, &uploaded_at],
                )
            })
            .await?;

        Ok(record)
    }

    async fn mark_processing(&self, id: &str) -> Result<(), StoreError> {
        self.transition(id, MealStatus::Processing, None, None, None).await
    }

    async fn mark_analyzed(&self, id: &str, result: &MealAnalysisResult) -> Result<(), StoreError> {
        let detected_foods = serde_json::to_string(&result.detected_foods)?;
        let nutrition_summary = serde_json::to_string(&result.nutrition_summary)?;
        self.transition(
            id,
            MealStatus::Analyzed,
            Some(detected_foods),
            Some(nutrition_summary),
            None,
        )
        .await
    }

    async fn mark_failed(&self, id: &str, message: &str) -> Result<(), StoreError> {
        self.transition(id, MealStatus::Failed, None, None, Some(message.to_string()))
            .await
    }

    async fn find(&self, id: &str) -> Result<Option<MealRecord>, StoreError> {
        match self.fetch_row(id.to_string()).await? {
            Some(row) => Ok(Some(Self::record_from_row(row)?)),
            None => Ok(None),
        }
    }
}
