use std::sync::Arc;

use log::{error, info, warn};

use crate::pipeline::PipelineOrchestrator;
use crate::storage::{MealRecord, MealRecordStore, StoreError};

/// Runs the analysis pipeline off the upload path. `submit` persists an
/// UPLOADED record and returns immediately; the pipeline executes as an
/// independent task that mutates the record exactly once at completion.
pub struct AnalysisService {
    store: Arc<dyn MealRecordStore>,
    orchestrator: Arc<PipelineOrchestrator>,
}

impl AnalysisService {
    pub fn new(store: Arc<dyn MealRecordStore>, orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { store, orchestrator }
    }

    /// Stores the uploaded image's record and spawns the analysis run.
    /// Concurrent submissions produce independent records and independent,
    /// unordered runs.
    pub async fn submit(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<MealRecord, StoreError> {
        let record = self.store.insert_uploaded(file_name, mime_type).await?;

        let store = Arc::clone(&self.store);
        let orchestrator = Arc::clone(&self.orchestrator);
        let id = record.id.clone();
        let mime_type = mime_type.to_string();
        tokio::spawn(async move {
            run_analysis(store, orchestrator, id, image, mime_type).await;
        });

        Ok(record)
    }

    /// Same unit of work as the spawned path, awaited in place. Used by the
    /// CLI where there is no caller to return to early.
    pub async fn analyze_and_store(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<MealRecord, StoreError> {
        let record = self.store.insert_uploaded(file_name, mime_type).await?;
        run_analysis(
            Arc::clone(&self.store),
            Arc::clone(&self.orchestrator),
            record.id.clone(),
            image,
            mime_type.to_string(),
        )
        .await;

        Ok(self
            .store
            .find(&record.id)
            .await?
            .ok_or_else(|| StoreError::NotFound(record.id))?)
    }
}

/// One pipeline run against one meal record: PROCESSING before Stage 1, then
/// a single terminal transition to ANALYZED (even when individual dishes
/// failed) or FAILED (Stage 1 or unexpected error, message retained).
async fn run_analysis(
    store: Arc<dyn MealRecordStore>,
    orchestrator: Arc<PipelineOrchestrator>,
    id: String,
    image: Vec<u8>,
    mime_type: String,
) {
    info!("Starting async two-stage nutrition analysis for meal image: {}", id);

    if let Err(e) = store.mark_processing(&id).await {
        error!("Could not mark meal image {} as processing: {}", id, e);
        return;
    }

    match orchestrator.analyze(&image, &mime_type).await {
        Ok(result) => {
            if result.detected_foods.is_empty() {
                warn!("Analysis for meal image {} produced no dishes", id);
            }
            if let Err(e) = store.mark_analyzed(&id, &result).await {
                error!("Could not store analysis for meal image {}: {}", id, e);
            } else {
                info!("Analysis completed for meal image: {}", id);
            }
        }
        Err(e) => {
            error!("Error analyzing meal image {}: {}", id, e);
            if let Err(store_err) = store.mark_failed(&id, &e.to_string()).await {
                error!("Could not mark meal image {} as failed: {}", id, store_err);
            }
        }
    }
}
