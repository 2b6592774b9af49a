pub mod breakdown;
pub mod identify;
pub mod orchestrator;
pub mod prompts;
pub mod types;

use thiserror::Error;

pub use breakdown::DishBreakdownStage;
pub use identify::DishIdentificationStage;
pub use orchestrator::PipelineOrchestrator;
pub use types::{DetectedDish, DishBreakdown, FoodItem, MealAnalysisResult, NutritionSummary};

/// Failure of a single model-backed stage. At Stage 1 this fails the whole
/// run; at Stage 2 the orchestrator isolates it to the affected dish.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("model call failed: {0}")]
    ModelCall(anyhow::Error),
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    #[error("failed to parse model response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Failure of the whole pipeline run. Only dish identification can fail the
/// run; everything after it degrades per dish instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("dish identification failed: {0}")]
    Identification(#[source] StageError),
}

/// Removes markdown code fencing the model tends to wrap around its JSON.
pub(crate) fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}
