pub mod config;
pub mod nutrition;
pub mod pipeline;
pub mod providers;
pub mod service;
pub mod storage;

// Re-export commonly used items
pub use config::AppConfig;
pub use nutrition::{FoodCompositionIndex, NutritionResolver, ResolvedNutrition};
pub use pipeline::{MealAnalysisResult, PipelineOrchestrator};
pub use providers::ModelClient;
pub use service::AnalysisService;
pub use storage::{MealRecordStore, MealStatus, SqliteMealStore};
