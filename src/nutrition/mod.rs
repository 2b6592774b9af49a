pub mod composition;
pub mod ingest;
pub mod index;
pub mod resolver;

pub use composition::{DatasetSource, FoodCompositionRecord};
pub use index::FoodCompositionIndex;
pub use resolver::{NutritionResolver, ResolveOutcome, ResolvedNutrition};
