use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{error, info};

use super::breakdown::DishBreakdownStage;
use super::identify::DishIdentificationStage;
use super::types::{DetectedDish, FoodItem, IngredientInfo, MealAnalysisResult, NutritionSummary};
use super::{PipelineError, StageError};
use crate::nutrition::resolver::{NutritionResolver, ResolvedNutrition};
use crate::providers::ModelClient;

const DEFAULT_DISH_CONCURRENCY: usize = 3;

/// A dish that could not be processed, carrying the stage error for logging.
/// Failed dishes are excluded from the meal aggregate, never zero-filled.
#[derive(Debug)]
pub struct DishFailure {
    pub dish_name: String,
    pub error: StageError,
}

/// Sequences the three stages: identify dishes, break each one down, resolve
/// every ingredient. Stage 1 failure fails the run; per-dish failures are
/// collected and skipped so one bad dish never aborts the batch.
pub struct PipelineOrchestrator {
    identification: DishIdentificationStage,
    breakdown: DishBreakdownStage,
    resolver: Arc<NutritionResolver>,
    dish_concurrency: usize,
}

impl PipelineOrchestrator {
    pub fn new(client: Box<dyn ModelClient>, resolver: Arc<NutritionResolver>) -> Self {
        Self {
            identification: DishIdentificationStage::new(client.clone_box()),
            breakdown: DishBreakdownStage::new(client),
            resolver,
            dish_concurrency: DEFAULT_DISH_CONCURRENCY,
        }
    }

    /// Bounds the number of Stage 2 calls in flight. 1 means strictly
    /// sequential processing.
    pub fn with_dish_concurrency(mut self, concurrency: usize) -> Self {
        self.dish_concurrency = concurrency.max(1);
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.identification = self.identification.with_timeout(timeout);
        self.breakdown = self.breakdown.with_timeout(timeout);
        self
    }

    pub async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<MealAnalysisResult, PipelineError> {
        info!("Starting two-stage nutrition analysis...");

        let dishes = self
            .identification
            .identify(image, mime_type)
            .await
            .map_err(PipelineError::Identification)?;

        // Per-dish processing preserves dish order; `buffered` keeps the
        // number of in-flight model calls bounded.
        let outcomes: Vec<Result<FoodItem, DishFailure>> = stream::iter(dishes)
            .map(|dish| self.process_dish(dish))
            .buffered(self.dish_concurrency)
            .collect()
            .await;

        let mut detected_foods = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(item) => detected_foods.push(item),
                Err(failure) => {
                    error!("Error processing dish {}: {}", failure.dish_name, failure.error);
                }
            }
        }

        let nutrition_summary = NutritionSummary::from_items(&detected_foods);
        info!(
            "Analysis complete. Total calories: {}",
            nutrition_summary.total_calories
        );

        Ok(MealAnalysisResult {
            detected_foods,
            nutrition_summary,
        })
    }

    async fn process_dish(&self, dish: DetectedDish) -> Result<FoodItem, DishFailure> {
        info!("Processing dish: {} ({}g)", dish.dish_name, dish.portion_grams);

        let breakdown = self
            .breakdown
            .breakdown(&dish.dish_name, dish.portion_grams)
            .await
            .map_err(|error| DishFailure {
                dish_name: dish.dish_name.clone(),
                error,
            })?;

        let mut dish_nutrition = ResolvedNutrition::default();
        let mut ingredient_breakdown = Vec::with_capacity(breakdown.ingredients.len());

        for ingredient in breakdown.ingredients {
            let nutrition = self
                .resolver
                .resolve(&ingredient.name, ingredient.quantity_grams);
            dish_nutrition.add(&nutrition);
            ingredient_breakdown.push(IngredientInfo {
                name: ingredient.name,
                quantity_grams: ingredient.quantity_grams,
                category: ingredient.category,
                nutrition,
            });
        }

        Ok(FoodItem {
            name: dish.dish_name,
            quantity: dish.portion_grams,
            confidence: dish.confidence,
            visual_cues: dish.visual_cues,
            category: dish.category,
            nutrition: dish_nutrition.rounded(),
            ingredient_breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::composition::{DatasetSource, FoodCompositionRecord};
    use crate::nutrition::index::FoodCompositionIndex;
    use crate::providers::testing::CannedModelClient;

    fn record(
        name: &str,
        kcal: f64,
        protein: f64,
        carbs: f64,
        fat: f64,
        fiber: f64,
    ) -> FoodCompositionRecord {
        FoodCompositionRecord {
            code: "T".to_string(),
            name: name.to_string(),
            scientific_name: None,
            energy_kcal: kcal,
            protein,
            total_fat: fat,
            carbohydrate: carbs,
            total_fiber: fiber,
            source: DatasetSource::Ifct2017,
        }
    }

    fn test_resolver() -> Arc<NutritionResolver> {
        Arc::new(NutritionResolver::new(Arc::new(
            FoodCompositionIndex::from_records(vec![
                record("Black gram dal", 350.0, 24.0, 58.0, 1.4, 10.0),
                record("Butter", 717.0, 0.9, 0.1, 81.0, 0.0),
                record("Rice", 130.0, 2.7, 28.0, 0.3, 0.4),
            ]),
        )))
    }

    const TWO_DISHES: &str = r#"[
        {"dishName": "Dal Makhani", "portionGrams": 200, "confidence": 0.92,
         "visualCues": "dark bowl", "category": "main_course"},
        {"dishName": "Jeera Rice", "portionGrams": 150, "confidence": 0.88,
         "visualCues": "mounded rice", "category": "main_course"}
    ]"#;

    const DAL_BREAKDOWN: &str = r#"{
        "dishName": "Dal Makhani", "totalPortionGrams": 200,
        "ingredients": [
            {"name": "Urad Dal", "quantityGrams": 80, "category": "protein"},
            {"name": "Butter", "quantityGrams": 15, "category": "fat"}
        ],
        "cookingMethod": "slow_cooked", "confidence": 0.9
    }"#;

    const RICE_BREAKDOWN: &str = r#"{
        "dishName": "Jeera Rice", "totalPortionGrams": 150,
        "ingredients": [
            {"name": "Rice", "quantityGrams": 140, "category": "carb"},
            {"name": "Exotic Foraged Root", "quantityGrams": 10, "category": "vegetable"}
        ],
        "cookingMethod": "boiled", "confidence": 0.85
    }"#;

    #[tokio::test]
    async fn aggregates_both_dishes_and_meal_summary() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_text_rule("Dal Makhani", Ok(DAL_BREAKDOWN))
            .with_text_rule("Jeera Rice", Ok(RICE_BREAKDOWN));
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver());

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        assert_eq!(result.detected_foods.len(), 2);

        // Dal: urad dal aliases to Black gram dal, 80g of 350 kcal/100g = 280.0
        let dal = &result.detected_foods[0];
        assert_eq!(dal.ingredient_breakdown[0].nutrition.calories, 280.0);
        // Butter 15g of 717 kcal/100g = 107.55
        assert_eq!(dal.ingredient_breakdown[1].nutrition.calories, 107.55);
        assert_eq!(dal.nutrition.calories, 387.55);

        // Rice dish: unresolved root contributes zeros but does not fail.
        let rice = &result.detected_foods[1];
        assert_eq!(rice.ingredient_breakdown[1].nutrition, ResolvedNutrition::ZERO);
        assert_eq!(rice.nutrition.calories, 182.0);

        assert_eq!(result.nutrition_summary.total_calories, 569.55);
    }

    #[tokio::test]
    async fn dish_nutrition_equals_sum_of_ingredient_breakdown() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_text_rule("Dal Makhani", Ok(DAL_BREAKDOWN))
            .with_text_rule("Jeera Rice", Ok(RICE_BREAKDOWN));
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver());

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        for item in &result.detected_foods {
            let mut sum = ResolvedNutrition::default();
            for ingredient in &item.ingredient_breakdown {
                sum.add(&ingredient.nutrition);
            }
            assert!((sum.calories - item.nutrition.calories).abs() < 0.01);
            assert!((sum.protein - item.nutrition.protein).abs() < 0.01);
            assert!((sum.fat - item.nutrition.fat).abs() < 0.01);
        }
    }

    #[tokio::test]
    async fn failed_dish_is_skipped_not_zero_filled() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_text_rule("Dal Makhani", Ok(DAL_BREAKDOWN))
            .with_text_rule("Jeera Rice", Err("model unavailable"));
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver());

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        assert_eq!(result.detected_foods.len(), 1);
        assert_eq!(result.detected_foods[0].name, "Dal Makhani");
        assert_eq!(result.nutrition_summary.total_calories, 387.55);
    }

    #[tokio::test]
    async fn run_with_zero_successful_dishes_still_returns_a_result() {
        let client =
            CannedModelClient::failing("model unavailable").with_image_response(TWO_DISHES);
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver());

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        assert!(result.detected_foods.is_empty());
        assert_eq!(result.nutrition_summary.total_calories, 0.0);
    }

    #[tokio::test]
    async fn stage1_failure_fails_the_whole_run() {
        let orchestrator = PipelineOrchestrator::new(
            CannedModelClient::failing("vision endpoint down").boxed(),
            test_resolver(),
        );

        let err = orchestrator.analyze(b"img", "image/jpeg").await.unwrap_err();
        let PipelineError::Identification(stage) = err;
        assert!(matches!(stage, StageError::ModelCall(_)));
    }

    #[tokio::test]
    async fn stage1_timeout_fails_the_whole_run() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_image_delay(Duration::from_millis(200));
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver())
            .with_stage_timeout(Duration::from_millis(10));

        let err = orchestrator.analyze(b"img", "image/jpeg").await.unwrap_err();
        let PipelineError::Identification(stage) = err;
        assert!(matches!(stage, StageError::Timeout(_)));
    }

    #[tokio::test]
    async fn stage2_timeout_skips_only_the_slow_dish() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_text_rule("Dal Makhani", Ok(DAL_BREAKDOWN))
            .with_text_rule("Jeera Rice", Ok(RICE_BREAKDOWN))
            .with_text_delay("Jeera Rice", Duration::from_millis(200));
        let orchestrator = PipelineOrchestrator::new(client.boxed(), test_resolver())
            .with_stage_timeout(Duration::from_millis(50));

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        assert_eq!(result.detected_foods.len(), 1);
        assert_eq!(result.detected_foods[0].name, "Dal Makhani");
        assert_eq!(result.nutrition_summary.total_calories, 387.55);
    }

    #[tokio::test]
    async fn sequential_concurrency_preserves_dish_order() {
        let client = CannedModelClient::returning("")
            .with_image_response(TWO_DISHES)
            .with_text_rule("Dal Makhani", Ok(DAL_BREAKDOWN))
            .with_text_rule("Jeera Rice", Ok(RICE_BREAKDOWN));
        let orchestrator =
            PipelineOrchestrator::new(client.boxed(), test_resolver()).with_dish_concurrency(1);

        let result = orchestrator.analyze(b"img", "image/jpeg").await.unwrap();
        let names: Vec<&str> = result.detected_foods.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Dal Makhani", "Jeera Rice"]);
    }
}
