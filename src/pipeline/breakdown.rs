use std::time::Duration;

use log::{debug, info};
use tokio::time::timeout;

use super::types::DishBreakdown;
use super::{prompts, strip_code_fences, StageError};
use crate::providers::ModelClient;

const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Stage 2: one text-generation call per detected dish, parsed into its
/// ingredient list. Failures here are per-dish; the orchestrator catches them
/// and keeps processing the remaining dishes.
pub struct DishBreakdownStage {
    client: Box<dyn ModelClient>,
    timeout: Duration,
}

impl DishBreakdownStage {
    pub fn new(client: Box<dyn ModelClient>) -> Self {
        Self {
            client,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn breakdown(
        &self,
        dish_name: &str,
        portion_grams: u32,
    ) -> Result<DishBreakdown, StageError> {
        let prompt = prompts::stage2_prompt(dish_name, portion_grams);
        let call = self.client.generate_from_text(&prompt);
        let raw = timeout(self.timeout, call)
            .await
            .map_err(|_| StageError::Timeout(self.timeout.as_secs()))?
            .map_err(StageError::ModelCall)?;

        let cleaned = strip_code_fences(&raw);
        debug!("Stage 2 response for {}: {}", dish_name, cleaned);
        if cleaned.is_empty() {
            return Err(StageError::EmptyResponse);
        }

        let breakdown: DishBreakdown = serde_json::from_str(&cleaned)?;
        info!(
            "Stage 2 complete: {} has {} ingredients",
            dish_name,
            breakdown.ingredients.len()
        );
        Ok(breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::CannedModelClient;

    const DAL_BREAKDOWN: &str = r#"```json
{
  "dishName": "Dal Makhani",
  "totalPortionGrams": 200,
  "ingredients": [
    {"name": "Black lentils", "quantityGrams": 80, "category": "protein"},
    {"name": "Butter", "quantityGrams": 15, "category": "fat"},
    {"name": "Spices", "quantityGrams": 5, "category": "seasoning"}
  ],
  "cookingMethod": "slow_cooked",
  "confidence": 0.9
}
```"#;

    #[tokio::test]
    async fn parses_fenced_breakdown_object() {
        let stage = DishBreakdownStage::new(CannedModelClient::returning(DAL_BREAKDOWN).boxed());
        let breakdown = stage.breakdown("Dal Makhani", 200).await.unwrap();
        assert_eq!(breakdown.ingredients.len(), 3);
        assert_eq!(breakdown.ingredients[0].quantity_grams, 80);
        assert_eq!(breakdown.cooking_method, "slow_cooked");
    }

    #[tokio::test]
    async fn quantity_drift_from_portion_is_tolerated() {
        // Ingredients sum to 100g against a declared 200g portion; the stage
        // does not enforce the guideline.
        let stage = DishBreakdownStage::new(CannedModelClient::returning(DAL_BREAKDOWN).boxed());
        let breakdown = stage.breakdown("Dal Makhani", 200).await.unwrap();
        let total: u32 = breakdown.ingredients.iter().map(|i| i.quantity_grams).sum();
        assert_eq!(total, 100);
        assert_eq!(breakdown.total_portion_grams, 200);
    }

    #[tokio::test]
    async fn malformed_response_is_a_stage_failure() {
        let stage = DishBreakdownStage::new(
            CannedModelClient::returning("{\"ingredients\": \"lots\"}").boxed(),
        );
        let err = stage.breakdown("Biryani", 250).await.unwrap_err();
        assert!(matches!(err, StageError::Parse(_)));
    }
}
