use serde::{Deserialize, Serialize};

use crate::nutrition::resolver::ResolvedNutrition;
use crate::nutrition::resolver::round2;

/// Stage 1 output: one dish spotted in the meal photo, with a gram portion
/// estimate and the visual reasoning behind it. Lives only for one pipeline
/// run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDish {
    pub dish_name: String,
    pub portion_grams: u32,
    pub confidence: f64,
    #[serde(default)]
    pub visual_cues: String,
    #[serde(default)]
    pub category: String,
}

/// Stage 2 output: the ingredient list for one detected dish. Ingredient
/// quantities should approximate `total_portion_grams` but this is a model
/// guideline, not validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DishBreakdown {
    pub dish_name: String,
    #[serde(default)]
    pub total_portion_grams: u32,
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub cooking_method: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub name: String,
    pub quantity_grams: u32,
    #[serde(default)]
    pub category: String,
}

/// One ingredient of a food item with its resolved, quantity-scaled
/// nutrition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInfo {
    pub name: String,
    pub quantity_grams: u32,
    pub category: String,
    pub nutrition: ResolvedNutrition,
}

/// A fully processed dish: Stage 1 detection plus Stage 2 breakdown plus
/// resolved nutrition. The dish nutrition is the exact sum of its ingredient
/// breakdown, never an independent estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    pub name: String,
    pub quantity: u32,
    pub confidence: f64,
    pub visual_cues: String,
    pub category: String,
    pub nutrition: ResolvedNutrition,
    pub ingredient_breakdown: Vec<IngredientInfo>,
}

/// Meal-level totals over all successfully processed dishes. Failed dishes
/// are excluded from the sum, not zero-filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbohydrates: f64,
    pub total_fat: f64,
    pub total_fiber: f64,
    pub total_sugar: f64,
}

impl NutritionSummary {
    pub fn from_items(items: &[FoodItem]) -> Self {
        let mut total = ResolvedNutrition::default();
        for item in items {
            total.add(&item.nutrition);
        }
        Self {
            total_calories: round2(total.calories),
            total_protein: round2(total.protein),
            total_carbohydrates: round2(total.carbohydrates),
            total_fat: round2(total.fat),
            total_fiber: round2(total.fiber),
            total_sugar: round2(total.sugar),
        }
    }
}

/// Terminal output of one pipeline run. An empty `detected_foods` with an
/// all-zero summary is a degraded-but-successful run, distinct from a Stage 1
/// failure which produces no result at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysisResult {
    pub detected_foods: Vec<FoodItem>,
    pub nutrition_summary: NutritionSummary,
}
