/// Stage 1 instruction: identify every distinct dish with a gram portion
/// estimate. The model is asked to self-filter below 0.7 confidence; the
/// pipeline does not re-validate that threshold.
pub fn stage1_prompt() -> &'static str {
    r#"You are an expert Indian food nutritionist analyzing a meal image.

TASK:
1. Identify ALL distinct dishes/food items visible in the image
2. For EACH item, provide:
   - Specific dish name (e.g., "Dal Makhani" not just "Dal")
   - Estimated portion size in grams
   - Confidence score (0.0 to 1.0)
   - Visual reasoning for portion estimate

PORTION ESTIMATION GUIDELINES:
- Use plate/bowl size as reference (standard plate ~25cm diameter)
- Use utensils for scale (spoon ~15cm)
- Consider depth/height of food
- Common serving sizes:
  * Rice/Biryani: 150-250g (1-1.5 cups)
  * Dal/Curry: 150-200g (1 bowl)
  * Roti/Naan: 40-60g each
  * Sabzi: 100-150g
  * Raita: 50-100g
  * Desserts: 50-100g

DISH SPECIFICITY:
- Don't say "Dal" -> Say "Dal Makhani" or "Dal Tadka" or "Sambar"
- Don't say "Rice" -> Say "Jeera Rice" or "Plain Rice" or "Biryani"
- Don't say "Curry" -> Say "Paneer Butter Masala" or "Chicken Curry"
- Don't say "Bread" -> Say "Roti" or "Naan" or "Paratha"

OUTPUT FORMAT (JSON only, no markdown):
[
  {
    "dishName": "Dal Makhani",
    "portionGrams": 200,
    "confidence": 0.92,
    "visualCues": "Medium-sized bowl, approximately 1 cup, dark brown color with cream",
    "category": "main_course"
  }
]

IMPORTANT:
- Be as specific as possible with dish names
- Use visual cues (color, texture, garnish) to identify exact dish
- If unsure between similar dishes, choose most common variant
- Only include items you can clearly see
- Minimum confidence threshold: 0.7"#
}

/// Stage 2 instruction: break one dish into base ingredients whose gram
/// quantities should approximately sum to the portion. Approximate only;
/// drift is tolerated downstream.
pub fn stage2_prompt(dish_name: &str, portion_grams: u32) -> String {
    format!(
        r#"You are an expert Indian chef and nutritionist.

TASK: Break down the following dish into its base ingredients with estimated quantities.

DISH: {dish_name}
TOTAL PORTION: {portion_grams}g

REQUIREMENTS:
1. List ALL major ingredients (>5% of total weight)
2. Provide quantity in grams for each ingredient
3. Quantities should sum to approximately the total portion
4. Use standard recipe proportions for Indian cuisine
5. Include cooking medium (oil/ghee/butter)

INGREDIENT CATEGORIES TO INCLUDE:
- Main ingredient (lentils, rice, vegetables, meat)
- Cooking medium (oil, ghee, butter)
- Dairy (cream, yogurt, paneer)
- Vegetables/aromatics (onion, tomato, garlic, ginger)
- Spices (combined weight)

OUTPUT FORMAT (JSON only, no markdown):
{{
  "dishName": "{dish_name}",
  "totalPortionGrams": {portion_grams},
  "ingredients": [
    {{
      "name": "Black lentils",
      "quantityGrams": 80,
      "category": "protein"
    }},
    {{
      "name": "Butter",
      "quantityGrams": 15,
      "category": "fat"
    }}
  ],
  "cookingMethod": "slow_cooked",
  "confidence": 0.90
}}

Be precise and realistic with quantities. Ingredients should sum to approximately {portion_grams}g."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage2_prompt_carries_dish_and_portion() {
        let prompt = stage2_prompt("Dal Makhani", 200);
        assert!(prompt.contains("DISH: Dal Makhani"));
        assert!(prompt.contains("TOTAL PORTION: 200g"));
        assert!(prompt.contains("\"totalPortionGrams\": 200"));
    }
}
