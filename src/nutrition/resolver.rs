use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use super::composition::FoodCompositionRecord;
use super::index::{normalize_name, FoodCompositionIndex};

/// Macro-nutrition for one ingredient, dish or meal. All fields are
/// non-negative and rounded to 2 decimal places; missing source data is 0.0,
/// never null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl ResolvedNutrition {
    pub const ZERO: ResolvedNutrition = ResolvedNutrition {
        calories: 0.0,
        protein: 0.0,
        carbohydrates: 0.0,
        fat: 0.0,
        fiber: 0.0,
        sugar: 0.0,
    };

    pub fn per_100g(
        calories: f64,
        protein: f64,
        carbohydrates: f64,
        fat: f64,
        fiber: f64,
        sugar: f64,
    ) -> Self {
        Self {
            calories,
            protein,
            carbohydrates,
            fat,
            fiber,
            sugar,
        }
    }

    /// Scales a per-100g reference by `quantity_grams / 100`, rounding each
    /// field to 2 decimals.
    pub fn scaled(&self, quantity_grams: u32) -> Self {
        let factor = f64::from(quantity_grams) / 100.0;
        Self {
            calories: round2(self.calories * factor),
            protein: round2(self.protein * factor),
            carbohydrates: round2(self.carbohydrates * factor),
            fat: round2(self.fat * factor),
            fiber: round2(self.fiber * factor),
            sugar: round2(self.sugar * factor),
        }
    }

    pub fn add(&mut self, other: &Self) {
        self.calories += other.calories;
        self.protein += other.protein;
        self.carbohydrates += other.carbohydrates;
        self.fat += other.fat;
        self.fiber += other.fiber;
        self.sugar += other.sugar;
    }

    pub fn rounded(&self) -> Self {
        Self {
            calories: round2(self.calories),
            protein: round2(self.protein),
            carbohydrates: round2(self.carbohydrates),
            fat: round2(self.fat),
            fiber: round2(self.fiber),
            sugar: round2(self.sugar),
        }
    }
}

impl From<&FoodCompositionRecord> for ResolvedNutrition {
    /// Per-100g view of a dataset record. Neither source dataset carries a
    /// sugar column, so sugar is always 0.0 here.
    fn from(record: &FoodCompositionRecord) -> Self {
        Self {
            calories: record.energy_kcal,
            protein: record.protein,
            carbohydrates: record.carbohydrate,
            fat: record.total_fat,
            fiber: record.total_fiber,
            sugar: 0.0,
        }
    }
}

/// Maps colloquial/regional ingredient names to a canonical dataset name.
/// Keywords match by substring containment against the lowercased input.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub keywords: Vec<&'static str>,
    pub canonical: &'static str,
}

/// Coarse per-100g estimate used when no dataset entry exists for a category
/// term (cooking oil, seasoning, water).
#[derive(Debug, Clone)]
pub struct GenericEntry {
    pub keyword: &'static str,
    pub per_100g: ResolvedNutrition,
}

fn default_aliases() -> Vec<AliasEntry> {
    fn entry(keywords: &[&'static str], canonical: &'static str) -> AliasEntry {
        AliasEntry {
            keywords: keywords.to_vec(),
            canonical,
        }
    }

    vec![
        entry(&["black lentils", "urad dal"], "Black gram dal"),
        entry(&["red lentils", "masoor dal"], "Lentil"),
        entry(&["yellow lentils", "toor dal", "arhar dal"], "Red gram dal"),
        entry(&["chickpeas", "chana"], "Bengal gram"),
        entry(&["kidney beans", "rajma"], "Kidney beans"),
        entry(&["basmati rice"], "Rice"),
        entry(&["wheat flour", "atta"], "Wheat flour"),
        entry(&["ghee", "clarified butter"], "Ghee"),
        entry(&["paneer", "cottage cheese"], "Paneer"),
        entry(&["curd", "yogurt", "dahi"], "Curd"),
        entry(&["tomato"], "Tomato"),
        entry(&["onion"], "Onion"),
        entry(&["potato"], "Potato"),
        entry(&["spinach", "palak"], "Spinach"),
        entry(&["chicken"], "Chicken"),
        entry(&["mutton", "lamb"], "Mutton"),
    ]
}

fn default_generics() -> Vec<GenericEntry> {
    vec![
        GenericEntry {
            keyword: "spices",
            per_100g: ResolvedNutrition::per_100g(5.0, 0.2, 1.0, 0.1, 0.5, 0.0),
        },
        GenericEntry {
            keyword: "water",
            per_100g: ResolvedNutrition::ZERO,
        },
        GenericEntry {
            keyword: "salt",
            per_100g: ResolvedNutrition::ZERO,
        },
        GenericEntry {
            keyword: "oil",
            per_100g: ResolvedNutrition::per_100g(884.0, 0.0, 0.0, 100.0, 0.0, 0.0),
        },
    ]
}

/// Explicit outcome of a name resolution, in place of null/exception control
/// flow: a dataset hit, a generic-category estimate, or a miss.
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Found(FoodCompositionRecord),
    Generic(ResolvedNutrition),
    Miss,
}

/// Resolves a free-text ingredient name to scaled macro-nutrition.
/// Resolution order, first hit wins: exact index match, normalized substring
/// match, alias table (re-run through the index exactly once), generic
/// fallback table, zero record.
pub struct NutritionResolver {
    index: Arc<FoodCompositionIndex>,
    aliases: Vec<AliasEntry>,
    generics: Vec<GenericEntry>,
}

impl NutritionResolver {
    pub fn new(index: Arc<FoodCompositionIndex>) -> Self {
        Self::with_tables(index, default_aliases(), default_generics())
    }

    pub fn with_tables(
        index: Arc<FoodCompositionIndex>,
        aliases: Vec<AliasEntry>,
        generics: Vec<GenericEntry>,
    ) -> Self {
        Self {
            index,
            aliases,
            generics,
        }
    }

    /// Steps 1-2: exact match, then substring match on the normalized name.
    fn lookup_index(&self, name: &str) -> Option<FoodCompositionRecord> {
        if let Some(record) = self.index.find_exact(name) {
            return Some(record.clone());
        }

        let normalized = normalize_name(name);
        self.index
            .find_containing(&normalized)
            .first()
            .map(|record| (*record).clone())
    }

    pub fn resolve_outcome(&self, name: &str) -> ResolveOutcome {
        if let Some(record) = self.lookup_index(name) {
            return ResolveOutcome::Found(record);
        }

        // Alias step re-runs the index lookup exactly once for the canonical
        // name; aliases never chain.
        let lower = name.to_lowercase();
        let alias = self
            .aliases
            .iter()
            .find(|entry| entry.keywords.iter().any(|k| lower.contains(k)));
        if let Some(entry) = alias {
            if let Some(record) = self.lookup_index(entry.canonical) {
                return ResolveOutcome::Found(record);
            }
        }

        if let Some(generic) = self
            .generics
            .iter()
            .find(|entry| lower.contains(entry.keyword))
        {
            return ResolveOutcome::Generic(generic.per_100g);
        }

        ResolveOutcome::Miss
    }

    /// Scaled nutrition for `quantity_grams` of the named ingredient. A miss
    /// resolves to the zero record and is logged, never an error.
    pub fn resolve(&self, name: &str, quantity_grams: u32) -> ResolvedNutrition {
        match self.resolve_outcome(name) {
            ResolveOutcome::Found(record) => {
                ResolvedNutrition::from(&record).scaled(quantity_grams)
            }
            ResolveOutcome::Generic(per_100g) => per_100g.scaled(quantity_grams),
            ResolveOutcome::Miss => {
                warn!("No nutrition data found for ingredient: {}", name);
                ResolvedNutrition::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::composition::DatasetSource;

    fn record(name: &str, kcal: f64, protein: f64) -> FoodCompositionRecord {
        FoodCompositionRecord {
            code: "T001".to_string(),
            name: name.to_string(),
            scientific_name: None,
            energy_kcal: kcal,
            protein,
            total_fat: 1.4,
            carbohydrate: 58.0,
            total_fiber: 10.0,
            source: DatasetSource::Ifct2017,
        }
    }

    fn resolver_with(records: Vec<FoodCompositionRecord>) -> NutritionResolver {
        NutritionResolver::new(Arc::new(FoodCompositionIndex::from_records(records)))
    }

    #[test]
    fn exact_match_scales_linearly_by_quantity() {
        let resolver = resolver_with(vec![record("Rice", 130.0, 2.7)]);
        let nutrition = resolver.resolve("rice", 150);
        assert_eq!(nutrition.calories, 195.0);
        assert_eq!(nutrition.protein, 4.05);
        assert_eq!(nutrition.sugar, 0.0);
    }

    #[test]
    fn resolution_is_linear_in_quantity() {
        let resolver = resolver_with(vec![record("Rice", 130.0, 2.7)]);
        let small = resolver.resolve("Rice", 50);
        let large = resolver.resolve("Rice", 200);
        assert!((small.calories / 50.0 - large.calories / 200.0).abs() < 0.01);
    }

    #[test]
    fn normalized_substring_match_falls_back_from_exact() {
        let resolver = resolver_with(vec![record("Spinach leaves", 23.0, 2.9)]);
        let nutrition = resolver.resolve("Fresh Spinach (chopped)", 100);
        assert_eq!(nutrition.calories, 23.0);
    }

    #[test]
    fn alias_resolves_urad_dal_through_canonical_name() {
        let resolver = resolver_with(vec![record("Black gram dal", 350.0, 24.0)]);
        let nutrition = resolver.resolve("Urad Dal", 80);
        assert_eq!(nutrition.calories, 280.0);
        assert_eq!(nutrition.protein, 19.2);
    }

    #[test]
    fn generic_fallback_covers_oil_and_salt() {
        let resolver = resolver_with(Vec::new());

        let oil = resolver.resolve("Sunflower oil", 10);
        assert_eq!(oil.calories, 88.4);
        assert_eq!(oil.fat, 10.0);

        let salt = resolver.resolve("Rock salt", 5);
        assert_eq!(salt, ResolvedNutrition::ZERO);
    }

    #[test]
    fn unresolved_ingredient_yields_zero_record() {
        let resolver = resolver_with(vec![record("Rice", 130.0, 2.7)]);
        let outcome = resolver.resolve_outcome("Exotic Foraged Root");
        assert!(matches!(outcome, ResolveOutcome::Miss));
        assert_eq!(resolver.resolve("Exotic Foraged Root", 50), ResolvedNutrition::ZERO);
    }

    #[test]
    fn alias_without_canonical_record_falls_through_to_generic_or_miss() {
        // "ghee" aliases to "Ghee" but the index is empty; no generic keyword
        // matches either, so this is a miss.
        let resolver = resolver_with(Vec::new());
        assert!(matches!(resolver.resolve_outcome("ghee"), ResolveOutcome::Miss));
    }
}
