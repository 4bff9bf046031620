//! Meal plans built without the generator.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::model::{split_calories, Meal, MealType};
use crate::error::FallbackError;
use crate::nutrition::NutritionTable;

/// Targets below this get lunch and dinner only.
pub const FALLBACK_THRESHOLD: u32 = 1200;

type DishSet = &'static [&'static str];

const BREAKFAST_OPTIONS: &[DishSet] = &[
    &["ご飯", "納豆", "ほうれん草のお浸し"],
    &["食パン", "目玉焼き", "野菜サラダ"],
    &["ご飯", "焼き鮭", "きんぴらごぼう"],
    &["オートミール", "ヨーグルト", "バナナ"],
];

const LUNCH_OPTIONS: &[DishSet] = &[
    &["ご飯", "鶏の照り焼き", "野菜炒め", "わかめの味噌汁"],
    &["ご飯", "豚の生姜焼き", "きゅうりの酢の物", "豆腐の味噌汁"],
    &["ご飯", "鮭の塩焼き", "ひじきの煮物", "卵スープ"],
    &["ご飯", "ハンバーグ", "コールスロー", "コンソメスープ"],
];

const DINNER_OPTIONS: &[DishSet] = &[
    &["ご飯", "鮭の西京焼き", "きんぴらごぼう", "わかめの味噌汁"],
    &["ご飯", "鶏肉と野菜の煮物", "切り干し大根", "豆腐の味噌汁"],
    &["ご飯", "ぶりの照り焼き", "ほうれん草のごま和え", "なめこの味噌汁"],
    &["ご飯", "豚肉と茄子の味噌炒め", "もやしのナムル", "わかめスープ"],
];

const THREE_SLOTS: &[(MealType, &[DishSet])] = &[
    (MealType::Breakfast, BREAKFAST_OPTIONS),
    (MealType::Lunch, LUNCH_OPTIONS),
    (MealType::Dinner, DINNER_OPTIONS),
];

const TWO_SLOTS: &[(MealType, &[DishSet])] = &[
    (MealType::Lunch, LUNCH_OPTIONS),
    (MealType::Dinner, DINNER_OPTIONS),
];

pub struct FallbackGenerator<'a> {
    table: &'a NutritionTable,
}

impl<'a> FallbackGenerator<'a> {
    pub fn new(table: &'a NutritionTable) -> Self {
        Self { table }
    }

    /// One dish set per slot; calories come from the split of `target`, so the
    /// plan total always equals it.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        target: u32,
        exclusions: &[String],
        rng: &mut R,
    ) -> Result<Vec<Meal>, FallbackError> {
        let slots = if target < FALLBACK_THRESHOLD {
            TWO_SLOTS
        } else {
            THREE_SLOTS
        };
        let shares = split_calories(target, slots.len());
        slots
            .iter()
            .zip(shares)
            .map(|((meal_type, options), share)| {
                let dishes = self.pick(*meal_type, options, share, exclusions, rng)?;
                Ok(Meal::fallback(*meal_type, share, dishes))
            })
            .collect()
    }

    fn pick<R: Rng + ?Sized>(
        &self,
        meal_type: MealType,
        options: &[DishSet],
        share: u32,
        exclusions: &[String],
        rng: &mut R,
    ) -> Result<Vec<String>, FallbackError> {
        let allowed: Vec<DishSet> = options
            .iter()
            .copied()
            .filter(|o| !contains_excluded(*o, exclusions))
            .collect();
        let candidates = if allowed.is_empty() {
            options.to_vec()
        } else {
            allowed
        };
        if candidates.is_empty() {
            return Err(FallbackError::EmptyPool(meal_type.label()));
        }

        let weights = candidates
            .iter()
            .map(|o| self.closeness(*o, share))
            .collect::<Vec<_>>();
        let dist = WeightedIndex::new(&weights)?;
        let chosen = candidates[dist.sample(rng)];
        Ok(chosen.iter().map(|d| d.to_string()).collect())
    }

    /// Higher when the table's estimate for the set is near the slot's share.
    fn closeness(&self, option: DishSet, share: u32) -> f64 {
        let estimate: f64 = option.iter().map(|d| self.table.estimate(d).calories).sum();
        1.0 / (1.0 + (estimate - share as f64).abs() / 100.0)
    }
}

fn contains_excluded(option: DishSet, exclusions: &[String]) -> bool {
    option.iter().any(|dish| {
        exclusions
            .iter()
            .any(|term| !term.is_empty() && dish.contains(term.as_str()))
    })
}

/// Last resort. Two fixed meals, nothing that can fail.
pub fn minimal_plan(target: u32) -> Vec<Meal> {
    let shares = split_calories(target, 2);
    vec![
        Meal::fallback(
            MealType::Lunch,
            shares[0],
            vec!["ご飯".into(), "焼き鮭".into(), "味噌汁".into()],
        ),
        Meal::fallback(
            MealType::Dinner,
            shares[1],
            vec!["ご飯".into(), "鶏の照り焼き".into(), "野菜サラダ".into()],
        ),
    ]
}

#[cfg(test)]
mod fallback_tests {
    use super::*;
    use crate::nutrition::{reference_table, NutritionFacts};
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn three_meals_all_flagged_and_summing_to_target() {
        let meals = FallbackGenerator::new(reference_table())
            .generate(1800, &[], &mut rng())
            .unwrap();
        assert_eq!(meals.len(), 3);
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
        assert!(meals.iter().all(|m| m.is_fallback && !m.dishes.is_empty()));
        assert_eq!(meals.iter().map(|m| m.calories).sum::<u32>(), 1800);
    }

    #[test]
    fn low_target_skips_breakfast() {
        let meals = FallbackGenerator::new(reference_table())
            .generate(1000, &[], &mut rng())
            .unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].meal_type, MealType::Lunch);
        assert_eq!(meals[0].calories, 450);
        assert_eq!(meals[1].calories, 550);
    }

    #[test]
    fn excluded_ingredients_are_avoided_when_possible() {
        let exclusions = vec!["ご飯".to_string()];
        for seed in 0..20 {
            let meals = FallbackGenerator::new(reference_table())
                .generate(2000, &exclusions, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            // only breakfast has rice-free options
            assert!(!meals[0].dishes.iter().any(|d| d.contains("ご飯")));
            assert_eq!(meals[1].dishes[0], "ご飯");
        }
    }

    #[test]
    fn broken_table_is_an_error() {
        let table = NutritionTable::from_entries(vec![(
            "ご飯".into(),
            NutritionFacts::new(f64::NAN, 0.0, 0.0, 0.0),
        )]);
        let err = FallbackGenerator::new(&table)
            .generate(2000, &[], &mut rng())
            .unwrap_err();
        assert!(matches!(err, FallbackError::Weights(_)));
    }

    #[test]
    fn minimal_plan_is_two_flagged_meals() {
        let meals = minimal_plan(1801);
        assert_eq!(meals.len(), 2);
        assert!(meals.iter().all(|m| m.is_fallback));
        assert_eq!(meals[0].calories + meals[1].calories, 1801);
    }
}
