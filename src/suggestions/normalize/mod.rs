//! Generator text → meal plan.
//!
//! Extraction is an ordered list of independent strategies. The first one that
//! yields at least one meal with a real dish wins; later strategies are not
//! consulted. Every strategy funnels its raw findings through [`finalize`], so
//! the calorie, dish and naming rules are the same whichever path succeeded.
//! The whole thing is a pure function of the input text and target.

pub mod clean;
pub mod json;
pub mod text;

use tracing::debug;

use super::model::{split_calories, Meal, MealPlan, MealSource, MealType};
use crate::error::ParseError;
use clean::{clean_dishes, PLACEHOLDER_DISH};

#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext {
    pub target_calories: u32,
}

/// A meal as found in the text, before any rule is applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealDraft {
    pub label: Option<String>,
    pub meal_type: Option<MealType>,
    pub calories: Option<u32>,
    pub dishes: Vec<String>,
}

pub trait ExtractStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn source(&self) -> MealSource;
    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub source: MealSource,
    pub plan: MealPlan,
}

pub struct Normalizer {
    strategies: Vec<Box<dyn ExtractStrategy>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            strategies: vec![
                Box::new(json::DirectJson),
                Box::new(json::FencedJson),
                Box::new(json::PatternJson),
                Box::new(text::Headings),
                Box::new(text::Bullets),
            ],
        }
    }
}

impl Normalizer {
    pub fn normalize(&self, text: &str, ctx: &NormalizeContext) -> Result<Extracted, ParseError> {
        let mut tried = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            tried.push(strategy.name());
            if let Some(meals) = strategy.try_extract(text, ctx) {
                debug!(strategy = strategy.name(), meals = meals.len(), "extraction succeeded");
                return Ok(Extracted {
                    source: strategy.source(),
                    plan: MealPlan::new(meals),
                });
            }
            debug!(strategy = strategy.name(), "extraction yielded nothing");
        }
        Err(ParseError::NoMeals { tried })
    }
}

/// Applies the uniform meal rules. Returns `None` unless at least one meal
/// carries a dish that came from the text.
pub fn finalize(drafts: Vec<MealDraft>, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
    let count = drafts.len();
    let shares = split_calories(ctx.target_calories, count);
    let mut any_real = false;

    let meals = drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let meal_type = d
                .meal_type
                .or_else(|| d.label.as_deref().and_then(MealType::recognize))
                .unwrap_or_else(|| MealType::positional(i, count));
            let mut dishes = clean_dishes(&d.dishes);
            if dishes.is_empty() {
                dishes.push(PLACEHOLDER_DISH.to_string());
            } else {
                any_real = true;
            }
            Meal::generated(meal_type, d.calories.unwrap_or(shares[i]), dishes)
        })
        .collect::<Vec<_>>();

    any_real.then_some(meals)
}

#[cfg(test)]
mod normalizer_tests {
    use super::*;

    fn ctx() -> NormalizeContext {
        NormalizeContext {
            target_calories: 2000,
        }
    }

    #[test]
    fn finalize_defaults_calories_and_fills_empty_meals() {
        let meals = finalize(
            vec![
                MealDraft {
                    label: Some("朝食".into()),
                    calories: Some(480),
                    dishes: vec!["ご飯".into(), "納豆(100kcal)".into()],
                    ..Default::default()
                },
                MealDraft {
                    label: Some("謎".into()),
                    ..Default::default()
                },
                MealDraft {
                    dishes: vec!["主菜".into()],
                    ..Default::default()
                },
            ],
            &ctx(),
        )
        .unwrap();
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
        assert_eq!(meals[0].calories, 480);
        assert_eq!(meals[0].dishes, vec!["ご飯", "納豆"]);
        assert_eq!(meals[1].meal_type, MealType::Lunch);
        assert_eq!(meals[1].calories, 700);
        assert_eq!(meals[1].dishes, vec![PLACEHOLDER_DISH]);
        assert_eq!(meals[2].calories, 800);
        assert_eq!(meals[2].dishes, vec!["鶏の照り焼き"]);
    }

    #[test]
    fn finalize_rejects_plans_without_real_dishes() {
        let drafts = vec![MealDraft {
            label: Some("朝食".into()),
            dishes: vec!["具体的な料理名1".into()],
            ..Default::default()
        }];
        assert_eq!(finalize(drafts, &ctx()), None);
    }

    #[test]
    fn plain_prose_yields_no_meals() {
        let text = "本日は栄養バランスを意識して、朝食はしっかり食べましょう。\n\
                    野菜を多めに取り入れるのがおすすめです。";
        let err = Normalizer::default().normalize(text, &ctx()).unwrap_err();
        let ParseError::NoMeals { tried } = err;
        assert_eq!(tried.len(), 5);
    }

    #[test]
    fn normalization_is_deterministic() {
        let text = "## 朝食\n- 主菜: 焼き鮭\n- 汁物: 味噌汁\n## 夕食\n- 主菜: 肉じゃが";
        let n = Normalizer::default();
        let a = n.normalize(text, &ctx()).unwrap();
        let b = n.normalize(text, &ctx()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn json_wins_over_later_strategies() {
        let text = "## 朝食\n- 主菜: 焼き鮭\n\
                    {\"meals\":[{\"mealType\":\"夕食\",\"calories\":900,\"dishes\":[\"カレー\"]}]}";
        let out = Normalizer::default().normalize(text, &ctx()).unwrap();
        assert_eq!(out.source, MealSource::AiDirectJson);
        assert_eq!(out.plan.meals[0].dishes, vec!["カレー"]);
        assert_eq!(out.plan.total_calories, 900);
    }
}
