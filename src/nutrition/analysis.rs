//! Per-item calorie and PFC analysis of a meal.
//!
//! The generator is asked first. Whatever it returns, totals are recomputed
//! from the items; if it fails or its answer has no usable items, every item is
//! estimated from the reference table instead.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::table::{NutritionFacts, NutritionTable};
use crate::generation::{GenerationConfig, TextGenerator};
use crate::suggestions::normalize::clean::{coerce_calories, coerce_number};
use crate::suggestions::normalize::json::outer_object_span;

/// Low temperature: the answer should be a lookup, not a creative act.
pub const ANALYSIS_CONFIG: GenerationConfig = GenerationConfig {
    max_tokens: 2000,
    temperature: 0.1,
    top_p: 0.9,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisSource {
    Ai,
    Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedItem {
    pub name: String,
    pub calories: u32,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl AnalyzedItem {
    fn estimated(table: &NutritionTable, name: &str) -> Self {
        let f = table.estimate(name).rounded();
        Self {
            name: name.to_string(),
            calories: f.calories.max(0.0) as u32,
            protein: f.protein,
            fat: f.fat,
            carbs: f.carbs,
            amount: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub total_calories: u32,
    pub total_protein: f64,
    pub total_fat: f64,
    pub total_carbs: f64,
    pub items: Vec<AnalyzedItem>,
    pub source: AnalysisSource,
}

impl MealAnalysis {
    /// Totals always come from the items.
    pub fn from_items(items: Vec<AnalyzedItem>, source: AnalysisSource) -> Self {
        let sum = items
            .iter()
            .map(|i| NutritionFacts::new(i.calories as f64, i.protein, i.fat, i.carbs))
            .fold(NutritionFacts::default(), |acc, f| acc + f)
            .rounded();
        Self {
            total_calories: sum.calories as u32,
            total_protein: sum.protein,
            total_fat: sum.fat,
            total_carbs: sum.carbs,
            items,
            source,
        }
    }
}

pub fn build_analysis_prompt(items: &[String]) -> String {
    let list = items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"あなたは管理栄養士です。入力された食事内容から正確なカロリーとPFC（タンパク質・脂質・炭水化物）を分析してください。

## 分析基準
- 日本食品標準成分表に基づく
- 一般的な1人前の分量で計算
- 調理方法も考慮

## 出力形式（JSON）
{{"items":[{{"name":"食品名","calories":数値,"protein":数値,"fat":数値,"carbs":数値,"amount":"分量"}}]}}

以下の食事内容を分析してください：
{}

各食品のカロリーとPFCをg単位で算出し、JSONのみで返してください。"#,
        list
    )
}

/// Items found in the generator's answer. Missing numbers are filled from the
/// table's estimate for that item.
pub fn parse_analysis(text: &str, table: &NutritionTable) -> Option<Vec<AnalyzedItem>> {
    let value: Value = serde_json::from_str(outer_object_span(text)?).ok()?;
    let items = value
        .get("items")?
        .as_array()?
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| item_from_object(obj, table))
        .collect::<Vec<_>>();
    (!items.is_empty()).then_some(items)
}

fn item_from_object(obj: &Map<String, Value>, table: &NutritionTable) -> Option<AnalyzedItem> {
    let name = obj.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    let fallback = AnalyzedItem::estimated(table, name);
    let grams = |key: &str, default: f64| {
        obj.get(key)
            .and_then(coerce_number)
            .filter(|g| *g >= 0.0)
            .map(|g| (g * 10.0).round() / 10.0)
            .unwrap_or(default)
    };
    Some(AnalyzedItem {
        name: name.to_string(),
        calories: coerce_calories(obj.get("calories")).unwrap_or(fallback.calories),
        protein: grams("protein", fallback.protein),
        fat: grams("fat", fallback.fat),
        carbs: grams("carbs", fallback.carbs),
        amount: obj
            .get("amount")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string),
    })
}

pub fn estimate_items(table: &NutritionTable, items: &[String]) -> MealAnalysis {
    MealAnalysis::from_items(
        items.iter().map(|i| AnalyzedItem::estimated(table, i)).collect(),
        AnalysisSource::Estimate,
    )
}

pub async fn analyze_meal(
    generator: &dyn TextGenerator,
    table: &NutritionTable,
    items: &[String],
) -> MealAnalysis {
    let prompt = build_analysis_prompt(items);
    match generator.generate(&prompt, &ANALYSIS_CONFIG).await {
        Ok(text) => match parse_analysis(&text, table) {
            Some(parsed) => {
                debug!(items = parsed.len(), "analysis parsed");
                MealAnalysis::from_items(parsed, AnalysisSource::Ai)
            }
            None => {
                warn!(chars = text.chars().count(), "analysis answer unusable; estimating");
                estimate_items(table, items)
            }
        },
        Err(e) => {
            warn!(error = %e, "analysis generation failed; estimating");
            estimate_items(table, items)
        }
    }
}
