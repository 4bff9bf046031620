use serde::{Deserialize, Serialize};

use super::table::NutritionFacts;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    #[serde(default)]
    pub meal_contents: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct EstimateResponse {
    pub calories: u32,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl From<NutritionFacts> for EstimateResponse {
    fn from(f: NutritionFacts) -> Self {
        let f = f.rounded();
        Self {
            calories: f.calories.max(0.0) as u32,
            protein: f.protein,
            fat: f.fat,
            carbs: f.carbs,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub meal_items: Vec<String>,
}
