use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::body::json_body;
use crate::error::ApiError;
use crate::profiles::UserPreferences;
use crate::suggestions::model::{Meal, PlanDebug, SuggestionOutcome};

pub const DEFAULT_TARGET_CALORIES: u32 = 2000;

/// Allergies arrive either as free text or as a list of ingredients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AllergyInput {
    Text(String),
    List(Vec<String>),
}

impl AllergyInput {
    pub fn into_text(self) -> String {
        match self {
            AllergyInput::Text(s) => s,
            AllergyInput::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("、"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesInput {
    pub favorite_foods: Option<String>,
    pub disliked_foods: Option<String>,
    pub allergies: Option<AllergyInput>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub age: Option<i32>,
    pub exercise_frequency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanRequest {
    pub user_id: Option<String>,
    /// Kept loose so a bad value becomes our own input error.
    pub target_calories: Option<Value>,
    #[serde(default)]
    pub preferences: PreferencesInput,
    pub allergies: Option<AllergyInput>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub condition: Option<String>,
    pub mood: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    VeryGood,
    Good,
    Normal,
    SlightlyBad,
    Bad,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::VeryGood,
        Condition::Good,
        Condition::Normal,
        Condition::SlightlyBad,
        Condition::Bad,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Condition::VeryGood => "とても良い 😊",
            Condition::Good => "良い 😌",
            Condition::Normal => "普通 😐",
            Condition::SlightlyBad => "少し悪い 😟",
            Condition::Bad => "悪い 😵",
        }
    }

    pub fn parse(raw: &str) -> Option<Condition> {
        Self::ALL
            .into_iter()
            .find(|c| matches_label(c.label(), raw))
    }

    pub fn is_poor(&self) -> bool {
        matches!(self, Condition::SlightlyBad | Condition::Bad)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Positive,
    Neutral,
    Negative,
    Relaxed,
    Motivated,
    Tired,
}

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Positive,
        Mood::Neutral,
        Mood::Negative,
        Mood::Relaxed,
        Mood::Motivated,
        Mood::Tired,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mood::Positive => "ポジティブ",
            Mood::Neutral => "普通",
            Mood::Negative => "ネガティブ",
            Mood::Relaxed => "リラックス",
            Mood::Motivated => "やる気満々",
            Mood::Tired => "疲れ気味",
        }
    }

    pub fn parse(raw: &str) -> Option<Mood> {
        Self::ALL.into_iter().find(|m| matches_label(m.label(), raw))
    }
}

/// Exact label, or the label's text without its trailing emoji.
fn matches_label(label: &str, raw: &str) -> bool {
    let raw = raw.trim();
    if raw.is_empty() {
        return false;
    }
    raw == label || label.split_whitespace().next() == Some(raw)
}

/// Request after validation, with everything the pipeline needs.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub user_id: Option<String>,
    pub target_calories: u32,
    /// Request-level preferences; these win over the stored profile.
    pub overrides: UserPreferences,
    pub restrictions: Vec<String>,
    pub condition: Option<Condition>,
    pub mood: Option<Mood>,
}

impl MealPlanRequest {
    /// An empty body is the same as `{}`.
    pub fn from_body(body: &Bytes) -> Result<Self, ApiError> {
        json_body(body)
    }

    pub fn validate(self) -> Result<ValidatedRequest, ApiError> {
        let target_calories = match &self.target_calories {
            None | Some(Value::Null) => DEFAULT_TARGET_CALORIES,
            Some(v) => positive_integer(v).ok_or_else(|| {
                ApiError::Input(format!("targetCalories must be a positive integer, got {}", v))
            })?,
        };

        let condition = self.condition.as_deref().and_then(|raw| {
            let parsed = Condition::parse(raw);
            if parsed.is_none() {
                warn!(condition = %raw, "discarding unknown condition");
            }
            parsed
        });
        let mood = self.mood.as_deref().and_then(|raw| {
            let parsed = Mood::parse(raw);
            if parsed.is_none() {
                warn!(mood = %raw, "discarding unknown mood");
            }
            parsed
        });

        let p = self.preferences;
        let allergies = self
            .allergies
            .or(p.allergies)
            .map(AllergyInput::into_text);
        let overrides = UserPreferences {
            allergies,
            gender: p.gender,
            weight: p.weight.filter(|w| *w > 0.0),
            height: p.height.filter(|h| *h > 0.0),
            age: p.age.filter(|a| *a > 0),
            exercise_frequency: p.exercise_frequency,
            favorite_foods: p.favorite_foods,
            disliked_foods: p.disliked_foods,
        };

        Ok(ValidatedRequest {
            user_id: self
                .user_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            target_calories,
            overrides,
            restrictions: self
                .dietary_restrictions
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            condition,
            mood,
        })
    }
}

fn positive_integer(v: &Value) -> Option<u32> {
    let n = v.as_f64()?;
    if n.fract() != 0.0 || n < 1.0 || n > u32::MAX as f64 {
        return None;
    }
    Some(n as u32)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanResponse {
    pub meals: Vec<Meal>,
    pub total_calories: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<PlanDebug>,
}

impl MealPlanResponse {
    pub fn new(outcome: SuggestionOutcome, request_id: Uuid, include_debug: bool) -> Self {
        Self {
            meals: outcome.plan.meals,
            total_calories: outcome.plan.total_calories,
            timestamp: OffsetDateTime::now_utc(),
            request_id,
            debug: include_debug.then_some(outcome.debug),
        }
    }
}
