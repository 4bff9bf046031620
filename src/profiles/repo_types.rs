use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const DEFAULT_WEIGHT_KG: f64 = 60.0;

/// Profile record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfileRow {
    pub user_id: String,                    // external user id
    pub email: Option<String>,
    pub name: Option<String>,
    pub height: Option<f64>,                // cm
    pub weight: Option<f64>,                // kg
    pub age: Option<i32>,
    pub gender: Option<String>,             // 女 / 男 / そのほか
    pub favorite_foods: Option<String>,     // free text
    pub allergies: Option<String>,          // free text
    pub disliked_foods: Option<String>,     // free text
    pub exercise_frequency: Option<String>,
    pub exercise_frequency_other: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Resolved dietary preferences. Every field is optional; an empty value means
/// "nothing known" and the prompt falls back to neutral defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub allergies: Option<String>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub age: Option<i32>,
    pub exercise_frequency: Option<String>,
    pub favorite_foods: Option<String>,
    pub disliked_foods: Option<String>,
}

/// Whether a create call inserted a row or found one already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileAction {
    Created,
    Existing,
}

impl UserPreferences {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn weight_or_default(&self) -> f64 {
        self.weight.filter(|w| *w > 0.0).unwrap_or(DEFAULT_WEIGHT_KG)
    }

    /// Field-by-field override: values present in `overrides` win.
    pub fn overlay(self, overrides: UserPreferences) -> UserPreferences {
        UserPreferences {
            allergies: non_blank(overrides.allergies).or(self.allergies),
            gender: non_blank(overrides.gender).or(self.gender),
            weight: overrides.weight.or(self.weight),
            height: overrides.height.or(self.height),
            age: overrides.age.or(self.age),
            exercise_frequency: non_blank(overrides.exercise_frequency)
                .or(self.exercise_frequency),
            favorite_foods: non_blank(overrides.favorite_foods).or(self.favorite_foods),
            disliked_foods: non_blank(overrides.disliked_foods).or(self.disliked_foods),
        }
    }
}

impl From<UserProfileRow> for UserPreferences {
    fn from(r: UserProfileRow) -> Self {
        // "そのほか" carries its detail in the companion column
        let exercise_frequency = match (r.exercise_frequency, r.exercise_frequency_other) {
            (Some(f), Some(other)) if f == "そのほか" && !other.trim().is_empty() => Some(other),
            (f, _) => f,
        };
        Self {
            allergies: non_blank(r.allergies),
            gender: non_blank(r.gender),
            weight: r.weight,
            height: r.height,
            age: r.age,
            exercise_frequency: non_blank(exercise_frequency),
            favorite_foods: non_blank(r.favorite_foods),
            disliked_foods: non_blank(r.disliked_foods),
        }
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
