use serde::{Serialize, Serializer};

/// Presentation hint shared by every meal.
pub const MEAL_COLOR: &str = "#FF8C42";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    /// 1-based slot number, used when a plan is not breakfast/lunch/dinner.
    Numbered(usize),
}

const BREAKFAST_LABELS: &[&str] = &["朝食", "朝ごはん", "朝ご飯", "breakfast"];
const LUNCH_LABELS: &[&str] = &["昼食", "昼ごはん", "昼ご飯", "ランチ", "lunch"];
const DINNER_LABELS: &[&str] = &[
    "夕食", "夕ごはん", "夕ご飯", "晩ごはん", "晩ご飯", "ディナー", "dinner", "supper",
];

impl MealType {
    pub fn label(&self) -> String {
        match self {
            MealType::Breakfast => "朝食".to_string(),
            MealType::Lunch => "昼食".to_string(),
            MealType::Dinner => "夕食".to_string(),
            MealType::Numbered(n) => format!("食事{}", n),
        }
    }

    /// Recognizes a meal label anywhere in `text` (`"## 朝食（550kcal）"`, `"Lunch"`).
    pub fn recognize(text: &str) -> Option<MealType> {
        let lower = text.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        let has = |labels: &[&str]| labels.iter().any(|l| lower.contains(l));
        if has(BREAKFAST_LABELS) {
            return Some(MealType::Breakfast);
        }
        if has(LUNCH_LABELS) {
            return Some(MealType::Lunch);
        }
        if has(DINNER_LABELS) {
            return Some(MealType::Dinner);
        }
        match lower.as_str() {
            "朝" => return Some(MealType::Breakfast),
            "昼" => return Some(MealType::Lunch),
            "夕" | "夜" | "晩" => return Some(MealType::Dinner),
            _ => {}
        }
        let numbered = lower
            .strip_prefix("食事")
            .or_else(|| lower.strip_prefix("meal"))
            .map(str::trim)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0);
        numbered.map(MealType::Numbered)
    }

    /// Slot name by position: breakfast/lunch/dinner for a three-meal plan,
    /// "meal N" otherwise.
    pub fn positional(index: usize, count: usize) -> MealType {
        match (count, index) {
            (3, 0) => MealType::Breakfast,
            (3, 1) => MealType::Lunch,
            (3, 2) => MealType::Dinner,
            _ => MealType::Numbered(index + 1),
        }
    }
}

impl Serialize for MealType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub meal_type: MealType,
    pub calories: u32,
    pub dishes: Vec<String>,
    pub color: &'static str,
    pub is_fallback: bool,
}

impl Meal {
    pub fn generated(meal_type: MealType, calories: u32, dishes: Vec<String>) -> Self {
        Self {
            meal_type,
            calories,
            dishes,
            color: MEAL_COLOR,
            is_fallback: false,
        }
    }

    pub fn fallback(meal_type: MealType, calories: u32, dishes: Vec<String>) -> Self {
        Self {
            is_fallback: true,
            ..Self::generated(meal_type, calories, dishes)
        }
    }
}

/// Ordered meals. The total is always recomputed from the meals themselves.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub meals: Vec<Meal>,
    pub total_calories: u64,
}

impl MealPlan {
    pub fn new(meals: Vec<Meal>) -> Self {
        let total_calories = meals.iter().map(|m| u64::from(m.calories)).sum();
        Self {
            meals,
            total_calories,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.meals.iter().any(|m| m.is_fallback)
    }
}

/// Splits `target` into `count` shares that always sum to `target`.
/// Three meals: 25% / 35% / rest. Two: 45% / rest. More: even, rest on the last.
pub fn split_calories(target: u32, count: usize) -> Vec<u32> {
    let pct = |p: u64| ((target as u64 * p) / 100) as u32;
    let mut shares: Vec<u32> = match count {
        0 => return Vec::new(),
        1 => return vec![target],
        2 => vec![pct(45)],
        3 => vec![pct(25), pct(35)],
        n => vec![target / n as u32; n - 1],
    };
    let used: u32 = shares.iter().sum();
    shares.push(target - used);
    shares
}

/// How far the pipeline got before it produced (or gave up on) a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    NotStarted,
    PromptBuilt,
    GenerationAttempted,
    TextExtracted,
    Normalized,
}

/// Which path produced the final meals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MealSource {
    AiDirectJson,
    AiFencedJson,
    AiPatternJson,
    AiHeadings,
    AiBullets,
    FallbackGenerationError,
    FallbackEmptyResponse,
    FallbackParseFailed,
    FallbackMinimal,
}

impl MealSource {
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            MealSource::FallbackGenerationError
                | MealSource::FallbackEmptyResponse
                | MealSource::FallbackParseFailed
                | MealSource::FallbackMinimal
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub profile_ms: u64,
    pub prompt_ms: u64,
    pub generation_ms: u64,
    pub normalize_ms: u64,
    pub total_ms: u64,
}

/// Provenance of a plan, accumulated as the pipeline advances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDebug {
    pub prompt_sent: String,
    pub ai_response: Option<String>,
    pub stage: PipelineStage,
    pub meal_source: MealSource,
    pub using_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timings: Timings,
}

impl Default for PlanDebug {
    fn default() -> Self {
        Self {
            prompt_sent: String::new(),
            ai_response: None,
            stage: PipelineStage::NotStarted,
            meal_source: MealSource::FallbackMinimal,
            using_fallback: true,
            error: None,
            timings: Timings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuggestionOutcome {
    pub plan: MealPlan,
    pub debug: PlanDebug,
}
