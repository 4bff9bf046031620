use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::clean::{coerce_calories, split_dish_list};
use super::{finalize, ExtractStrategy, MealDraft, NormalizeContext};
use crate::suggestions::model::{Meal, MealSource};

lazy_static! {
    static ref FENCED_BLOCK: Regex =
        Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n?(.*?)```").unwrap();
    static ref MEALS_KEY: Regex = Regex::new(r#""meals"\s*:\s*\["#).unwrap();
}

/// First `{` through last `}`.
pub fn outer_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Byte index of the `}` closing the object opened at `open`, skipping braces
/// inside string literals.
pub fn balanced_object_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in text[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses a candidate document and converts its `meals` list.
pub fn meals_from_json(candidate: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    let list = match &value {
        Value::Object(obj) => obj.get("meals")?.as_array()?,
        Value::Array(items) => items,
        _ => return None,
    };
    if list.is_empty() {
        return None;
    }
    let drafts = list
        .iter()
        .filter_map(Value::as_object)
        .map(draft_from_object)
        .collect::<Vec<_>>();
    if drafts.is_empty() {
        return None;
    }
    finalize(drafts, ctx)
}

fn draft_from_object(obj: &Map<String, Value>) -> MealDraft {
    let label = ["mealType", "meal_type", "type", "name"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string);
    let dishes = match obj.get("dishes").or_else(|| obj.get("menu")) {
        Some(Value::Array(items)) => items.iter().filter_map(dish_text).collect(),
        Some(Value::String(s)) => split_dish_list(s),
        _ => Vec::new(),
    };
    MealDraft {
        label,
        meal_type: None,
        calories: coerce_calories(obj.get("calories")),
        dishes,
    }
}

fn dish_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("name").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// The outermost brace span of the whole text.
pub struct DirectJson;

impl ExtractStrategy for DirectJson {
    fn name(&self) -> &'static str {
        "direct_json"
    }

    fn source(&self) -> MealSource {
        MealSource::AiDirectJson
    }

    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
        meals_from_json(outer_object_span(text)?, ctx)
    }
}

/// Contents of ``` fences, optionally tagged `json`.
pub struct FencedJson;

impl ExtractStrategy for FencedJson {
    fn name(&self) -> &'static str {
        "fenced_json"
    }

    fn source(&self) -> MealSource {
        MealSource::AiFencedJson
    }

    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
        FENCED_BLOCK.captures_iter(text).find_map(|cap| {
            let body = cap.get(1)?.as_str();
            meals_from_json(body, ctx)
                .or_else(|| outer_object_span(body).and_then(|span| meals_from_json(span, ctx)))
        })
    }
}

/// Every object that holds a `"meals": [` key, in order of appearance.
pub struct PatternJson;

impl PatternJson {
    fn candidates(text: &str) -> Vec<&str> {
        let mut out = Vec::new();
        for key in MEALS_KEY.find_iter(text) {
            // innermost enclosing object whose span covers the whole key
            let opens = text[..key.start()].match_indices('{').map(|(i, _)| i).rev();
            for open in opens {
                if let Some(close) = balanced_object_end(text, open) {
                    if close >= key.end() {
                        out.push(&text[open..=close]);
                        break;
                    }
                }
            }
        }
        out
    }
}

impl ExtractStrategy for PatternJson {
    fn name(&self) -> &'static str {
        "pattern_json"
    }

    fn source(&self) -> MealSource {
        MealSource::AiPatternJson
    }

    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
        Self::candidates(text)
            .into_iter()
            .find_map(|candidate| meals_from_json(candidate, ctx))
    }
}
