use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Dish used when a meal ends up with nothing concrete.
pub const PLACEHOLDER_DISH: &str = "日替わり和定食";

/// Anything above this for a single meal is treated as unknown.
pub const MAX_MEAL_CALORIES: u32 = 5000;

lazy_static! {
    static ref PAREN_KCAL: Regex = Regex::new(
        r"(?i)[（(]\s*(?:約)?\s*\d+(?:\.\d+)?\s*(?:kcal|キロカロリー|カロリー)\s*[)）]"
    )
    .unwrap();
    static ref BARE_KCAL: Regex =
        Regex::new(r"(?i)(?:約)?\s*\d+(?:\.\d+)?\s*kcal").unwrap();
    static ref SUB_LABEL_PREFIX: Regex = Regex::new(
        r"(?i)^(?:主菜|副菜|汁物|主食|飲み物|スープ|デザート|メニュー|main dish|side dish|soup|staple|drink|beverage|menu)\s*[0-9０-９]*\s*[:：]\s*"
    )
    .unwrap();
    static ref TEMPLATE_ECHO: Regex =
        Regex::new(r"(?i)^(?:具体的な)?料理名\s*[0-9０-９]*$|^dish name\s*\d*$").unwrap();
    static ref FIRST_NUMBER: Regex = Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap();
    static ref DISH_SEPARATOR: Regex = Regex::new(r"[、,，/／]+").unwrap();
}

/// Generic slot labels and the concrete dish that stands in for each.
const GENERIC_LABELS: &[(&str, &str)] = &[
    ("主菜", "鶏の照り焼き"),
    ("main dish", "鶏の照り焼き"),
    ("main", "鶏の照り焼き"),
    ("副菜", "ほうれん草のお浸し"),
    ("side dish", "ほうれん草のお浸し"),
    ("side", "ほうれん草のお浸し"),
    ("汁物", "豆腐とわかめの味噌汁"),
    ("スープ", "豆腐とわかめの味噌汁"),
    ("soup", "豆腐とわかめの味噌汁"),
    ("主食", "ご飯"),
    ("staple", "ご飯"),
];

pub fn strip_emphasis(s: &str) -> String {
    s.replace("**", "").replace("__", "").replace('`', "")
}

/// Turns one raw dish string into a concrete dish name, or `None` when
/// nothing usable is left.
pub fn clean_dish(raw: &str) -> Option<String> {
    let s = strip_emphasis(raw);
    let s = PAREN_KCAL.replace_all(s.trim(), "");
    let s = BARE_KCAL.replace_all(&s, "");
    let s = SUB_LABEL_PREFIX.replace(s.trim(), "");
    let s = s
        .trim()
        .trim_matches(|c: char| matches!(c, '-' | ':' | '：' | '、' | ',' | '・' | '"'))
        .trim();

    if s.is_empty() || TEMPLATE_ECHO.is_match(s) {
        return None;
    }
    let lower = s.to_lowercase();
    if let Some((_, concrete)) = GENERIC_LABELS.iter().find(|(label, _)| *label == lower) {
        return Some(concrete.to_string());
    }
    Some(s.to_string())
}

/// Cleans and de-duplicates (first occurrence wins).
pub fn clean_dishes<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for dish in raw.into_iter().filter_map(|d| clean_dish(d.as_ref())) {
        if !out.contains(&dish) {
            out.push(dish);
        }
    }
    out
}

/// `"ご飯、味噌汁 / 納豆"` → three entries.
pub fn split_dish_list(s: &str) -> Vec<String> {
    DISH_SEPARATOR
        .split(s)
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

/// Numeric value of a JSON field: numbers as-is, strings by their first
/// digit run (`"約1,200kcal"` → 1200).
pub fn coerce_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => FIRST_NUMBER
            .find(s)
            .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok()),
        _ => None,
    }
}

/// Calories as a non-negative integer. Negative, missing or implausibly large means "unknown".
pub fn coerce_calories(v: Option<&Value>) -> Option<u32> {
    let n = coerce_number(v?)?;
    if !(0.0..=MAX_MEAL_CALORIES as f64).contains(&n) {
        return None;
    }
    Some(n.round() as u32)
}
