//! Instruction text for the generator.
//!
//! [`build_prompt`] is a pure function. The only randomness is the
//! [`Variety`] value, drawn by the caller from whatever `Rng` it owns.

use std::fmt::Write as _;

use rand::Rng;

use super::dto::{Condition, Mood};
use super::model::split_calories;
use crate::profiles::UserPreferences;

pub const SEASONS: [&str; 4] = ["春", "夏", "秋", "冬"];
pub const STYLES: [&str; 5] = ["和食", "洋食", "中華", "イタリアン", "フレンチ"];
pub const CALORIE_TOLERANCE: u32 = 150;
pub const CALORIE_FLOOR: u32 = 1200;

const NONE_SENTINELS: &[&str] = &["なし", "none", "無し", "特になし"];

/// Season, cuisine and request number that keep repeated calls from
/// getting identical answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variety {
    pub season: &'static str,
    pub style: &'static str,
    pub nonce: u32,
}

impl Variety {
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            season: SEASONS[rng.gen_range(0..SEASONS.len())],
            style: STYLES[rng.gen_range(0..STYLES.len())],
            nonce: rng.gen_range(1..=1000),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub prefs: &'a UserPreferences,
    pub target_calories: u32,
    /// Ingredients that must not appear, already cleaned.
    pub exclusions: &'a [String],
    pub condition: Option<Condition>,
    pub mood: Option<Mood>,
}

/// `max(1200, target - 150) ..= target + 150`, lower bound never above target.
pub fn calorie_band(target: u32) -> (u32, u32) {
    let low = target
        .saturating_sub(CALORIE_TOLERANCE)
        .max(CALORIE_FLOOR)
        .min(target);
    (low, target.saturating_add(CALORIE_TOLERANCE))
}

pub fn is_none_sentinel(text: &str) -> bool {
    let t = text.trim().to_lowercase();
    t.is_empty() || NONE_SENTINELS.contains(&t.as_str())
}

/// Allergy text split into ingredients, followed by dietary restrictions.
/// Sentinels and duplicates are dropped.
pub fn exclusion_terms(allergies: Option<&str>, restrictions: &[String]) -> Vec<String> {
    let from_allergies = allergies
        .into_iter()
        .flat_map(|a| a.split(['、', ',', '，', '/', '／', '\n']));
    let mut out: Vec<String> = Vec::new();
    for term in from_allergies.chain(restrictions.iter().map(String::as_str)) {
        let term = term.trim();
        if is_none_sentinel(term) || out.iter().any(|t| t == term) {
            continue;
        }
        out.push(term.to_string());
    }
    out
}

fn or_unknown(v: Option<&str>, unknown: &'static str) -> String {
    match v.map(str::trim) {
        Some(s) if !is_none_sentinel(s) => s.to_string(),
        _ => unknown.to_string(),
    }
}

pub fn build_prompt(input: &PromptInput<'_>, variety: &Variety) -> String {
    let p = input.prefs;
    let target = input.target_calories;
    let (low, high) = calorie_band(target);
    let shares = split_calories(target, 3);

    let mut out = String::with_capacity(1536);
    let _ = writeln!(
        out,
        "あなたは経験豊富な管理栄養士です。以下の条件で{}にふさわしい{}中心の1日の献立を提案してください。",
        variety.season, variety.style
    );

    out.push_str("\n【ユーザー情報】\n");
    let _ = writeln!(out, "- 性別: {}", or_unknown(p.gender.as_deref(), "不明"));
    let _ = writeln!(out, "- 体重: {}kg", p.weight_or_default());
    if let Some(h) = p.height.filter(|h| *h > 0.0) {
        let _ = writeln!(out, "- 身長: {}cm", h);
    }
    if let Some(age) = p.age.filter(|a| *a > 0) {
        let _ = writeln!(out, "- 年齢: {}歳", age);
    }
    let _ = writeln!(
        out,
        "- 運動頻度: {}",
        or_unknown(p.exercise_frequency.as_deref(), "不明")
    );
    let _ = writeln!(
        out,
        "- 好きな食べ物: {}",
        or_unknown(p.favorite_foods.as_deref(), "特になし")
    );
    let _ = writeln!(
        out,
        "- 嫌いな食べ物: {}",
        or_unknown(p.disliked_foods.as_deref(), "特になし")
    );

    out.push_str("\n【条件】\n");
    let _ = writeln!(out, "- 目標カロリー: {}から{}kcal（目安{}kcal）", low, high, target);
    out.push_str("- 朝食25%、昼食35%、夕食40%の配分\n");
    out.push_str("- 具体的な日本語の料理名を使用し、各食事に3-4品を含める\n");
    out.push_str("- 季節の食材を使用\n");
    let _ = writeln!(out, "- 毎回異なるメニューを提案（リクエスト番号: {}）", variety.nonce);

    if !input.exclusions.is_empty() {
        let _ = writeln!(
            out,
            "【重要】アレルギー食材は使用禁止: {}",
            input.exclusions.join("、")
        );
    }
    if let Some(disliked) = p.disliked_foods.as_deref().filter(|d| !is_none_sentinel(d)) {
        let _ = writeln!(out, "【重要】嫌いな食べ物は使用しない: {}", disliked.trim());
    }

    if input.condition.is_some() || input.mood.is_some() {
        out.push_str("\n【今日の状態】\n");
        if let Some(c) = input.condition {
            let _ = writeln!(out, "- 体調: {}", c.label());
        }
        if let Some(m) = input.mood {
            let _ = writeln!(out, "- 気分: {}", m.label());
        }
        let gentle = input.condition.is_some_and(|c| c.is_poor()) || input.mood == Some(Mood::Tired);
        if gentle {
            out.push_str("- 消化が良く胃腸にやさしい料理を中心にしてください\n");
        }
    }

    out.push_str("\n以下のJSON形式で回答してください。例:\n");
    let _ = writeln!(
        out,
        r#"{{"meals":[{{"mealType":"朝食","calories":{},"dishes":["ご飯","焼き魚","味噌汁"]}},{{"mealType":"昼食","calories":{},"dishes":["ご飯","鶏の唐揚げ","サラダ","味噌汁"]}},{{"mealType":"夕食","calories":{},"dishes":["ご飯","豚の生姜焼き","野菜炒め","味噌汁"]}}]}}"#,
        shares[0], shares[1], shares[2]
    );
    out.push_str("\nJSONのみで回答してください。");
    out
}
