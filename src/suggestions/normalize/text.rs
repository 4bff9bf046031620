use lazy_static::lazy_static;
use regex::Regex;

use super::clean::{clean_dishes, split_dish_list, strip_emphasis};
use super::{finalize, ExtractStrategy, MealDraft, NormalizeContext};
use crate::suggestions::model::{Meal, MealSource, MealType};

lazy_static! {
    static ref BULLET: Regex =
        Regex::new(r"^(?:[-*+]\s+|[・•●○◦]\s*|\d+[.)．）]\s+)(.*)$").unwrap();
    static ref MEAL_LABEL_LINE: Regex = Regex::new(
        r"(?i)^(朝食|朝ごはん|朝ご飯|昼食|昼ごはん|昼ご飯|ランチ|夕食|夕ごはん|夕ご飯|晩ごはん|晩ご飯|ディナー|breakfast|lunch|dinner|supper)\s*(?:[（(][^）)]*[）)])?\s*(?:[:：]\s*(.*))?$"
    )
    .unwrap();
    static ref DISH_LABEL: Regex = Regex::new(
        r"(?i)^(?:主菜|副菜|汁物|主食|飲み物|スープ|デザート|メニュー|料理|main dish|side dish|soup|staple|drink|beverage|menu|dishes)\s*[0-9０-９]*\s*[:：]\s*(.*)$"
    )
    .unwrap();
    static ref OTHER_LABEL: Regex = Regex::new(r"^[^:：]{1,24}[:：]").unwrap();
}

/// Line kinds the section parser cares about.
#[derive(Debug, PartialEq)]
enum Line {
    /// Start of a meal section, with any dishes written on the same line.
    MealHeading(MealType, Option<String>),
    /// Some other heading; closes the current section.
    OtherHeading,
    /// `主菜: X` style line; `None` when the dishes follow as bullets.
    DishLabel { bullet: bool, value: Option<String> },
    /// Any other `label: value` line (calories, nutrients, steps).
    OtherLabel,
    Bullet(String),
    Text,
}

fn classify(raw: &str) -> Line {
    let trimmed = raw.trim();
    let (bullet, content) = match BULLET.captures(trimmed) {
        Some(cap) => (true, cap.get(1).map_or("", |m| m.as_str())),
        None => (false, trimmed),
    };
    let content = strip_emphasis(content);
    let content = content.trim();

    if !bullet {
        if let Some(heading) = content.strip_prefix('#') {
            let heading = heading.trim_start_matches('#').trim();
            return match MealType::recognize(heading) {
                Some(t) => Line::MealHeading(t, None),
                None => Line::OtherHeading,
            };
        }
        if let Some(inner) = content.strip_prefix('【') {
            let (title, rest) = inner.split_once('】').unwrap_or((inner, ""));
            let rest = rest.trim_start_matches([':', '：']).trim();
            return match MealType::recognize(title) {
                Some(t) => Line::MealHeading(t, (!rest.is_empty()).then(|| rest.to_string())),
                None => Line::OtherHeading,
            };
        }
        if let Some(cap) = MEAL_LABEL_LINE.captures(content) {
            if let Some(t) = MealType::recognize(&cap[1]) {
                let inline = cap
                    .get(2)
                    .map(|m| m.as_str().trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                return Line::MealHeading(t, inline);
            }
        }
    }
    if let Some(cap) = DISH_LABEL.captures(content) {
        let value = cap[1].trim();
        return Line::DishLabel {
            bullet,
            value: (!value.is_empty()).then(|| value.to_string()),
        };
    }
    if OTHER_LABEL.is_match(content) {
        return Line::OtherLabel;
    }
    if bullet && !content.is_empty() {
        return Line::Bullet(content.to_string());
    }
    Line::Text
}

/// Meal sections delimited by breakfast/lunch/dinner headings.
pub struct Headings;

impl ExtractStrategy for Headings {
    fn name(&self) -> &'static str {
        "headings"
    }

    fn source(&self) -> MealSource {
        MealSource::AiHeadings
    }

    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
        let mut sections: Vec<MealDraft> = Vec::new();
        let mut current: Option<usize> = None;
        // bullets directly under a heading, or under an empty dish label, are dishes
        let mut collecting = false;

        for raw in text.lines().filter(|l| !l.trim().is_empty()) {
            match classify(raw) {
                Line::MealHeading(meal_type, inline) => {
                    let idx = match sections.iter().position(|s| s.meal_type == Some(meal_type)) {
                        Some(idx) => idx,
                        None => {
                            sections.push(MealDraft {
                                meal_type: Some(meal_type),
                                ..Default::default()
                            });
                            sections.len() - 1
                        }
                    };
                    if let Some(inline) = inline {
                        sections[idx].dishes.extend(split_dish_list(&inline));
                    }
                    current = Some(idx);
                    collecting = true;
                }
                Line::OtherHeading => {
                    current = None;
                    collecting = false;
                }
                Line::DishLabel { value, .. } => {
                    if let (Some(idx), Some(value)) = (current, &value) {
                        sections[idx].dishes.extend(split_dish_list(value));
                    }
                    collecting = value.is_none();
                }
                Line::OtherLabel | Line::Text => collecting = false,
                Line::Bullet(dish) => {
                    if let (Some(idx), true) = (current, collecting) {
                        sections[idx].dishes.push(dish);
                    }
                }
            }
        }

        if sections.is_empty() {
            return None;
        }
        finalize(sections, ctx)
    }
}

/// Labelled bullet lines anywhere in the text, dealt out three per meal.
pub struct Bullets;

pub const DISHES_PER_MEAL: usize = 3;
pub const MAX_MEALS: usize = 3;

impl ExtractStrategy for Bullets {
    fn name(&self) -> &'static str {
        "bullets"
    }

    fn source(&self) -> MealSource {
        MealSource::AiBullets
    }

    fn try_extract(&self, text: &str, ctx: &NormalizeContext) -> Option<Vec<Meal>> {
        let raw = text
            .lines()
            .filter_map(|l| match classify(l) {
                Line::DishLabel {
                    bullet: true,
                    value: Some(v),
                } => Some(split_dish_list(&v)),
                _ => None,
            })
            .flatten();
        let dishes = clean_dishes(raw);
        if dishes.is_empty() {
            return None;
        }

        let meal_count = dishes.len().div_ceil(DISHES_PER_MEAL).min(MAX_MEALS);
        let mut drafts = vec![MealDraft::default(); meal_count];
        for (i, dish) in dishes.into_iter().enumerate() {
            let slot = (i / DISHES_PER_MEAL).min(meal_count - 1);
            drafts[slot].dishes.push(dish);
        }
        finalize(drafts, ctx)
    }
}

#[cfg(test)]
mod text_tests {
    use super::*;
    use crate::suggestions::normalize::clean::PLACEHOLDER_DISH;
    use crate::suggestions::normalize::Normalizer;

    fn ctx() -> NormalizeContext {
        NormalizeContext {
            target_calories: 2000,
        }
    }

    const MARKDOWN_PLAN: &str = "# 花子さんの1日献立プラン
## 朝食
- **メニュー**:
  - 鮭おにぎり
  - 豆腐とわかめの味噌汁
- **カロリー**: 約450kcal
- **使用食材リストと分量**:
  - 米: 150g
  - 鮭: 40g
- **簡単な調理手順**:
  - 米を炊く

## 昼食
- **メニュー**: 鶏そぼろ丼、小松菜のお浸し
- **カロリー**: 約700kcal

## 夕食
- 主菜: さばの味噌煮(300kcal)
- 副菜: 主菜
- 汁物: けんちん汁

## 1日合計
- **総カロリー**: 約1900kcal
";

    #[test]
    fn classifies_lines() {
        assert_eq!(classify("## 朝食"), Line::MealHeading(MealType::Breakfast, None));
        assert_eq!(classify("【夕食】"), Line::MealHeading(MealType::Dinner, None));
        assert_eq!(
            classify("昼食: そば、天ぷら"),
            Line::MealHeading(MealType::Lunch, Some("そば、天ぷら".into()))
        );
        assert_eq!(classify("## 1日合計"), Line::OtherHeading);
        assert_eq!(
            classify("- **主菜**: 焼き魚"),
            Line::DishLabel {
                bullet: true,
                value: Some("焼き魚".into())
            }
        );
        assert_eq!(classify("- カロリー: 500kcal"), Line::OtherLabel);
        assert_eq!(classify("  - 納豆"), Line::Bullet("納豆".into()));
        assert_eq!(classify("朝食はしっかり食べましょう。"), Line::Text);
    }

    #[test]
    fn headings_collect_sections_and_use_split_calories() {
        let meals = Headings.try_extract(MARKDOWN_PLAN, &ctx()).unwrap();
        assert_eq!(meals.len(), 3);
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
        assert_eq!(meals[0].dishes, vec!["鮭おにぎり", "豆腐とわかめの味噌汁"]);
        assert_eq!(meals[1].dishes, vec!["鶏そぼろ丼", "小松菜のお浸し"]);
        assert_eq!(meals[2].dishes, vec!["さばの味噌煮", "鶏の照り焼き", "けんちん汁"]);
        // calories come from the split, not from the text
        assert_eq!(
            meals.iter().map(|m| m.calories).collect::<Vec<_>>(),
            vec![500, 700, 800]
        );
    }

    #[test]
    fn heading_without_dishes_gets_placeholder() {
        let text = "朝食\n- ご飯\n- 納豆\n\n夕食\n特になし\n";
        let meals = Headings.try_extract(text, &ctx()).unwrap();
        assert_eq!(meals[0].dishes, vec!["ご飯", "納豆"]);
        assert_eq!(meals[1].meal_type, MealType::Dinner);
        assert_eq!(meals[1].dishes, vec![PLACEHOLDER_DISH]);
        assert_eq!(meals[0].calories + meals[1].calories, 2000);
    }

    #[test]
    fn bullets_are_grouped_in_threes() {
        let text = "おすすめ:\n- 主菜: 焼き鮭\n- 副菜: 冷奴\n- 汁物: 味噌汁\n- 主菜: 生姜焼き\n- 副菜: ポテトサラダ\n";
        assert!(Headings.try_extract(text, &ctx()).is_none());
        let meals = Bullets.try_extract(text, &ctx()).unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].dishes, vec!["焼き鮭", "冷奴", "味噌汁"]);
        assert_eq!(meals[1].dishes, vec!["生姜焼き", "ポテトサラダ"]);
        assert_eq!(meals[0].meal_type, MealType::Numbered(1));
        assert_eq!(meals[0].calories + meals[1].calories, 2000);

        let out = Normalizer::default().normalize(text, &ctx()).unwrap();
        assert_eq!(out.source, MealSource::AiBullets);
    }

    #[test]
    fn bullets_never_exceed_three_meals() {
        let text = (1..=11)
            .map(|i| format!("- 主菜: 料理{}号", i))
            .collect::<Vec<_>>()
            .join("\n");
        let meals = Bullets.try_extract(&text, &ctx()).unwrap();
        assert_eq!(meals.len(), 3);
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
        assert_eq!(meals[2].dishes.len(), 5);
    }
}
