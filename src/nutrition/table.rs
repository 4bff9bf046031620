//! Reference nutrition values per serving.
//!
//! The table is a constant: it is built once on first use and only ever
//! handed out by shared reference.

use std::ops::Add;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
}

impl NutritionFacts {
    pub const fn new(calories: f64, protein: f64, fat: f64, carbs: f64) -> Self {
        Self {
            calories,
            protein,
            fat,
            carbs,
        }
    }

    /// Calories to the unit, macros to one decimal.
    pub fn rounded(self) -> Self {
        let one_decimal = |v: f64| (v * 10.0).round() / 10.0;
        Self {
            calories: self.calories.round(),
            protein: one_decimal(self.protein),
            fat: one_decimal(self.fat),
            carbs: one_decimal(self.carbs),
        }
    }
}

impl Add for NutritionFacts {
    type Output = NutritionFacts;

    fn add(self, o: NutritionFacts) -> NutritionFacts {
        NutritionFacts {
            calories: self.calories + o.calories,
            protein: self.protein + o.protein,
            fat: self.fat + o.fat,
            carbs: self.carbs + o.carbs,
        }
    }
}

/// Estimate used for foods the table does not know.
pub const UNKNOWN_FOOD: NutritionFacts = NutritionFacts::new(200.0, 8.0, 5.0, 35.0);

const BUILTIN: &[(&str, NutritionFacts)] = &[
    // grains
    ("玄米", NutritionFacts::new(343.0, 12.7, 6.0, 64.9)),
    ("精白米", NutritionFacts::new(346.0, 11.2, 4.4, 69.7)),
    ("あわもち", NutritionFacts::new(210.0, 5.1, 1.3, 45.3)),
    ("オートミール", NutritionFacts::new(350.0, 13.7, 5.7, 69.1)),
    ("七分つき押し麦", NutritionFacts::new(343.0, 10.9, 2.1, 72.1)),
    ("押し麦", NutritionFacts::new(329.0, 6.7, 1.5, 78.3)),
    ("押し麦 めし", NutritionFacts::new(118.0, 2.2, 0.5, 28.5)),
    ("米粒麦", NutritionFacts::new(333.0, 7.0, 2.1, 76.2)),
    ("大麦めん", NutritionFacts::new(343.0, 12.9, 1.7, 68.0)),
    ("大麦めん ゆで", NutritionFacts::new(121.0, 4.8, 0.6, 24.3)),
    ("ご飯", NutritionFacts::new(168.0, 2.5, 0.3, 37.1)),
    ("パン", NutritionFacts::new(264.0, 9.3, 4.4, 46.7)),
    ("食パン", NutritionFacts::new(158.0, 5.6, 2.5, 28.0)),
    // proteins
    ("鶏肉", NutritionFacts::new(200.0, 19.5, 11.6, 0.0)),
    ("牛肉", NutritionFacts::new(259.0, 17.4, 20.0, 0.4)),
    ("豚肉", NutritionFacts::new(263.0, 17.1, 20.6, 0.2)),
    ("魚", NutritionFacts::new(132.0, 20.7, 4.8, 0.1)),
    ("卵", NutritionFacts::new(151.0, 12.3, 10.3, 0.3)),
    ("納豆", NutritionFacts::new(100.0, 8.3, 5.0, 6.1)),
    ("ヨーグルト", NutritionFacts::new(62.0, 3.6, 3.0, 4.9)),
    // vegetables / fruit
    ("野菜", NutritionFacts::new(20.0, 1.0, 0.1, 4.0)),
    ("サラダ", NutritionFacts::new(20.0, 1.0, 0.1, 4.0)),
    ("バナナ", NutritionFacts::new(86.0, 1.1, 0.2, 22.5)),
    // dishes
    ("目玉焼き", NutritionFacts::new(90.0, 6.2, 7.0, 0.2)),
    ("焼き鮭", NutritionFacts::new(130.0, 18.0, 5.5, 0.1)),
    ("鮭の塩焼き", NutritionFacts::new(150.0, 19.0, 6.5, 0.1)),
    ("鮭の西京焼き", NutritionFacts::new(180.0, 18.5, 7.0, 6.0)),
    ("ぶりの照り焼き", NutritionFacts::new(260.0, 19.0, 15.5, 8.0)),
    ("鶏の照り焼き", NutritionFacts::new(250.0, 20.0, 14.0, 8.0)),
    ("豚の生姜焼き", NutritionFacts::new(300.0, 17.0, 21.0, 9.0)),
    ("豚肉と茄子の味噌炒め", NutritionFacts::new(260.0, 12.0, 18.0, 12.0)),
    ("鶏肉と野菜の煮物", NutritionFacts::new(180.0, 13.0, 6.0, 16.0)),
    ("ハンバーグ", NutritionFacts::new(350.0, 18.0, 24.0, 14.0)),
    ("野菜炒め", NutritionFacts::new(150.0, 5.0, 10.0, 10.0)),
    ("きんぴらごぼう", NutritionFacts::new(80.0, 1.2, 3.5, 11.0)),
    ("ひじきの煮物", NutritionFacts::new(70.0, 2.5, 3.0, 8.5)),
    ("切り干し大根", NutritionFacts::new(70.0, 1.8, 2.5, 10.0)),
    ("ほうれん草のお浸し", NutritionFacts::new(25.0, 2.3, 0.3, 3.0)),
    ("ほうれん草のごま和え", NutritionFacts::new(60.0, 2.8, 3.6, 4.5)),
    ("きゅうりの酢の物", NutritionFacts::new(30.0, 1.0, 0.1, 6.0)),
    ("もやしのナムル", NutritionFacts::new(60.0, 1.8, 4.0, 3.5)),
    ("コールスロー", NutritionFacts::new(90.0, 1.0, 7.0, 6.0)),
    ("野菜サラダ", NutritionFacts::new(40.0, 1.2, 2.0, 5.0)),
    ("味噌汁", NutritionFacts::new(40.0, 2.5, 1.2, 4.5)),
    ("卵スープ", NutritionFacts::new(60.0, 4.0, 3.5, 2.5)),
    ("コンソメスープ", NutritionFacts::new(30.0, 0.8, 0.5, 5.0)),
    ("わかめスープ", NutritionFacts::new(25.0, 1.0, 1.2, 2.5)),
];

lazy_static! {
    static ref REFERENCE: NutritionTable = NutritionTable::builtin();
    static ref FOOD_SEPARATOR: Regex = Regex::new(r"[、,，]+").unwrap();
}

/// Process-wide reference table.
pub fn reference_table() -> &'static NutritionTable {
    &REFERENCE
}

#[derive(Debug, Clone)]
pub struct NutritionTable {
    entries: Vec<(String, NutritionFacts)>,
}

impl NutritionTable {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }

    /// Longer names are tried first during partial matching.
    pub fn from_entries(mut entries: Vec<(String, NutritionFacts)>) -> Self {
        entries.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name first, then the most specific partial match either way round.
    pub fn lookup(&self, food: &str) -> Option<NutritionFacts> {
        let food = food.trim();
        if food.is_empty() {
            return None;
        }
        if let Some((_, facts)) = self.entries.iter().find(|(k, _)| k == food) {
            return Some(*facts);
        }
        self.entries
            .iter()
            .find(|(k, _)| food.contains(k.as_str()) || k.contains(food))
            .map(|(_, facts)| *facts)
    }

    pub fn estimate(&self, food: &str) -> NutritionFacts {
        self.lookup(food).unwrap_or(UNKNOWN_FOOD)
    }

    /// Sum of estimates for each free-text meal entry. Entries may list
    /// several foods separated by `、`, `,` or `，`; blank entries and `—` count as zero.
    pub fn estimate_meals(&self, contents: &[String]) -> NutritionFacts {
        contents
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty() && *c != "—")
            .flat_map(|c| FOOD_SEPARATOR.split(c))
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| self.estimate(f))
            .fold(NutritionFacts::default(), Add::add)
            .rounded()
    }
}
