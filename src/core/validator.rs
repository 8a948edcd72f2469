//! Structural validation of a rendered card collection.
//!
//! Everything here is a pure function of the snapshot it is given: no I/O,
//! no retries. A run reports every violated rule across the whole
//! collection instead of stopping at the first failure.

use crate::core::rules::{RequiredField, ValidationRules};
use crate::domain::model::{Card, CardCollection};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    MaxCount { max: usize, actual: usize },
    MinCount { min: usize, actual: usize },
    PriceOutOfRange { raw: String, price: f64, min: f64, max: f64 },
    UnparsablePrice { raw: String },
    CategoryMismatch { label: String, filter: String },
    MissingField { field: RequiredField },
}

impl RuleViolation {
    pub fn rule_name(&self) -> &'static str {
        match self {
            RuleViolation::MaxCount { .. } => "max_count",
            RuleViolation::MinCount { .. } => "min_count",
            RuleViolation::PriceOutOfRange { .. } | RuleViolation::UnparsablePrice { .. } => {
                "price_range"
            }
            RuleViolation::CategoryMismatch { .. } => "category_filter",
            RuleViolation::MissingField { .. } => "required_fields",
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleViolation::MaxCount { max, actual } => {
                write!(f, "{} cards rendered, at most {} allowed", actual, max)
            }
            RuleViolation::MinCount { min, actual } => {
                write!(f, "{} cards rendered, at least {} required", actual, min)
            }
            RuleViolation::PriceOutOfRange { raw, price, min, max } => {
                write!(f, "price '{}' parsed as {} is outside {}..={}", raw, price, min, max)
            }
            RuleViolation::UnparsablePrice { raw } => write!(f, "price '{}' is not a number", raw),
            RuleViolation::CategoryMismatch { label, filter } => {
                write!(f, "category '{}' does not contain '{}'", label, filter)
            }
            RuleViolation::MissingField { field } => write!(f, "{} is missing or hidden", field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardResult {
    pub index: usize,
    pub violations: Vec<RuleViolation>,
}

impl CardResult {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub count_violations: Vec<RuleViolation>,
    /// 每張卡片一筆，順序與清單相同
    pub cards: Vec<CardResult>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.count_violations.is_empty() && self.cards.iter().all(CardResult::passed)
    }

    pub fn flagged_indices(&self) -> Vec<usize> {
        self.cards
            .iter()
            .filter(|card| !card.passed())
            .map(|card| card.index)
            .collect()
    }

    pub fn violations_for(&self, index: usize) -> &[RuleViolation] {
        self.cards
            .get(index)
            .map(|card| card.violations.as_slice())
            .unwrap_or(&[])
    }

    pub fn violation_count(&self) -> usize {
        self.count_violations.len()
            + self
                .cards
                .iter()
                .map(|card| card.violations.len())
                .sum::<usize>()
    }
}

/// 寬鬆的價格解析：只保留數字與小數點
///
/// Empty remainder is `0`. Otherwise the leading decimal number is used, so
/// `"US $5 to $10"` reads as `510`. `None` when no leading number exists.
pub fn parse_price(text: &str) -> Option<f64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if kept.is_empty() {
        return Some(0.0);
    }

    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in kept.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        end = i + 1;
    }

    kept[..end].parse::<f64>().ok()
}

pub fn validate_collection(collection: &CardCollection, rules: &ValidationRules) -> ValidationResult {
    let actual = collection.len();
    let mut count_violations = Vec::new();

    if let Some(max) = rules.max_count {
        if actual > max {
            count_violations.push(RuleViolation::MaxCount { max, actual });
        }
    }
    if actual < rules.min_count {
        count_violations.push(RuleViolation::MinCount {
            min: rules.min_count,
            actual,
        });
    }

    let cards = collection
        .iter()
        .enumerate()
        .map(|(index, card)| CardResult {
            index,
            violations: check_card(card, rules),
        })
        .collect();

    ValidationResult {
        count_violations,
        cards,
    }
}

fn check_card(card: &Card, rules: &ValidationRules) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for field in &rules.required_fields {
        let present = match field {
            RequiredField::Image => card.has_image(),
            RequiredField::Title => card.has_title(),
            RequiredField::Price => card.has_price(),
        };
        if !present {
            violations.push(RuleViolation::MissingField { field: *field });
        }
    }

    // 價格欄位不存在時交給 required_fields 判斷
    if let (Some(range), true) = (&rules.price_range, card.has_price()) {
        match parse_price(&card.price_text) {
            Some(price) if range.contains(price) => {}
            Some(price) => violations.push(RuleViolation::PriceOutOfRange {
                raw: card.price_text.clone(),
                price,
                min: range.min,
                max: range.max,
            }),
            None => violations.push(RuleViolation::UnparsablePrice {
                raw: card.price_text.clone(),
            }),
        }
    }

    if let (Some(filter), Some(label)) = (&rules.category_filter, &card.category_label) {
        if !label.to_lowercase().contains(&filter.to_lowercase()) {
            violations.push(RuleViolation::CategoryMismatch {
                label: label.clone(),
                filter: filter.clone(),
            });
        }
    }

    violations
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityCheck {
    pub before: Option<String>,
    pub after: Option<String>,
    pub stable: bool,
}

/// 重新整理前後只比對第一張卡片的文字（去除前後空白）
pub fn check_stability(before: &CardCollection, after: &CardCollection) -> StabilityCheck {
    let first_text = |collection: &CardCollection| {
        collection
            .first()
            .map(|card| card.text.trim().to_string())
    };
    let before = first_text(before);
    let after = first_text(after);
    let stable = before == after;

    StabilityCheck {
        before,
        after,
        stable,
    }
}
