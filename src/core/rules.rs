use crate::utils::error::{AuditError, Result};
use crate::utils::validation::{validate_bounds, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequiredField {
    Image,
    Title,
    Price,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequiredField::Image => "image",
            RequiredField::Title => "title",
            RequiredField::Price => "price",
        };
        f.write_str(name)
    }
}

/// 閉區間 `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// 卡片清單的驗證規則，所有欄位皆可省略
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationRules {
    pub max_count: Option<usize>,
    pub min_count: usize,
    pub price_range: Option<PriceRange>,
    pub category_filter: Option<String>,
    pub required_fields: BTreeSet<RequiredField>,
}

impl ValidationRules {
    pub fn with_max_count(mut self, max: usize) -> Self {
        self.max_count = Some(max);
        self
    }

    pub fn with_min_count(mut self, min: usize) -> Self {
        self.min_count = min;
        self
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.price_range = Some(PriceRange::new(min, max));
        self
    }

    pub fn with_category_filter(mut self, filter: impl Into<String>) -> Self {
        self.category_filter = Some(filter.into());
        self
    }

    pub fn require(mut self, field: RequiredField) -> Self {
        self.required_fields.insert(field);
        self
    }
}

impl Validate for ValidationRules {
    fn validate(&self) -> Result<()> {
        if let Some(max) = self.max_count {
            validate_bounds("rules.min_count..max_count", self.min_count, max)?;
        }

        if let Some(range) = &self.price_range {
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(AuditError::InvalidConfigValueError {
                    field: "rules.price_range".to_string(),
                    value: format!("{}..{}", range.min, range.max),
                    reason: "Price bounds must be finite numbers".to_string(),
                });
            }
            validate_bounds("rules.price_range", range.min, range.max)?;
        }

        if let Some(filter) = &self.category_filter {
            validate_non_empty_string("rules.category_filter", filter)?;
        }

        Ok(())
    }
}
