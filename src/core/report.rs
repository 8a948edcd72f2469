use crate::core::validator::{StabilityCheck, ValidationResult};
use crate::domain::model::ViewportProfile;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// 區塊本身不存在，與「區塊存在但沒有卡片」不同
    StructureAbsent,
    Checked {
        size: usize,
        result: ValidationResult,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutCheck {
    pub selector: String,
    pub property: String,
    pub actual: Option<String>,
    pub allowed: Vec<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackCheck {
    pub expected_any_of: Vec<String>,
    pub visible: Vec<String>,
}

impl FallbackCheck {
    pub fn passed(&self) -> bool {
        !self.visible.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    SectionMissing,
    SectionHidden,
    SectionUnexpected { cards: usize },
    RuleViolations { count: usize },
    Unstable {
        before: Option<String>,
        after: Option<String>,
    },
    LayoutMismatch {
        property: String,
        actual: Option<String>,
    },
    FallbackMissing,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::SectionMissing => write!(f, "related items section is not on the page"),
            Problem::SectionHidden => {
                write!(f, "related items section is on the page but not displayed")
            }
            Problem::SectionUnexpected { cards } => {
                write!(f, "related items section is present with {} cards", cards)
            }
            Problem::RuleViolations { count } => write!(f, "{} rule violation(s)", count),
            Problem::Unstable { before, after } => write!(
                f,
                "first item changed after reload: {:?} -> {:?}",
                before, after
            ),
            Problem::LayoutMismatch { property, actual } => {
                write!(f, "unexpected {}: {:?}", property, actual)
            }
            Problem::FallbackMissing => write!(f, "no fallback message is visible"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub name: String,
    pub url: String,
    pub viewport: ViewportProfile,
    pub collection: Option<CollectionOutcome>,
    pub section_visible: Option<bool>,
    pub stability: Option<StabilityCheck>,
    pub layout: Option<LayoutCheck>,
    pub fallback: Option<FallbackCheck>,
    pub problems: Vec<Problem>,
}

impl PageReport {
    pub fn passed(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn validation(&self) -> Option<&ValidationResult> {
        match &self.collection {
            Some(CollectionOutcome::Checked { result, .. }) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub generated_at: DateTime<Utc>,
    pub pages: Vec<PageReport>,
}

impl SuiteReport {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            generated_at: Utc::now(),
            pages: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.pages.iter().all(PageReport::passed)
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages.iter().filter(|page| !page.passed())
    }

    pub fn page(&self, name: &str) -> Option<&PageReport> {
        self.pages.iter().find(|page| page.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 將報告寫成 JSON 檔，必要時建立上層目錄
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
