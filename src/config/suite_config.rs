use crate::core::rules::ValidationRules;
use crate::domain::model::{CollectionLocator, Selector, ViewportProfile};
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    pub suite: SuiteInfo,
    pub selectors: CollectionLocator,
    /// 各頁面未指定時使用的錯誤頁提示文字
    #[serde(default)]
    pub fallback_texts: Vec<String>,
    #[serde(default)]
    pub pages: Vec<PageCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    /// 區塊存在，並依規則驗證卡片
    #[default]
    Present,
    /// 區塊不應出現
    Absent,
    /// 無效商品頁，應顯示提示文字
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCheck {
    pub name: String,
    pub url: String,
    pub viewport: Option<String>,
    #[serde(default)]
    pub expect: Expectation,
    #[serde(default)]
    pub rules: ValidationRules,
    #[serde(default)]
    pub stability: bool,
    pub layout: Option<LayoutRule>,
    #[serde(default)]
    pub fallback_texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRule {
    pub selector: Selector,
    pub property: String,
    pub allowed: Vec<String>,
}

impl SuiteConfig {
    /// 從 TOML 檔案載入測試組
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AuditError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析測試組
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AuditError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PRODUCT_URL})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AuditError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("suite.name", &self.suite.name)?;

        if self.pages.is_empty() {
            return Err(AuditError::MissingConfigError {
                field: "pages".to_string(),
            });
        }

        let mut names = HashSet::new();
        for page in &self.pages {
            let field = |name: &str| format!("pages[{}].{}", page.name, name);

            validate_non_empty_string("pages.name", &page.name)?;
            if !names.insert(page.name.as_str()) {
                return Err(AuditError::InvalidConfigValueError {
                    field: "pages.name".to_string(),
                    value: page.name.clone(),
                    reason: "Page names must be unique".to_string(),
                });
            }

            validate_url(&field("url"), &page.url)?;

            if let Some(viewport) = &page.viewport {
                if ViewportProfile::preset(viewport).is_none() {
                    return Err(AuditError::InvalidConfigValueError {
                        field: field("viewport"),
                        value: viewport.clone(),
                        reason: format!(
                            "Unknown viewport. Valid viewports: {}",
                            ViewportProfile::PRESETS.join(", ")
                        ),
                    });
                }
            }

            page.rules.validate()?;

            if page.expect == Expectation::Fallback && self.fallback_texts_for(page).is_empty() {
                return Err(AuditError::MissingConfigError {
                    field: field("fallback_texts"),
                });
            }

            if let Some(layout) = &page.layout {
                validate_non_empty_string(&field("layout.property"), &layout.property)?;
                if layout.allowed.is_empty() {
                    return Err(AuditError::MissingConfigError {
                        field: field("layout.allowed"),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn viewport_for(&self, page: &PageCheck) -> ViewportProfile {
        page.viewport
            .as_deref()
            .and_then(ViewportProfile::preset)
            .unwrap_or_default()
    }

    pub fn fallback_texts_for<'a>(&'a self, page: &'a PageCheck) -> &'a [String] {
        if page.fallback_texts.is_empty() {
            &self.fallback_texts
        } else {
            &page.fallback_texts
        }
    }
}

impl Validate for SuiteConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
