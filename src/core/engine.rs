use crate::config::suite_config::{Expectation, LayoutRule, PageCheck, SuiteConfig};
use crate::core::report::{
    CollectionOutcome, FallbackCheck, LayoutCheck, PageReport, Problem, SuiteReport,
};
use crate::core::validator::{check_stability, validate_collection};
use crate::domain::model::Selector;
use crate::domain::ports::PageDriver;
use crate::utils::error::Result;

/// 依測試組設定逐頁執行檢查
///
/// Pages run sequentially on one driver. A driver error aborts the run and is
/// returned unchanged; rule failures never do.
pub struct AuditEngine<D: PageDriver> {
    driver: D,
    suite: SuiteConfig,
    only: Option<String>,
}

impl<D: PageDriver> AuditEngine<D> {
    pub fn new(driver: D, suite: SuiteConfig) -> Self {
        Self {
            driver,
            suite,
            only: None,
        }
    }

    pub fn with_page_filter(mut self, only: Option<String>) -> Self {
        self.only = only;
        self
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub async fn run(&mut self) -> Result<SuiteReport> {
        tracing::info!("🚀 Running suite '{}'", self.suite.suite.name);

        let pages: Vec<PageCheck> = self
            .suite
            .pages
            .iter()
            .filter(|page| self.only.as_deref().map_or(true, |only| page.name == only))
            .cloned()
            .collect();

        if pages.is_empty() {
            tracing::warn!("No page checks matched {:?}", self.only);
        }

        let mut report = SuiteReport::new(self.suite.suite.name.clone());
        for page in &pages {
            let page_report = self.run_page(page).await?;
            if page_report.passed() {
                tracing::info!("✅ {}", page_report.name);
            } else {
                for problem in &page_report.problems {
                    tracing::warn!("❌ {}: {}", page_report.name, problem);
                }
            }
            report.pages.push(page_report);
        }

        tracing::info!(
            "📊 {} of {} page checks passed",
            report.pages.iter().filter(|page| page.passed()).count(),
            report.pages.len()
        );
        Ok(report)
    }

    pub async fn run_page(&mut self, page: &PageCheck) -> Result<PageReport> {
        let viewport = self.suite.viewport_for(page);
        tracing::debug!("Opening {} at {} ({})", page.name, page.url, viewport.name);

        self.driver.set_viewport(&viewport).await?;
        self.driver.goto(&page.url).await?;

        let mut report = PageReport {
            name: page.name.clone(),
            url: page.url.clone(),
            viewport,
            collection: None,
            section_visible: None,
            stability: None,
            layout: None,
            fallback: None,
            problems: Vec::new(),
        };

        match page.expect {
            Expectation::Present => self.check_present(page, &mut report).await?,
            Expectation::Absent => self.check_absent(&mut report).await?,
            Expectation::Fallback => self.check_fallback(page, &mut report).await?,
        }

        if let Some(rule) = &page.layout {
            self.check_layout(rule, &mut report).await?;
        }

        Ok(report)
    }

    async fn check_present(&mut self, page: &PageCheck, report: &mut PageReport) -> Result<()> {
        let Some(collection) = self.driver.fetch_collection(&self.suite.selectors).await? else {
            report.collection = Some(CollectionOutcome::StructureAbsent);
            report.problems.push(Problem::SectionMissing);
            return Ok(());
        };

        let visible = self.driver.is_visible(&self.suite.selectors.container).await?;
        if !visible {
            report.problems.push(Problem::SectionHidden);
        }
        report.section_visible = Some(visible);

        let result = validate_collection(&collection, &page.rules);
        tracing::debug!(
            "{}: {} cards, {} violation(s)",
            page.name,
            collection.len(),
            result.violation_count()
        );
        if !result.is_ok() {
            report.problems.push(Problem::RuleViolations {
                count: result.violation_count(),
            });
        }
        report.collection = Some(CollectionOutcome::Checked {
            size: collection.len(),
            result,
        });

        if page.stability {
            self.driver.reload().await?;
            let reloaded = self
                .driver
                .fetch_collection(&self.suite.selectors)
                .await?
                .unwrap_or_default();
            let stability = check_stability(&collection, &reloaded);
            if !stability.stable {
                report.problems.push(Problem::Unstable {
                    before: stability.before.clone(),
                    after: stability.after.clone(),
                });
            }
            report.stability = Some(stability);
        }

        Ok(())
    }

    async fn check_absent(&mut self, report: &mut PageReport) -> Result<()> {
        match self.driver.fetch_collection(&self.suite.selectors).await? {
            None => report.collection = Some(CollectionOutcome::StructureAbsent),
            Some(collection) => {
                report.problems.push(Problem::SectionUnexpected {
                    cards: collection.len(),
                });
                report.collection = Some(CollectionOutcome::Checked {
                    size: collection.len(),
                    result: validate_collection(&collection, &Default::default()),
                });
            }
        }
        Ok(())
    }

    async fn check_fallback(&mut self, page: &PageCheck, report: &mut PageReport) -> Result<()> {
        let texts = self.suite.fallback_texts_for(page).to_vec();
        let mut visible = Vec::new();
        for text in &texts {
            if self.driver.is_visible(&Selector::Text(text.clone())).await? {
                visible.push(text.clone());
            }
        }

        let check = FallbackCheck {
            expected_any_of: texts,
            visible,
        };
        if !check.passed() {
            report.problems.push(Problem::FallbackMissing);
        }
        report.fallback = Some(check);
        Ok(())
    }

    async fn check_layout(&mut self, rule: &LayoutRule, report: &mut PageReport) -> Result<()> {
        let actual = self.driver.css_value(&rule.selector, &rule.property).await?;
        let passed = actual.as_deref().is_some_and(|value| {
            rule.allowed
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(value.trim()))
        });

        if !passed {
            report.problems.push(Problem::LayoutMismatch {
                property: rule.property.clone(),
                actual: actual.clone(),
            });
        }
        report.layout = Some(LayoutCheck {
            selector: rule.selector.to_string(),
            property: rule.property.clone(),
            actual,
            allowed: rule.allowed.clone(),
            passed,
        });
        Ok(())
    }

    /// 結束瀏覽器工作階段
    pub async fn finish(mut self) -> Result<()> {
        self.driver.close().await
    }
}
