use anyhow::Result;
use card_audit::config::suite_config::Expectation;
use card_audit::core::report::{CollectionOutcome, Problem};
use card_audit::utils::validation::Validate;
use card_audit::{AuditEngine, AuditError, FixtureDriver, SuiteConfig};
use std::path::PathBuf;
use tempfile::TempDir;

fn repo_file(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

const SELECTORS: &str = r#"
[suite]
name = "inline"

[selectors]
container = "xpath=//h2[contains(text(), 'Similar items')]/following-sibling::ul[1]"
item = "xpath=./li"
title = "b"
price = "span"
image = "img"
"#;

fn card(title: &str, price: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "price_text": price,
        "image_url": format!("https://img.example/{}.jpg", title),
        "text": format!("{} {}", title, price),
    })
}

/// 使用隨附的測試組與離線快照，十個頁面檢查全部通過
#[tokio::test]
async fn test_shipped_suite_passes_against_fixtures() -> Result<()> {
    let suite = SuiteConfig::from_file(repo_file("suites/related_items.toml"))?;
    suite.validate()?;
    let driver = FixtureDriver::from_file(repo_file("fixtures/related_items.json"))?;

    let mut engine = AuditEngine::new(driver, suite);
    let report = engine.run().await?;

    assert_eq!(report.pages.len(), 10);
    for page in &report.pages {
        assert!(page.passed(), "{} failed: {:?}", page.name, page.problems);
    }

    let absent = report.page("no related section").unwrap();
    assert_eq!(absent.collection, Some(CollectionOutcome::StructureAbsent));

    let mobile = report.page("mobile layout scrolls").unwrap();
    assert_eq!(mobile.viewport.name, "iphone-13");
    assert_eq!(mobile.layout.as_ref().unwrap().actual.as_deref(), Some("auto"));

    let stable = report.page("stable across reload").unwrap();
    assert!(stable.stability.as_ref().unwrap().stable);
    Ok(())
}

#[tokio::test]
async fn test_page_filter_runs_single_check() -> Result<()> {
    let suite = SuiteConfig::from_file(repo_file("suites/related_items.toml"))?;
    let driver = FixtureDriver::from_file(repo_file("fixtures/related_items.json"))?;

    let mut engine =
        AuditEngine::new(driver, suite).with_page_filter(Some("invalid product fallback".into()));
    let report = engine.run().await?;

    assert_eq!(report.pages.len(), 1);
    let fallback = report.pages[0].fallback.as_ref().unwrap();
    assert_eq!(fallback.visible.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_every_violation_is_reported() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "rules"
url = "https://shop.example/itm/1"

[pages.rules]
max_count = 2
price_range = {{ min = 5.0, max = 10.0 }}
"#,
        SELECTORS
    ))?;
    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/1": {
                "collection": [card("a", "$7.49"), card("b", "$12.00"), card("c", "US $5 to $10")]
            }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;

    let report = AuditEngine::new(driver, suite).run().await?;
    let page = &report.pages[0];

    assert!(!page.passed());
    assert_eq!(page.problems, vec![Problem::RuleViolations { count: 3 }]);
    let validation = page.validation().unwrap();
    assert_eq!(validation.count_violations.len(), 1);
    assert_eq!(validation.flagged_indices(), vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn test_missing_section_and_unexpected_section() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "expected present"
url = "https://shop.example/itm/none"

[[pages]]
name = "expected absent"
url = "https://shop.example/itm/some"
expect = "absent"

[[pages]]
name = "empty but present"
url = "https://shop.example/itm/empty"
"#,
        SELECTORS
    ))?;
    assert_eq!(suite.pages[1].expect, Expectation::Absent);

    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/none": {},
            "https://shop.example/itm/some": { "collection": [card("a", "$7.00")] },
            "https://shop.example/itm/empty": { "collection": [] }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;
    let report = AuditEngine::new(driver, suite).run().await?;

    assert_eq!(report.pages[0].problems, vec![Problem::SectionMissing]);
    assert_eq!(
        report.pages[1].problems,
        vec![Problem::SectionUnexpected { cards: 1 }]
    );
    // 區塊存在但沒有卡片，min_count 預設 0，視為通過
    assert!(report.pages[2].passed());
    assert!(matches!(
        report.pages[2].collection,
        Some(CollectionOutcome::Checked { size: 0, .. })
    ));
    assert!(!report.passed());
    assert_eq!(report.failed_pages().count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_reload_instability_and_layout_mismatch() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "shuffled"
url = "https://shop.example/itm/1"
stability = true

[pages.layout]
selector = "ul"
property = "overflow-x"
allowed = ["auto", "scroll"]
"#,
        SELECTORS
    ))?;
    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/1": {
                "collection": [card("a", "$7.00")],
                "after_reload": [card("b", "$8.00")],
                "styles": { "ul": { "overflow-x": "visible" } }
            }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;
    let report = AuditEngine::new(driver, suite).run().await?;
    let page = &report.pages[0];

    assert_eq!(
        page.problems,
        vec![
            Problem::Unstable {
                before: Some("a $7.00".to_string()),
                after: Some("b $8.00".to_string()),
            },
            Problem::LayoutMismatch {
                property: "overflow-x".to_string(),
                actual: Some("visible".to_string()),
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_driver_failure_propagates() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "unreachable"
url = "https://shop.example/itm/404"
"#,
        SELECTORS
    ))?;
    let driver = FixtureDriver::from_json_str(r#"{ "pages": {} }"#)?;

    let err = AuditEngine::new(driver, suite).run().await.unwrap_err();
    assert!(matches!(err, AuditError::NavigationError { ref url, .. } if url == "https://shop.example/itm/404"));
    Ok(())
}

#[tokio::test]
async fn test_report_written_as_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let report_path = temp_dir.path().join("reports/related.json");

    let suite = SuiteConfig::from_file(repo_file("suites/related_items.toml"))?;
    let driver = FixtureDriver::from_file(repo_file("fixtures/related_items.json"))?;
    let report = AuditEngine::new(driver, suite).run().await?;
    report.write_json(&report_path)?;

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(written["suite"], "related-items");
    assert_eq!(written["pages"].as_array().unwrap().len(), 10);
    assert_eq!(
        written["pages"][6]["collection"]["status"],
        "structure_absent"
    );
    Ok(())
}

#[tokio::test]
async fn test_hidden_section_is_reported() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "collapsed"
url = "https://shop.example/itm/1"
"#,
        SELECTORS
    ))?;
    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/1": {
                "collection": [card("a", "$7.00")],
                "section_hidden": true
            }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;
    let report = AuditEngine::new(driver, suite).run().await?;
    let page = &report.pages[0];

    assert_eq!(page.problems, vec![Problem::SectionHidden]);
    assert_eq!(page.section_visible, Some(false));
    // 卡片本身仍照常驗證
    assert!(page.validation().unwrap().is_ok());
    Ok(())
}

#[tokio::test]
async fn test_fallback_without_any_visible_message() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"fallback_texts = ["This listing was ended", "not found"]
{}
[[pages]]
name = "blank error page"
url = "https://shop.example/itm/gone"
expect = "fallback"
"#,
        SELECTORS
    ))?;
    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/gone": { "visible_texts": [] }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;
    let report = AuditEngine::new(driver, suite).run().await?;
    let page = &report.pages[0];

    assert_eq!(page.problems, vec![Problem::FallbackMissing]);
    let fallback = page.fallback.as_ref().unwrap();
    assert_eq!(fallback.expected_any_of.len(), 2);
    assert!(fallback.visible.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_section_gone_after_reload_is_unstable() -> Result<()> {
    let suite = SuiteConfig::from_toml_str(&format!(
        r#"{}
[[pages]]
name = "vanishing"
url = "https://shop.example/itm/1"
stability = true
"#,
        SELECTORS
    ))?;
    let fixtures = serde_json::json!({
        "pages": {
            "https://shop.example/itm/1": {
                "collection": [card("a", "$7.00")],
                "after_reload": []
            }
        }
    });
    let driver = FixtureDriver::from_json_str(&fixtures.to_string())?;
    let report = AuditEngine::new(driver, suite).run().await?;
    let page = &report.pages[0];

    assert_eq!(
        page.problems,
        vec![Problem::Unstable {
            before: Some("a $7.00".to_string()),
            after: None,
        }]
    );
    assert!(!page.stability.as_ref().unwrap().stable);
    Ok(())
}

#[tokio::test]
async fn test_driver_keeps_last_viewport_and_page() -> Result<()> {
    let suite = SuiteConfig::from_file(repo_file("suites/related_items.toml"))?;
    let driver = FixtureDriver::from_file(repo_file("fixtures/related_items.json"))?;

    let mut engine =
        AuditEngine::new(driver, suite).with_page_filter(Some("mobile layout scrolls".into()));
    let report = engine.run().await?;
    assert!(report.passed());

    let driver = engine.driver();
    assert_eq!(driver.viewport().name, "iphone-13");
    assert!(driver.viewport().mobile);
    assert_eq!(driver.current_url(), Some(report.pages[0].url.as_str()));
    Ok(())
}
