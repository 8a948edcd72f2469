use card_audit::core::PageDriver;
use card_audit::utils::error::ErrorSeverity;
use card_audit::utils::{logger, validation::Validate};
use card_audit::{
    AuditEngine, AuditError, CliConfig, FixtureDriver, SuiteConfig, SuiteReport, WebDriverPage,
};
use clap::Parser;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting card-audit CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    let result = run(&config).await;

    match result {
        Ok(report) => {
            if let Some(path) = &config.report {
                if let Err(e) = report.write_json(path) {
                    exit_with(&e);
                }
                println!("📁 Report saved to: {}", path);
            }

            for page in &report.pages {
                let mark = if page.passed() { "✅" } else { "❌" };
                println!("{} {} ({})", mark, page.name, page.url);
                for problem in &page.problems {
                    println!("   - {}", problem);
                }
                if let Some(validation) = page.validation() {
                    for violation in &validation.count_violations {
                        println!("   · {}", violation);
                    }
                    for card in validation.cards.iter().filter(|card| !card.passed()) {
                        for violation in &card.violations {
                            println!("   · card {}: {}", card.index, violation);
                        }
                    }
                }
            }

            if !report.passed() {
                std::process::exit(1);
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

async fn run(config: &CliConfig) -> card_audit::Result<SuiteReport> {
    config.validate()?;

    let suite = SuiteConfig::from_file(&config.suite)?;
    suite.validate()?;
    tracing::info!("📋 Loaded {} page check(s) from {}", suite.pages.len(), config.suite);

    match &config.fixtures {
        Some(path) => {
            tracing::info!("🗂️ Using fixtures from {}", path);
            run_with(FixtureDriver::from_file(path)?, suite, config).await
        }
        None => {
            let driver = WebDriverPage::connect(&config.webdriver_url, config.headless)
                .await?
                .with_wait_timeout(Duration::from_secs(config.wait_secs));
            run_with(driver, suite, config).await
        }
    }
}

async fn run_with<D: PageDriver>(
    driver: D,
    suite: SuiteConfig,
    config: &CliConfig,
) -> card_audit::Result<SuiteReport> {
    let mut engine = AuditEngine::new(driver, suite).with_page_filter(config.only.clone());
    let outcome = engine.run().await;

    // 不論成功與否都關閉工作階段
    if let Err(e) = engine.finish().await {
        tracing::warn!("Failed to close browser session: {}", e);
    }
    outcome
}

fn exit_with(e: &AuditError) -> ! {
    tracing::error!(
        "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 1 保留給檢查未通過，錯誤依嚴重程度區分
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2, // 可重跑
        ErrorSeverity::Low | ErrorSeverity::High => 3,
        ErrorSeverity::Critical => 4,
    };
    std::process::exit(exit_code);
}
