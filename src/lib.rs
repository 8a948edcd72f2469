pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{fixture::FixtureDriver, webdriver::WebDriverPage};
pub use config::SuiteConfig;
pub use core::{
    engine::AuditEngine,
    report::SuiteReport,
    rules::ValidationRules,
    validator::{check_stability, parse_price, validate_collection, ValidationResult},
};
pub use utils::error::{AuditError, Result};
