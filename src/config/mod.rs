#[cfg(feature = "cli")]
pub mod cli;
pub mod suite_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use suite_config::{Expectation, LayoutRule, PageCheck, SuiteConfig, SuiteInfo};
