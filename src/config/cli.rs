use crate::utils::error::Result;
use crate::utils::validation::{validate_in_range, validate_path, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "card-audit")]
#[command(about = "Checks the related items module of product pages")]
pub struct CliConfig {
    #[arg(long, short, default_value = "suites/related_items.toml")]
    pub suite: String,

    #[arg(long, default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    #[arg(long, help = "Run the browser without a window")]
    pub headless: bool,

    #[arg(long, default_value_t = 5, help = "Seconds to wait for the related items section")]
    pub wait_secs: u64,

    #[arg(long, help = "Serve pages from a JSON fixture file instead of a live browser")]
    pub fixtures: Option<String>,

    #[arg(long, help = "Write the JSON report to this path")]
    pub report: Option<String>,

    #[arg(long, help = "Only run the page check with this name")]
    pub only: Option<String>,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("suite", &self.suite)?;

        match &self.fixtures {
            Some(fixtures) => validate_path("fixtures", fixtures)?,
            None => {
                validate_url("webdriver_url", &self.webdriver_url)?;
                validate_in_range("wait_secs", self.wait_secs, 1, 120)?;
            }
        }

        if let Some(report) = &self.report {
            validate_path("report", report)?;
        }

        Ok(())
    }
}
