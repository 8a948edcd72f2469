use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("WebDriver command failed: {0}")]
    WebDriverError(#[from] fantoccini::error::CmdError),

    #[error("WebDriver session could not be created: {0}")]
    SessionError(#[from] fantoccini::error::NewSessionError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Navigation to {url} failed: {message}")]
    NavigationError { url: String, message: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Browser,
    Network,
    Io,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::WebDriverError(_)
            | AuditError::SessionError(_)
            | AuditError::NavigationError { .. } => ErrorCategory::Browser,
            AuditError::HttpError(_) => ErrorCategory::Network,
            AuditError::IoError(_) => ErrorCategory::Io,
            AuditError::SerializationError(_) => ErrorCategory::Data,
            AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::InvalidSelector { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 頁面暫時無法載入，通常重跑即可
            AuditError::NavigationError { .. } | AuditError::HttpError(_) => ErrorSeverity::Medium,
            AuditError::WebDriverError(_) | AuditError::SerializationError(_) => {
                ErrorSeverity::High
            }
            AuditError::SessionError(_) | AuditError::IoError(_) => ErrorSeverity::Critical,
            AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::InvalidSelector { .. } => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AuditError::WebDriverError(e) => format!("The browser rejected a command: {}", e),
            AuditError::SessionError(_) => {
                "Could not start a browser session on the WebDriver server".to_string()
            }
            AuditError::HttpError(_) => "The WebDriver server could not be reached".to_string(),
            AuditError::IoError(e) => format!("File access failed: {}", e),
            AuditError::SerializationError(e) => format!("Malformed JSON data: {}", e),
            AuditError::ConfigValidationError { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            AuditError::InvalidConfigValueError { field, reason, .. } => {
                format!("'{}' is not valid: {}", field, reason)
            }
            AuditError::MissingConfigError { field } => {
                format!("'{}' must be configured", field)
            }
            AuditError::NavigationError { url, .. } => format!("Could not open {}", url),
            AuditError::InvalidSelector { selector, .. } => {
                format!("Selector '{}' could not be used", selector)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the suite TOML file and command line flags",
            ErrorCategory::Browser => {
                "Make sure chromedriver/geckodriver is running and the page URL is reachable"
            }
            ErrorCategory::Network => "Check --webdriver-url and that the driver is listening",
            ErrorCategory::Io => "Check file paths and permissions",
            ErrorCategory::Data => "Re-capture the fixture or report file",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
