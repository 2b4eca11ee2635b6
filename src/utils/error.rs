use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Upstream {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("Worksheet not found: {name}")]
    WorksheetNotFound { name: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Upstream,
    Storage,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BotError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BotError::ConfigError { .. }
            | BotError::MissingConfigError { .. }
            | BotError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            BotError::HttpError(_)
            | BotError::UpstreamStatus { .. }
            | BotError::UnexpectedResponse { .. } => ErrorCategory::Upstream,
            BotError::CsvError(_) | BotError::WorksheetNotFound { .. } => ErrorCategory::Storage,
            BotError::SerializationError(_) | BotError::ProcessingError { .. } => {
                ErrorCategory::Data
            }
            BotError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 上游失敗只影響單次執行
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::Low,
            ErrorCategory::Storage | ErrorCategory::Io => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            BotError::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            BotError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            BotError::ConfigError { message } => format!("Configuration problem: {}", message),
            BotError::UpstreamStatus { status, .. } => {
                format!("Remote service answered with HTTP {}", status)
            }
            BotError::HttpError(e) if e.is_timeout() => "Remote service timed out".to_string(),
            BotError::WorksheetNotFound { name } => {
                format!("Worksheet '{}' does not exist in the workbook", name)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the environment variables and the TOML settings file"
            }
            ErrorCategory::Upstream => "The remote API may be down; try again later",
            ErrorCategory::Storage => {
                "Check that the workbook directory exists and contains the Members and RawItems sheets"
            }
            ErrorCategory::Data => "Inspect the upstream payload; the data did not have the expected shape",
            ErrorCategory::Io => "Check file permissions and free disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = BotError::MissingConfigError {
            field: "DISCORD_BOT_TOKEN".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = BotError::UpstreamStatus {
            url: "http://x/guilds/1/members".to_string(),
            status: 503,
        };
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_user_friendly_message() {
        let err = BotError::InvalidConfigValueError {
            field: "FORUM_CHANNEL_ID".to_string(),
            value: "abc".to_string(),
            reason: "must be a numeric id".to_string(),
        };
        assert_eq!(
            err.user_friendly_message(),
            "Setting 'FORUM_CHANNEL_ID' is invalid: must be a numeric id"
        );
    }
}
