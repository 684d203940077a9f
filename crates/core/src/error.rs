use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotlineError {
    #[error("No YouTube API keys configured. Add one with `plotline keys add <KEY>`")]
    EmptyPool,

    #[error("All {attempts} API key(s) hit their quota. Add more keys or retry tomorrow")]
    QuotaExhausted { attempts: usize },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Looks like a video URL but no video id could be read from it: {input}")]
    MalformedVideoUrl { input: String },

    #[error("YouTube API returned {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        reasons: Vec<String>,
    },

    #[error("Subtitle download failed for {url}: {reason}")]
    SubtitleFailed { url: String, reason: String },

    #[error("Failed to read key store {path}: {reason}")]
    KeyStore { path: PathBuf, reason: String },

    #[error("Failed to read archetype catalogue {path}: {reason}")]
    ArchetypeStore { path: PathBuf, reason: String },

    #[error("Invalid value for {var}: {reason}")]
    Config { var: String, reason: String },

    #[error("Analysis request failed: {reason}")]
    Analysis { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },
}

impl PlotlineError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Quota signal: the service's message (or one of its reason codes) mentions
    /// "quota" or "exceeded", case-insensitively.
    pub fn is_quota_signal(&self) -> bool {
        match self {
            Self::Remote {
                message, reasons, ..
            } => {
                crate::quota::mentions_quota(message)
                    || reasons.iter().any(|r| crate::quota::mentions_quota(r))
            }
            Self::ApiError(e) => crate::quota::mentions_quota(&e.to_string()),
            _ => false,
        }
    }

    /// Errors after which no further remote call can make progress.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EmptyPool)
    }

    /// Short next-step hint shown to the user next to the message.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::EmptyPool => "no credentials",
            Self::QuotaExhausted { .. } => "quota exhausted, add more keys",
            Self::NotFound { .. } | Self::MalformedVideoUrl { .. } => "item not found",
            Self::MissingApiKey { .. }
            | Self::KeyStore { .. }
            | Self::ArchetypeStore { .. }
            | Self::Config { .. } => "check configuration",
            _ => "transient error, retry",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlotlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(message: &str, reasons: &[&str]) -> PlotlineError {
        PlotlineError::Remote {
            status: 403,
            message: message.to_string(),
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn quota_signal_matches_message_or_reason() {
        assert!(remote("The request cannot be completed because you have exceeded your quota.", &[]).is_quota_signal());
        assert!(remote("Forbidden", &["quotaExceeded"]).is_quota_signal());
        assert!(remote("Daily Limit EXCEEDED", &[]).is_quota_signal());
        assert!(!remote("Video not found", &["videoNotFound"]).is_quota_signal());
        assert!(!PlotlineError::EmptyPool.is_quota_signal());
    }

    #[test]
    fn hints_distinguish_failure_classes() {
        assert_eq!(PlotlineError::EmptyPool.hint(), "no credentials");
        assert_eq!(
            PlotlineError::QuotaExhausted { attempts: 2 }.hint(),
            "quota exhausted, add more keys"
        );
        assert_eq!(PlotlineError::not_found("@nobody").hint(), "item not found");
        assert_eq!(remote("Backend Error", &[]).hint(), "transient error, retry");
    }
}
