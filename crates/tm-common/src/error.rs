use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

/// Failure taxonomy for embedding, scoring and index operations.
///
/// Scoring functions never produce these; only the pipeline stages that talk
/// to a provider, an explainer or a search index do.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl MatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::InvalidArgument(_) => "invalid_argument",
            MatchError::ProviderUnavailable(_) => "provider_unavailable",
            MatchError::IndexUnavailable(_) => "index_unavailable",
            MatchError::NotFound(_) => "not_found",
            MatchError::Timeout(_) => "timeout",
            MatchError::Cancelled(_) => "cancelled",
        }
    }

    /// Transient failures worth another attempt under the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MatchError::ProviderUnavailable(_)
                | MatchError::IndexUnavailable(_)
                | MatchError::Timeout(_)
        )
    }

    /// Folds a timeout into the provider category once retries are exhausted.
    pub fn into_provider_unavailable(self) -> Self {
        match self {
            MatchError::Timeout(msg) => MatchError::ProviderUnavailable(format!("timed out: {msg}")),
            other => other,
        }
    }

    /// Folds a timeout into the index category once retries are exhausted.
    pub fn into_index_unavailable(self) -> Self {
        match self {
            MatchError::Timeout(msg) => MatchError::IndexUnavailable(format!("timed out: {msg}")),
            other => other,
        }
    }

    fn message(&self) -> &str {
        match self {
            MatchError::InvalidArgument(msg)
            | MatchError::ProviderUnavailable(msg)
            | MatchError::IndexUnavailable(msg)
            | MatchError::NotFound(msg)
            | MatchError::Timeout(msg)
            | MatchError::Cancelled(msg) => msg,
        }
    }

    /// Serializable view of the error with URLs, query strings and paths removed.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: sanitize_message(self.message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

fn sanitize_message(message: &str) -> String {
    const MAX_LEN: usize = 240;

    let mut cleaned = message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .map(|token| {
            if token.contains("://") {
                "[redacted-url]".to_string()
            } else if let Some((base, _)) = token.split_once('?') {
                if base.is_empty() {
                    "[redacted-query]".to_string()
                } else {
                    format!("{base}?[redacted]")
                }
            } else if token.starts_with('/') || token.contains('\\') {
                "[redacted-path]".to_string()
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.chars().count() > MAX_LEN {
        cleaned = cleaned.chars().take(MAX_LEN).collect();
        cleaned.push('…');
    }

    if cleaned.trim().is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(MatchError::ProviderUnavailable("503".into()).is_retryable());
        assert!(MatchError::IndexUnavailable("refused".into()).is_retryable());
        assert!(MatchError::Timeout("embed".into()).is_retryable());
        assert!(!MatchError::InvalidArgument("id".into()).is_retryable());
        assert!(!MatchError::NotFound("job-1".into()).is_retryable());
        assert!(!MatchError::Cancelled("batch".into()).is_retryable());
    }

    #[test]
    fn timeout_folds_into_provider_category() {
        let folded = MatchError::Timeout("embed after 30s".into()).into_provider_unavailable();
        assert_eq!(folded.kind(), "provider_unavailable");
        assert!(folded.to_string().contains("embed after 30s"));

        let untouched = MatchError::NotFound("x".into()).into_provider_unavailable();
        assert_eq!(untouched, MatchError::NotFound("x".into()));
    }

    #[test]
    fn report_redacts_urls_and_paths() {
        let err = MatchError::IndexUnavailable(
            "connect to https://search.internal:9200 failed reading /etc/secret".into(),
        );
        let report = err.report();
        assert_eq!(report.kind, "index_unavailable");
        assert!(report.message.contains("[redacted-url]"));
        assert!(report.message.contains("[redacted-path]"));
        assert!(!report.message.contains("search.internal"));
    }

    #[test]
    fn report_never_returns_empty_message() {
        let report = MatchError::ProviderUnavailable("\n\r".into()).report();
        assert_eq!(report.message, "unexpected error");
    }

    #[test]
    fn report_truncates_long_messages() {
        let long = "word ".repeat(100);
        let report = MatchError::InvalidArgument(long).report();
        assert!(report.message.chars().count() <= 241);
        assert!(report.message.ends_with('…'));
    }
}
