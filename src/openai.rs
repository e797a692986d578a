//! OpenAI client configuration with sensible defaults.

use crate::error::SiktError;
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with configured timeout.
///
/// Uses a 5-minute timeout by default to prevent hung API calls.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}

/// Classify an API error as transient (retryable) or permanent.
///
/// Rate limits, server-side errors, and network failures are transient;
/// everything else (invalid requests, content rejections) is permanent.
pub fn classify_error(err: OpenAIError) -> SiktError {
    match err {
        OpenAIError::Reqwest(e) => SiktError::Transient(format!("network error: {}", e)),
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or("");
            let kind = api.r#type.as_deref().unwrap_or("");
            let msg = api.message.clone();
            if code == "rate_limit_exceeded"
                || kind == "server_error"
                || kind == "rate_limit_error"
                || msg.contains("overloaded")
                || msg.contains("rate limit")
            {
                SiktError::Transient(msg)
            } else {
                SiktError::Permanent(msg)
            }
        }
        other => SiktError::Permanent(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(code: Option<&str>, kind: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_rate_limits_and_server_errors_are_transient() {
        let rate = classify_error(api_error(Some("rate_limit_exceeded"), None, "slow down"));
        assert!(rate.is_transient());

        let server = classify_error(api_error(None, Some("server_error"), "oops"));
        assert!(server.is_transient());
    }

    #[test]
    fn test_invalid_requests_are_permanent() {
        let err = classify_error(api_error(None, Some("invalid_request_error"), "bad model"));
        assert!(!err.is_transient());
    }
}
