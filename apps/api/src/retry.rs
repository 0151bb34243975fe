//! Retrying sender shared by the outbound API clients (LLM and embeddings).
//!
//! 429 and 5xx responses are retried with exponential backoff; any other
//! non-success status fails immediately with the provider's error message.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry number `attempt` (1-based): base, 2×base, 4×base, ...
fn backoff(base: Duration, attempt: u32) -> Duration {
    base * 2u32.pow(attempt.saturating_sub(1))
}

/// `error.message` from an OpenAI/Anthropic-style error body, else the raw body.
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Sends the request built by `build` until it succeeds, fails permanently,
/// or `MAX_ATTEMPTS` is reached. `service` labels the log lines.
pub async fn send_with_retry<F>(
    service: &str,
    base_delay: Duration,
    build: F,
) -> Result<Response, RetryError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = None;

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let delay = backoff(base_delay, attempt);
            warn!(
                "{service} attempt {attempt} failed, retrying after {}ms...",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(RetryError::Http(e));
                continue;
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = error_message(response.text().await.unwrap_or_default());
        let error = RetryError::Api {
            status: status.as_u16(),
            message,
        };
        if !is_retryable(status) {
            return Err(error);
        }
        warn!("{service} returned {status}");
        last_error = Some(error);
    }

    Err(last_error.unwrap_or(RetryError::Exhausted {
        attempts: MAX_ATTEMPTS,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_and_server_errors_are_retryable() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_backoff_doubles() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 1), Duration::from_millis(500));
        assert_eq!(backoff(base, 2), Duration::from_millis(1000));
        assert_eq!(backoff(base, 3), Duration::from_millis(2000));
    }

    #[test]
    fn test_error_message_prefers_envelope() {
        let body = r#"{"error": {"type": "invalid_request_error", "message": "bad model"}}"#;
        assert_eq!(error_message(body.to_string()), "bad model");
        assert_eq!(error_message("upstream down".to_string()), "upstream down");
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_http_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let result = send_with_retry("test", Duration::from_millis(1), || {
            client.post("http://127.0.0.1:9/unreachable")
        })
        .await;
        assert!(matches!(result, Err(RetryError::Http(_))));
    }
}
