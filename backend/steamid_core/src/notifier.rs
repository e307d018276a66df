// backend/steamid_core/src/notifier.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{FailureReason, NotifierError};
use crate::outcome::Outcome;
use crate::settings::Settings;

/// Longest piece of an unparseable body kept in the failure reason.
pub const SNIPPET_CHARS: usize = 100;
/// Longest piece of a response body written to the debug log.
pub const PREVIEW_CHARS: usize = 200;

/// Marks one Steam ID as processed on the remote side.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, steam_id: &str) -> Outcome;
}

#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpNotifier {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds the client from settings. Without `request_timeout_ms` the
    /// client default applies, which never times out.
    pub fn from_settings(settings: &Settings) -> Result<Self, NotifierError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(
            builder.build()?,
            settings.api_endpoint.clone(),
            settings.api_key.clone(),
        ))
    }
}

#[async_trait]
impl Notify for HttpNotifier {
    async fn notify(&self, steam_id: &str) -> Outcome {
        let response = match self
            .client
            .post(&self.endpoint)
            .header("X-API-Key", &self.api_key)
            .json(&json!({ "steam_id": steam_id }))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return network_failure(steam_id, e),
        };

        let status = response.status();
        debug!("Response status: {}", status);

        // Read as text first so an unparseable body can still be reported.
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return network_failure(steam_id, e),
        };
        debug!("Response body: {}", preview(&body));

        let outcome = classify(steam_id, status.as_u16(), &body);
        match &outcome {
            Outcome::Success {
                message, created, ..
            } => info!("Steam ID {}: {} (created: {})", steam_id, message, created),
            Outcome::Failure { reason, .. } => warn!("Steam ID {}: {}", steam_id, reason),
        }
        outcome
    }
}

fn network_failure(steam_id: &str, error: reqwest::Error) -> Outcome {
    warn!("Steam ID {}: Network error - {}", steam_id, error);
    Outcome::Failure {
        steam_id: steam_id.to_string(),
        reason: FailureReason::Network(error.to_string()),
    }
}

/// Turns a received response into an [`Outcome`].
///
/// Body checks come before the status check: an empty or non-JSON body is
/// reported as such even when the status is 2xx, and also when it is not.
pub fn classify(steam_id: &str, status: u16, body: &str) -> Outcome {
    let failure = |reason| Outcome::Failure {
        steam_id: steam_id.to_string(),
        reason,
    };

    if body.trim().is_empty() {
        return failure(FailureReason::EmptyResponseBody);
    }

    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return failure(FailureReason::MalformedJsonResponse {
                snippet: body.chars().take(SNIPPET_CHARS).collect(),
            })
        }
    };

    if (200..300).contains(&status) {
        Outcome::Success {
            steam_id: steam_id.to_string(),
            message: parsed
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            created: parsed
                .get("created")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    } else {
        let message = parsed
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status));
        failure(FailureReason::Http { status, message })
    }
}

fn preview(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_with_created_true_is_success() {
        let outcome = classify("765", 200, r#"{"message":"ok","created":true}"#);
        assert_eq!(
            outcome,
            Outcome::Success {
                steam_id: "765".to_string(),
                message: "ok".to_string(),
                created: true,
            }
        );
    }

    #[test]
    fn already_processed_reports_created_false() {
        let outcome = classify("765", 201, r#"{"message":"already marked","created":false}"#);
        assert!(matches!(outcome, Outcome::Success { created: false, .. }));
    }

    #[test]
    fn bad_request_carries_server_error() {
        let outcome = classify("765", 400, r#"{"error":"bad id"}"#);
        assert_eq!(
            outcome.failure_reason(),
            Some(&FailureReason::Http {
                status: 400,
                message: "bad id".to_string(),
            })
        );
        assert_eq!(outcome.failure_reason().unwrap().to_string(), "bad id");
    }

    #[test]
    fn error_status_without_error_field_falls_back_to_status() {
        let outcome = classify("765", 503, r#"{"detail":"maintenance"}"#);
        let reason = outcome.failure_reason().unwrap();
        assert_eq!(reason.to_string(), "HTTP 503");
    }

    #[test]
    fn empty_body_fails_even_on_200() {
        assert_eq!(
            classify("765", 200, "").failure_reason(),
            Some(&FailureReason::EmptyResponseBody)
        );
        assert_eq!(
            classify("765", 200, "  \n\t ").failure_reason(),
            Some(&FailureReason::EmptyResponseBody)
        );
    }

    #[test]
    fn empty_body_wins_over_error_status() {
        assert_eq!(
            classify("765", 500, "").failure_reason(),
            Some(&FailureReason::EmptyResponseBody)
        );
    }

    #[test]
    fn non_json_body_is_malformed_with_snippet() {
        let outcome = classify("765", 200, "not-json");
        assert_eq!(
            outcome.failure_reason(),
            Some(&FailureReason::MalformedJsonResponse {
                snippet: "not-json".to_string(),
            })
        );
        assert_eq!(
            outcome.failure_reason().unwrap().to_string(),
            "Invalid JSON: not-json"
        );
    }

    #[test]
    fn html_error_page_snippet_is_truncated() {
        let page = format!("<html><body>{}</body></html>", "é".repeat(500));
        let outcome = classify("765", 502, &page);
        match outcome.failure_reason() {
            Some(FailureReason::MalformedJsonResponse { snippet }) => {
                assert_eq!(snippet.chars().count(), SNIPPET_CHARS);
                assert!(page.starts_with(snippet.as_str()));
            }
            other => panic!("unexpected reason: {:?}", other),
        }
    }

    #[test]
    fn preview_marks_truncation() {
        assert_eq!(preview("short"), "short");
        let long = "x".repeat(PREVIEW_CHARS + 1);
        let shown = preview(&long);
        assert!(shown.ends_with("..."));
        assert_eq!(shown.len(), PREVIEW_CHARS + 3);
        assert_eq!(preview(&"y".repeat(PREVIEW_CHARS)), "y".repeat(PREVIEW_CHARS));
    }
}
