//! Model client boundary.
//!
//! Replies are untrusted: a client only promises "some JSON or an error".
//! Validation and repair happen in the pipeline.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tycoon_core::OutputSchema;

use crate::prompt::Prompt;

/// Failures talking to the model. All of them are recoverable.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("model unavailable: {0}")]
    Unavailable(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
}

/// Anything that can turn a prompt into raw JSON.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value, ModelError>;
}

/// Stand-in used when no credentials are configured.
#[derive(Clone, Debug, Default)]
pub struct UnavailableClient {
    reason: String,
}

impl UnavailableClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ModelClient for UnavailableClient {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn complete(&self, _prompt: &Prompt, _schema: &OutputSchema) -> Result<Value, ModelError> {
        let reason = if self.reason.is_empty() {
            "no model configured".to_string()
        } else {
            self.reason.clone()
        };
        Err(ModelError::Unavailable(reason))
    }
}

/// Map a non-success HTTP status to a [`ModelError`].
pub fn classify_status(status: u16, body: &str) -> ModelError {
    let body = body.trim().to_string();
    match status {
        401 => ModelError::Authentication(format!("invalid API key: {body}")),
        403 => ModelError::Authentication(format!("access denied: {body}")),
        404 => ModelError::Unavailable(format!("model not found: {body}")),
        408 => ModelError::Transport(format!("request timeout: {body}")),
        429 => ModelError::RateLimited(body),
        400 | 422 => ModelError::MalformedResponse(format!("request rejected: {body}")),
        502..=504 => ModelError::Unavailable(format!("HTTP {status}: {body}")),
        500..=599 => ModelError::Server {
            status,
            message: body,
        },
        _ => ModelError::Transport(format!("HTTP {status}: {body}")),
    }
}

/// Parse the model's text reply as a JSON object.
///
/// Accepts bare JSON, fenced code blocks, or a single top-level object with
/// prose around it.
pub fn parse_model_json(text: &str) -> Result<Value, ModelError> {
    let trimmed = strip_fences(text.trim());
    if let Ok(v @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(v);
    }
    let mut last_error = None;
    for candidate in object_candidates(trimmed) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(v @ Value::Object(_)) => return Ok(v),
            Ok(_) => {}
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(ModelError::MalformedResponse(
        last_error.unwrap_or_else(|| "no JSON object in reply".to_string()),
    ))
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Balanced `{...}` slices in order. Scanning resumes after each candidate,
/// so objects nested in a rejected one are not offered.
fn object_candidates(text: &str) -> impl Iterator<Item = &str> {
    let mut from = 0;
    std::iter::from_fn(move || loop {
        let start = from + text.get(from..)?.find('{')?;
        match balanced_len(&text[start..]) {
            Some(len) => {
                from = start + len;
                return Some(&text[start..from]);
            }
            None => from = start + 1,
        }
    })
}

/// Length of the balanced object opening `text`, skipping braces inside
/// strings.
fn balanced_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_classification() {
        assert!(matches!(classify_status(401, ""), ModelError::Authentication(_)));
        assert!(matches!(classify_status(403, "no"), ModelError::Authentication(_)));
        assert!(matches!(classify_status(429, "slow down"), ModelError::RateLimited(m) if m == "slow down"));
        assert!(matches!(classify_status(404, "gpt-x"), ModelError::Unavailable(_)));
        assert!(matches!(classify_status(503, ""), ModelError::Unavailable(_)));
        assert_eq!(
            classify_status(500, " boom "),
            ModelError::Server {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert!(matches!(classify_status(302, ""), ModelError::Transport(_)));
    }

    #[test]
    fn parses_bare_fenced_and_embedded_json() {
        assert_eq!(parse_model_json(r#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            parse_model_json("```json\n{\"a\": 2}\n```").unwrap(),
            json!({"a": 2})
        );
        assert_eq!(
            parse_model_json("Sure! Here it is: {\"s\": \"}{\", \"n\": {\"x\": 1}} Enjoy.").unwrap(),
            json!({"s": "}{", "n": {"x": 1}})
        );
    }

    #[test]
    fn skips_brace_prose_before_the_object() {
        assert_eq!(
            parse_model_json(r#"Use {braces}: {"a":1}"#).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            parse_model_json(r#"{oops} then {"b": {"c": 2}}"#).unwrap(),
            json!({"b": {"c": 2}})
        );
        // Nested objects of a broken candidate are not offered on their own.
        assert!(parse_model_json(r#"{"a": {"b": 1}, broken}"#).is_err());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(parse_model_json("[1, 2]"), Err(ModelError::MalformedResponse(_))));
        assert!(matches!(parse_model_json("no json here"), Err(ModelError::MalformedResponse(_))));
        assert!(matches!(parse_model_json("{\"a\": "), Err(ModelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn unavailable_client_always_errors() {
        let client = UnavailableClient::new("TYCOON_MODEL_API_KEY is not set");
        let prompt = Prompt {
            feature: "demo",
            text: String::new(),
        };
        let err = client
            .complete(&prompt, &OutputSchema::new("demo"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Unavailable(m) if m.contains("API_KEY")));
    }
}
