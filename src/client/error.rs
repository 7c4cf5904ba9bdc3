use serde_json::Value;
use thiserror::Error;

/// Failure of an outbound call to the backend
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned status {status}")]
    Status { status: u16, body: Value },
    #[error("failed to decode backend response: {0}")]
    Decode(String),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl ClientError {
    /// Upstream status, when the backend answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Client-facing message extracted from the backend error body
    ///
    /// Accepts a `detail` string, a validation error list under `detail`, a
    /// nested `response.data.detail`, `message` or `error` fields, or a bare
    /// string body.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Status { body, .. } => detail_from_body(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

fn detail_from_body(body: &Value) -> Option<String> {
    if let Some(message) = body.as_str() {
        return Some(message.to_string()).filter(|m| !m.is_empty());
    }

    if let Some(detail) = body.get("detail").and_then(detail_value) {
        return Some(detail);
    }

    if let Some(detail) = body.pointer("/response/data/detail").and_then(detail_value) {
        return Some(detail);
    }

    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(ToString::to_string)
}

fn detail_value(value: &Value) -> Option<String> {
    match value {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
