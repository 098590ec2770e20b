use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Every failure the remote service can produce, tagged by origin.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// No response at all: connect failure, timeout, broken body.
    #[error("network error: {0}")]
    Transport(String),
    /// Non-2xx answer carrying the server's explanation.
    #[error("{message} ({status})")]
    Rejected { status: StatusCode, message: String },
    /// The link did not resolve to a recognizable video.
    #[error("could not parse {url}: {message}")]
    Parse { url: String, message: String },
    #[error("not found: {0}")]
    NotFound(String),
    /// 2xx answer whose body does not match the expected contract.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    /// Message suitable for showing to an operator.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Parse { url, .. } => format!("Failed to parse: {}", url),
            ApiError::NotFound(message) => message.clone(),
            ApiError::InvalidResponse(_) => "The server sent an unexpected response.".to_string(),
            ApiError::InvalidRequest(message) => (*message).to_string(),
        }
    }

    /// Map a non-success status and its body into the matching variant.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(status, body);
        if status == StatusCode::NOT_FOUND {
            ApiError::NotFound(message)
        } else {
            ApiError::Rejected { status, message }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Extract the human-readable reason from an error body.
///
/// Prefers the `detail` field (a string, or a list of `{msg}` entries for
/// validation failures), then the raw body, then the status reason.
pub fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("detail") {
            Some(Value::String(detail)) if !detail.trim().is_empty() => {
                return detail.clone();
            }
            Some(Value::Array(entries)) => {
                let msgs: Vec<&str> = entries
                    .iter()
                    .filter_map(|e| e.get("msg").and_then(Value::as_str))
                    .collect();
                if !msgs.is_empty() {
                    return msgs.join("; ");
                }
            }
            _ => {}
        }
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_preferred() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"detail":"channel not found"}"#);
        assert_eq!(msg, "channel not found");
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail":[{"loc":["query","url"],"msg":"field required"},{"msg":"bad limit"}]}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "field required; bad limit"
        );
    }

    #[test]
    fn falls_back_to_body_then_reason() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, ""),
            "Internal Server Error"
        );
    }

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"detail":"Collection not found"}"#);
        assert_eq!(err, ApiError::NotFound("Collection not found".into()));
        assert_eq!(err.user_message(), "Collection not found");

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"No official link set for this collection"}"#);
        assert!(matches!(err, ApiError::Rejected { status, .. } if status == StatusCode::BAD_REQUEST));
        assert!(!err.is_transport());
    }
}
