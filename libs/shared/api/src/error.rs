use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure talking to the ContrataPro REST API.
///
/// `detail` carries the server's own explanation (FastAPI `detail` field) verbatim so callers
/// can show it to the user unchanged.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{}", .detail.as_deref().unwrap_or("Session expired or not authorized"))]
    Unauthorized { status: u16, detail: Option<String> },

    #[error("{}", .detail.as_deref().unwrap_or("Not allowed to perform this action"))]
    Forbidden { detail: Option<String> },

    #[error("{}", .detail.as_deref().unwrap_or("Resource not found"))]
    NotFound { detail: Option<String> },

    #[error("{}", .detail.as_deref().unwrap_or("Request conflicts with the current state"))]
    Conflict { detail: Option<String> },

    #[error("{}", .detail.as_deref().unwrap_or("Request rejected by the server"))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Upstream server error ({status})")]
    Server { status: u16, detail: Option<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = extract_detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized { status: 401, detail },
            403 => ApiError::Forbidden { detail },
            404 => ApiError::NotFound { detail },
            409 => ApiError::Conflict { detail },
            code if code >= 500 => ApiError::Server { status: code, detail },
            code => ApiError::Rejected { status: code, detail },
        }
    }

    /// Server-provided reason, when the API sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { detail, .. }
            | ApiError::Forbidden { detail }
            | ApiError::NotFound { detail }
            | ApiError::Conflict { detail }
            | ApiError::Rejected { detail, .. }
            | ApiError::Server { detail, .. } => detail.as_deref(),
            ApiError::Network(_) | ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Failures that never reached the API or came back unreadable.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Server { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Pulls a human readable reason out of an error body.
///
/// FastAPI sends `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "...", ...}]}` for request validation failures.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = value
        .get("detail")
        .or_else(|| value.get("error"))
        .or_else(|| value.get("message"))?;

    match detail {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_detail_is_kept_verbatim() {
        let body = r#"{"detail": "This slot is already booked"}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("This slot is already booked"));
    }

    #[test]
    fn validation_detail_list_is_joined() {
        let body = r#"{"detail": [{"loc": ["body", "date"], "msg": "field required"}, {"msg": "invalid time"}]}"#;
        assert_eq!(extract_detail(body).as_deref(), Some("field required; invalid time"));
    }

    #[test]
    fn non_json_body_has_no_detail() {
        assert_eq!(extract_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"detail": ""}"#), None);
    }

    #[test]
    fn status_classification() {
        assert!(ApiError::from_status(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        let forbidden = ApiError::from_status(
            StatusCode::FORBIDDEN,
            r#"{"detail":"Only professionals can create services"}"#,
        );
        assert!(!forbidden.is_unauthorized());
        assert_eq!(forbidden.to_string(), "Only professionals can create services");
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"x"}"#),
            ApiError::Rejected { status: 400, .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, "{}"),
            ApiError::Conflict { detail: None }
        ));
        assert!(ApiError::from_status(StatusCode::BAD_GATEWAY, "").is_transient());
    }

    #[test]
    fn display_falls_back_to_generic_text() {
        let err = ApiError::Rejected { status: 400, detail: None };
        assert_eq!(err.to_string(), "Request rejected by the server");
        let err = ApiError::Rejected { status: 400, detail: Some("Professional is not available at this time".into()) };
        assert_eq!(err.to_string(), "Professional is not available at this time");
    }
}
