//! Errors reported by the backend's table API.
//!
//! PostgREST answers failed requests with a JSON body of the form
//! `{"code": "...", "message": "...", "details": ..., "hint": ...}`.

use std::fmt;

use serde::Deserialize;

/// Structured error returned by the table/RPC API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendError {
    /// HTTP status of the failed response (not part of the body).
    #[serde(skip)]
    pub status: u16,
    /// Postgres / PostgREST error code (e.g. `23505`, `PGRST116`).
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl BackendError {
    /// Parse an error body, falling back to the raw text when it is not the
    /// structured shape (gateway errors are plain HTML or text).
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<BackendError>(body) {
            Ok(mut parsed) if !parsed.message.is_empty() || parsed.code.is_some() => {
                parsed.status = status;
                parsed
            }
            _ => BackendError {
                status,
                code: None,
                message: String::from_utf8_lossy(body).trim().to_string(),
                details: None,
                hint: None,
            },
        }
    }

    /// Unique constraint violation, e.g. liking a post twice.
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some("23505")
    }

    /// Expired or invalid JWT.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.code.as_deref() == Some("PGRST301")
    }

    /// Row-level security rejected the statement.
    pub fn is_permission_denied(&self) -> bool {
        self.status == 403 || self.code.as_deref() == Some("42501")
    }

    pub fn is_server_side(&self) -> bool {
        self.status >= 500
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "Backend error {} ({}): {}", self.status, code, self.message)?,
            None => write!(f, "Backend error {}: {}", self.status, self.message)?,
        }
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_structured_body() {
        let body = br#"{"code":"23505","message":"duplicate key value violates unique constraint \"likes_pkey\"","details":null,"hint":null}"#;
        let err = BackendError::from_body(409, body);
        assert_eq!(err.status, 409);
        assert!(err.is_unique_violation());
        assert!(err.message.contains("likes_pkey"));
    }

    #[test]
    fn test_from_plain_body() {
        let err = BackendError::from_body(502, b"Bad Gateway\n");
        assert_eq!(err.message, "Bad Gateway");
        assert!(err.code.is_none());
        assert!(err.is_server_side());
    }

    #[test]
    fn test_auth_and_permission_detection() {
        let err = BackendError::from_body(401, br#"{"code":"PGRST301","message":"JWT expired"}"#);
        assert!(err.is_auth_failure());
        let err = BackendError::from_body(
            403,
            br#"{"code":"42501","message":"new row violates row-level security policy"}"#,
        );
        assert!(err.is_permission_denied());
    }

    #[test]
    fn test_display_includes_hint() {
        let err = BackendError::from_body(
            404,
            br#"{"code":"PGRST202","message":"Could not find the function","hint":"Perhaps you meant get_user_feed_v2"}"#,
        );
        let text = err.to_string();
        assert!(text.contains("PGRST202"));
        assert!(text.contains("get_user_feed_v2"));
    }
}
