//! Unified error type for the feed engine.

use std::fmt;

use super::backend::BackendError;
use super::category::ErrorCategory;
use super::network::NetworkError;
use crate::config::ConfigError;
use crate::traits::RealtimeError;

/// Unified error type for the feed engine.
///
/// Every fallible provider call returns `FeedError`; the feed controller
/// only ever turns it into a message string (fetch) or a log line plus a
/// revert (mutations).
#[derive(Debug, Clone)]
pub enum FeedError {
    /// Transport failure or a bare non-2xx response.
    Network(NetworkError),

    /// Structured error from the table/RPC API.
    Backend(BackendError),

    /// The response body did not have the expected shape.
    Decode { context: String, message: String },

    /// Realtime socket errors.
    Realtime(RealtimeError),

    /// Missing or invalid configuration.
    Config(ConfigError),
}

impl FeedError {
    pub fn decode(context: impl Into<String>, err: impl fmt::Display) -> Self {
        FeedError::Decode {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FeedError::Network(err) if err.requires_reauth() => ErrorCategory::Auth,
            FeedError::Network(NetworkError::HttpStatus { status, .. }) if *status < 500 => {
                ErrorCategory::Client
            }
            FeedError::Network(_) => ErrorCategory::Network,
            FeedError::Backend(err) => {
                if err.is_auth_failure() || err.is_permission_denied() {
                    ErrorCategory::Auth
                } else if err.is_server_side() {
                    ErrorCategory::Server
                } else {
                    ErrorCategory::Client
                }
            }
            FeedError::Decode { .. } => ErrorCategory::Client,
            FeedError::Realtime(_) => ErrorCategory::Network,
            FeedError::Config(_) => ErrorCategory::Configuration,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Network(err) => err.is_retryable(),
            FeedError::Backend(err) => err.is_server_side(),
            FeedError::Decode { .. } => false,
            FeedError::Realtime(err) => err.is_transient(),
            FeedError::Config(_) => false,
        }
    }

    /// Whether the user has to sign in again before this can succeed.
    pub fn requires_reauth(&self) -> bool {
        match self {
            FeedError::Network(err) => err.requires_reauth(),
            FeedError::Backend(err) => err.is_auth_failure(),
            _ => false,
        }
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            FeedError::Network(err) => err.user_message(),
            FeedError::Backend(err) if err.is_auth_failure() => {
                "Your session has expired. Please sign in again.".to_string()
            }
            FeedError::Backend(err) if err.is_permission_denied() => {
                "You don't have permission for this action.".to_string()
            }
            FeedError::Backend(err) if err.message.is_empty() => {
                "The server rejected the request.".to_string()
            }
            FeedError::Backend(err) => err.message.clone(),
            FeedError::Decode { .. } => {
                "Received an unexpected response from the server.".to_string()
            }
            FeedError::Realtime(_) => "Live updates are unavailable right now.".to_string(),
            FeedError::Config(err) => err.to_string(),
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            FeedError::Network(err) => err.error_code(),
            FeedError::Backend(_) => "E_BACKEND",
            FeedError::Decode { .. } => "E_DECODE",
            FeedError::Realtime(_) => "E_REALTIME",
            FeedError::Config(_) => "E_CONFIG",
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Network(err) => write!(f, "{}", err),
            FeedError::Backend(err) => write!(f, "{}", err),
            FeedError::Decode { context, message } => {
                write!(f, "Failed to decode {}: {}", context, message)
            }
            FeedError::Realtime(err) => write!(f, "{}", err),
            FeedError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Network(err) => Some(err),
            FeedError::Backend(err) => Some(err),
            FeedError::Decode { .. } => None,
            FeedError::Realtime(err) => Some(err),
            FeedError::Config(err) => Some(err),
        }
    }
}

impl From<NetworkError> for FeedError {
    fn from(err: NetworkError) -> Self {
        FeedError::Network(err)
    }
}

impl From<BackendError> for FeedError {
    fn from(err: BackendError) -> Self {
        FeedError::Backend(err)
    }
}

impl From<RealtimeError> for FeedError {
    fn from(err: RealtimeError) -> Self {
        FeedError::Realtime(err)
    }
}

impl From<ConfigError> for FeedError {
    fn from(err: ConfigError) -> Self {
        FeedError::Config(err)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::decode("response body", err)
    }
}
