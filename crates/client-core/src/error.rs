use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SessionState;

/// Broad error category used for user-facing handling and fallback behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientErrorCategory {
    /// Invalid input, unsupported state, or other configuration issue.
    Config,
    /// Authentication/authorization failure, including a missing token.
    Auth,
    /// Transport failure; triggers cache fallback at the controller level.
    Network,
    /// Local cache/persistence failure.
    Storage,
    /// Serialization or wire-mapping failure; handled like a transport
    /// failure.
    Serialization,
    /// Internal client bug or invariant break.
    Internal,
}

/// Stable client error payload emitted across the command/event boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ClientError {
    /// High-level error category.
    pub category: ClientErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ClientError {
    /// Construct a new client error.
    pub fn new(
        category: ClientErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Standard error for a send attempted without a stored token.
    pub fn auth_token_missing() -> Self {
        Self::new(
            ClientErrorCategory::Auth,
            "auth_token_missing",
            "no auth token is available; log in before sending",
        )
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: SessionState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ClientErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while session is in state {current:?}"),
        )
    }

    /// Whether the controller should try the local cache after this failure.
    pub fn allows_cache_fallback(&self) -> bool {
        matches!(
            self.category,
            ClientErrorCategory::Network | ClientErrorCategory::Serialization
        )
    }
}

/// Map HTTP status codes to client error categories.
pub fn classify_http_status(status: u16) -> ClientErrorCategory {
    match status {
        401 | 403 => ClientErrorCategory::Auth,
        400..=499 => ClientErrorCategory::Config,
        500..=599 => ClientErrorCategory::Network,
        _ => ClientErrorCategory::Internal,
    }
}
