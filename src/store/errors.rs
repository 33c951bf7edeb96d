//! Identity-store error types.
//!
//! These errors describe failures reported by (or while talking to) the identity
//! provider. They are backend-agnostic: the in-memory store and the Cognito
//! backend both map their failures onto this taxonomy so the provisioning layer
//! can report them uniformly.

use std::fmt;

/// Errors that can occur during identity-store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The named user does not exist in the pool.
    UserNotFound { pool_id: String, username: String },

    /// A user with this username already exists in the pool.
    UsernameExists { pool_id: String, username: String },

    /// The pool identifier does not reference an existing pool.
    PoolNotFound { pool_id: String },

    /// The provider rejected a request parameter (malformed email, weak password, ...).
    InvalidParameter { message: String },

    /// The provider is rate limiting this caller.
    Throttled { operation: String },

    /// Credentials are missing or lack permission for the operation.
    Unauthorized { operation: String, message: String },

    /// Transport-level failure reaching the provider.
    Network { message: String },

    /// Anything the provider reported that does not fit the categories above.
    Internal { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::UserNotFound { pool_id, username } => {
                write!(f, "User not found: {} in pool {}", username, pool_id)
            }
            StoreError::UsernameExists { pool_id, username } => {
                write!(f, "User already exists: {} in pool {}", username, pool_id)
            }
            StoreError::PoolNotFound { pool_id } => write!(f, "User pool not found: {}", pool_id),
            StoreError::InvalidParameter { message } => {
                write!(f, "Invalid parameter: {}", message)
            }
            StoreError::Throttled { operation } => {
                write!(f, "Request throttled during {}", operation)
            }
            StoreError::Unauthorized { operation, message } => {
                write!(f, "Not authorized for {}: {}", operation, message)
            }
            StoreError::Network { message } => write!(f, "Network error: {}", message),
            StoreError::Internal { message } => write!(f, "Identity store error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// Create a new UserNotFound error.
    pub fn user_not_found(pool_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self::UserNotFound {
            pool_id: pool_id.into(),
            username: username.into(),
        }
    }

    /// Create a new UsernameExists error.
    pub fn username_exists(pool_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self::UsernameExists {
            pool_id: pool_id.into(),
            username: username.into(),
        }
    }

    /// Create a new PoolNotFound error.
    pub fn pool_not_found(pool_id: impl Into<String>) -> Self {
        Self::PoolNotFound {
            pool_id: pool_id.into(),
        }
    }

    /// Create a new InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create a new Throttled error.
    pub fn throttled(operation: impl Into<String>) -> Self {
        Self::Throttled {
            operation: operation.into(),
        }
    }

    /// Create a new Unauthorized error.
    pub fn unauthorized(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new Network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::UserNotFound { .. } => "user_not_found",
            StoreError::UsernameExists { .. } => "username_exists",
            StoreError::PoolNotFound { .. } => "pool_not_found",
            StoreError::InvalidParameter { .. } => "invalid_parameter",
            StoreError::Throttled { .. } => "throttled",
            StoreError::Unauthorized { .. } => "unauthorized",
            StoreError::Network { .. } => "network",
            StoreError::Internal { .. } => "internal",
        }
    }
}
