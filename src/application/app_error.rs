use thiserror::Error;

use crate::domain::entities::{resource_type::ResourceType, usage_limit::UsageLimit};

#[derive(Error, Debug)]
pub enum AppError {
    /// The store is unreachable, timed out, or rejected the operation.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Usage limit reached for {resource}")]
    LimitExceeded {
        resource: ResourceType,
        current_usage: i64,
        usage_limit: UsageLimit,
    },

    #[error("{resource} is not included in the current plan")]
    NoAccess {
        resource: ResourceType,
        current_usage: i64,
    },

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors worth retrying against the same key. Anything else will fail
    /// the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Storage(_))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    StorageError,
    AuthenticationRequired,
    LimitExceeded,
    NoAccess,
    InvalidResourceType,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            ErrorCode::LimitExceeded => "LIMIT_EXCEEDED",
            ErrorCode::NoAccess => "NO_ACCESS",
            ErrorCode::InvalidResourceType => "INVALID_RESOURCE_TYPE",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
