use crate::domain::entities::Role;
use crate::domain::ports::data_store::StoreError;
use crate::domain::services::state_machine::TransitionError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Access denied: {message}")]
    AccessDenied {
        message: String,
        required_roles: Vec<Role>,
    },
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Discriminant handed to the UI alongside the human-readable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AccessDenied,
    InvalidTransition,
    Store,
    Config,
    NotFound,
    Validation,
}

impl CoreError {
    /// Builds an access denial that names the roles able to perform the action.
    pub fn access_denied(required_roles: &[Role], detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let roles = required_roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(" or ");

        let message = if roles.is_empty() {
            detail
        } else {
            format!("{} (required role: {})", detail, roles)
        };

        CoreError::AccessDenied {
            message,
            required_roles: required_roles.to_vec(),
        }
    }

    pub fn unauthenticated() -> Self {
        CoreError::Config("No authenticated identity; sign in again".to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::AccessDenied { .. } => ErrorKind::AccessDenied,
            CoreError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            CoreError::Store(_) => ErrorKind::Store,
            CoreError::Config(_) => ErrorKind::Config,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
